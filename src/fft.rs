//! Interface to the spectral transforms used by the extractor.
//!
//! The original whistle detector treats its FFT/DCT kernel (Ooura's
//! `rdft`/`ddct`) as an external primitive. Here that primitive is the
//! `realfft` crate: a real-input forward transform producing `n/2 + 1`
//! complex bins directly, which avoids the packed-Nyquist bookkeeping the
//! original's `rdft` layout required.

use num_complex::Complex64;
use realfft::{RealFftPlanner, RealToComplex};
use std::f64::consts::PI;
use std::sync::Arc;

/// Real-to-complex FFT for a fixed frame length.
///
/// Caches the `realfft` plan and scratch buffers so repeated calls to
/// [`RealFft::process`] allocate nothing on the hot path.
pub struct RealFft {
    len: usize,
    plan: Arc<dyn RealToComplex<f64>>,
    input_scratch: Vec<f64>,
    output_scratch: Vec<Complex64>,
}

impl RealFft {
    /// Creates a real FFT for frames of length `len`, a power of two.
    pub fn new(len: usize) -> Self {
        assert!(len.is_power_of_two(), "FFT length must be a power of two");
        let mut planner = RealFftPlanner::<f64>::new();
        let plan = planner.plan_fft_forward(len);
        let input_scratch = plan.make_input_vec();
        let output_scratch = plan.make_output_vec();
        Self {
            len,
            plan,
            input_scratch,
            output_scratch,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Computes the forward real FFT of `input` (length `len`), writing
    /// `len / 2 + 1` complex bins into `output`.
    pub fn process(&mut self, input: &[f64], output: &mut [Complex64]) {
        debug_assert_eq!(input.len(), self.len);
        debug_assert_eq!(output.len(), self.len / 2 + 1);
        self.input_scratch.copy_from_slice(input);
        self.plan
            .process_with_scratch(&mut self.input_scratch, &mut self.output_scratch, &mut [])
            .expect("realfft processing failed");
        output.copy_from_slice(&self.output_scratch);
    }
}

/// Type-II discrete cosine transform (the "decorrelation" step of MFCC
/// extraction), computed directly since the transform length is fixed and
/// small (32 mel bins). Matches the scaling of Ooura's `ddct(n, -1, ...)`:
/// `X_k = 2 * sum_n x_n * cos(pi/n * (i + 0.5) * k)`.
pub fn dct2(input: &[f64], output: &mut [f64]) {
    let n = input.len();
    debug_assert_eq!(output.len(), n);
    for k in 0..n {
        let mut sum = 0.0;
        for (i, &x) in input.iter().enumerate() {
            sum += x * (PI / n as f64 * (i as f64 + 0.5) * k as f64).cos();
        }
        output[k] = 2.0 * sum;
    }
}
