//! MFCC feature extraction: window, real FFT, mel binning, DCT decorrelation.

use crate::error::{Result, WhistleError};
use crate::fft::{dct2, RealFft};
use crate::math::{hamming_window, mel};
use num_complex::Complex64;

/// Extracts a 32-dimensional MFCC vector from a fixed-length frame.
///
/// Holds the precomputed Hamming window and FFT plan so [`Extractor::process`]
/// never allocates; it is otherwise a pure function of `(frame, sample_rate,
/// min_freq, max_freq)`.
pub struct Extractor {
    frame_len: usize,
    window: Vec<f64>,
    fft: RealFft,
    sample_rate: u32,
    min_freq: u32,
    max_freq: u32,
    // Scratch buffers, reused across calls.
    windowed: Vec<f64>,
    spectrum: Vec<Complex64>,
    log_mag: Vec<f64>,
    bins: Vec<f64>,
}

impl Extractor {
    /// `frame_len` must be a power of two in `[128, 4096]`.
    pub fn new(frame_len: usize, sample_rate: u32, min_freq: u32, max_freq: u32) -> Result<Self> {
        if !frame_len.is_power_of_two() || !(128..=4096).contains(&frame_len) {
            return Err(WhistleError::invalid_param(
                "frame_len must be a power of two in [128, 4096]",
            ));
        }
        if sample_rate == 0 {
            return Err(WhistleError::invalid_param("sample_rate must be > 0"));
        }
        Ok(Self {
            frame_len,
            window: hamming_window(frame_len),
            fft: RealFft::new(frame_len),
            sample_rate,
            min_freq,
            max_freq,
            windowed: vec![0.0; frame_len],
            spectrum: vec![Complex64::new(0.0, 0.0); frame_len / 2 + 1],
            log_mag: vec![0.0; frame_len / 2 + 1],
            bins: vec![0.0; 32],
        })
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Computes the 32-component MFCC vector for `frame` (length
    /// `frame_len`), writing it into `out`.
    pub fn process(&mut self, frame: &[f32], out: &mut [f64; 32]) {
        debug_assert_eq!(frame.len(), self.frame_len);

        for (i, (&x, &w)) in frame.iter().zip(self.window.iter()).enumerate() {
            self.windowed[i] = x as f64 * w;
        }

        self.fft.process(&self.windowed, &mut self.spectrum);

        let n = self.frame_len as f64;
        for (k, bin) in self.spectrum.iter().enumerate() {
            let mag_sq = bin.re * bin.re + bin.im * bin.im;
            self.log_mag[k] = if mag_sq == 0.0 {
                -500.0
            } else {
                ((mag_sq / (n * n)).sqrt().log10()).max(-500.0)
            };
        }

        self.mel_bin();
        dct2(&self.bins, out);
    }

    /// Sequentially walks the log-magnitude spectrum into 32 mel bins,
    /// averaging the FFT bins that fall in each mel interval.
    fn mel_bin(&mut self) {
        let sr = self.sample_rate as f64;
        let n = self.frame_len as f64;
        let nyquist = sr / 2.0;

        let start_m = if self.min_freq > 0 {
            mel((self.min_freq as f64 - sr / n).max(0.0).min(nyquist))
        } else {
            0.0
        };
        let stop_m = if self.max_freq > 0 {
            mel((self.max_freq as f64 + sr / n).max(0.0).min(nyquist))
        } else {
            mel(nyquist)
        };
        let step = (stop_m - start_m) / 32.0;

        let half = self.frame_len / 2;
        let bin_freq = |i: usize| (i as f64 * nyquist) / half as f64;

        let mut i = 0usize;
        for b in 0..32 {
            let threshold = start_m + step * (b as f64 + 1.0);
            let mut sum = 0.0;
            let mut count = 0usize;
            while i <= half && mel(bin_freq(i)) <= threshold {
                sum += self.log_mag[i];
                count += 1;
                i += 1;
            }
            self.bins[b] = if count > 0 { sum / count as f64 } else { 0.0 };
        }
    }
}
