//! Stereo time-difference-of-arrival localizer.

use crate::error::{Result, WhistleError};

const V_SOUND: f64 = 34_400.0; // cm/s

/// Cross-correlation-based azimuth estimator over a two-channel ring
/// buffer of `2 * frame_len` samples per channel.
pub struct Localizer {
    frame_len: usize,
    sample_rate: u32,
    distance: f64,
    max_range: i64,
    history: [Vec<f32>; 2],
}

impl Localizer {
    /// `distance` is the microphone separation in centimetres.
    pub fn new(frame_len: usize, sample_rate: u32, distance: f64) -> Result<Self> {
        if sample_rate == 0 {
            return Err(WhistleError::invalid_param("sample_rate must be > 0"));
        }
        if distance <= 0.0 {
            return Err(WhistleError::invalid_param("distance must be > 0"));
        }
        if frame_len == 0 {
            return Err(WhistleError::invalid_param("frame_len must be > 0"));
        }
        let max_range = 1 + (distance * sample_rate as f64 / V_SOUND).ceil() as i64;
        Ok(Self {
            frame_len,
            sample_rate,
            distance,
            max_range,
            history: [vec![0.0; frame_len * 2], vec![0.0; frame_len * 2]],
        })
    }

    /// Shifts each channel's ring buffer left by `frame_len` and appends
    /// `left`/`right` (each `frame_len` samples), then returns the
    /// estimated azimuth in radians.
    pub fn process(&mut self, left: &[f32], right: &[f32]) -> f64 {
        debug_assert_eq!(left.len(), self.frame_len);
        debug_assert_eq!(right.len(), self.frame_len);

        for (ch, new_samples) in [left, right].into_iter().enumerate() {
            let buf = &mut self.history[ch];
            buf.copy_within(self.frame_len.., 0);
            buf[self.frame_len..].copy_from_slice(new_samples);
        }

        let n = self.frame_len;
        let half = n / 2;
        let x0 = &self.history[0];
        let x1 = &self.history[1];

        let mut best_k = -self.max_range;
        let mut best_v = f64::NEG_INFINITY;
        for k in -self.max_range..self.max_range {
            let mut sum = 0.0_f64;
            for j in 0..n {
                let i0 = half + j;
                let i1 = (half as i64 + j as i64 + k) as isize;
                if i1 < 0 || i1 as usize >= x1.len() {
                    continue;
                }
                sum += x0[i0] as f64 * x1[i1 as usize] as f64;
            }
            if sum > best_v {
                best_v = sum;
                best_k = k;
            }
        }

        let itd = (best_k as f64 / self.sample_rate as f64 * V_SOUND / self.distance)
            .clamp(-1.0, 1.0);
        itd.asin()
    }
}
