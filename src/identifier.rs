//! Orchestrates preprocessing, classification, and localization for live
//! stereo (or mono) audio.

use crate::bandpass::Bandpass;
use crate::classifier::Classifier;
use crate::error::{Result, WhistleError};
use crate::extractor::Extractor;
use crate::feature::AnalysisResult;
use crate::localizer::Localizer;
use crate::pattern::Pattern;

bitflags::bitflags! {
    /// Which stages [`Identifier::process`] runs. At least one bit must be
    /// set; each bit gates its stage independently (spec.md §9's reading
    /// of the host's `&&`-looking guard, which is really an "or").
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mode: u8 {
        const CLASSIFY = 0b01;
        const LOCALIZE = 0b10;
    }
}

const HISTORY_LEN: usize = 10;
const SILENCE_RMS: f64 = 1e-4;

/// Live per-frame classifier + localizer pipeline with 10-tap smoothing.
pub struct Identifier {
    extractor: Extractor,
    localizer: Option<Localizer>,
    classifier: Classifier,
    bandpass_stereo: Option<Bandpass>,
    bandpass_mono: Option<Bandpass>,
    nchannels: usize,
    frame_len: usize,
    input: Vec<Vec<f32>>,
    mono: Vec<f32>,
    score_history: [f64; HISTORY_LEN],
    angle_history: [f64; HISTORY_LEN],
}

impl Identifier {
    pub fn new(
        sample_rate: u32,
        frame_len: usize,
        nchannels: usize,
        distance: f64,
        pattern: &Pattern,
    ) -> Result<Self> {
        if frame_len == 0 {
            return Err(WhistleError::invalid_param("frame_len must be > 0"));
        }
        if nchannels == 0 {
            return Err(WhistleError::invalid_param("nchannels must be >= 1"));
        }
        if pattern.sample_rate() != 0 && pattern.sample_rate() != sample_rate {
            tracing::warn!(
                pattern_rate = pattern.sample_rate(),
                requested_rate = sample_rate,
                "incompatible sample rate at identifier construction"
            );
            return Err(WhistleError::incompatible(format!(
                "pattern sample rate {} does not match identifier sample rate {}",
                pattern.sample_rate(),
                sample_rate
            )));
        }

        let min_freq = pattern.min_freq();
        let max_freq = pattern.max_freq();
        let (bandpass_stereo, bandpass_mono) = if min_freq != 0 && max_freq != 0 {
            (
                Some(Bandpass::new(sample_rate, nchannels, min_freq, max_freq)?),
                Some(Bandpass::new(sample_rate, 1, min_freq, max_freq)?),
            )
        } else {
            (None, None)
        };

        let topology = crate::classifier::Topology::from_name(pattern.classifier_name())?;
        let classifier_data = pattern.classifier_data(pattern.classifier_name())?;
        let classifier = Classifier::from_bytes(topology, classifier_data)?;

        let localizer = if nchannels == 2 {
            Some(Localizer::new(frame_len, sample_rate, distance)?)
        } else {
            None
        };

        Ok(Self {
            extractor: Extractor::new(frame_len, sample_rate, min_freq, max_freq)?,
            localizer,
            classifier,
            bandpass_stereo,
            bandpass_mono,
            nchannels,
            frame_len,
            input: vec![vec![0.0; frame_len]; nchannels],
            mono: vec![0.0; frame_len],
            score_history: [AnalysisResult::neutral().score; HISTORY_LEN],
            angle_history: [AnalysisResult::neutral().angle; HISTORY_LEN],
        })
    }

    /// Deinterleaves `frame` (`nchannels * frame_len` samples), mixes down
    /// to mono, and returns the mono RMS.
    fn deinterleave(&mut self, frame: &[f32]) -> f64 {
        let n = self.frame_len;
        let c = self.nchannels;
        let mut rms = 0.0;
        for i in 0..n {
            let mut sum = 0.0;
            for ch in 0..c {
                let x = frame[i * c + ch];
                self.input[ch][i] = x;
                sum += x;
            }
            let m = sum / c as f32;
            self.mono[i] = m;
            rms += (m as f64) * (m as f64);
        }
        (rms / n as f64).sqrt()
    }

    /// Processes one interleaved frame of `nchannels * frame_len` samples.
    /// `mode` must have at least one of `CLASSIFY`/`LOCALIZE` set; each
    /// gates its stage independently. `LOCALIZE` requires `nchannels == 2`.
    pub fn process(&mut self, frame: &[f32], mode: Mode) -> Result<AnalysisResult> {
        if mode.is_empty() {
            return Err(WhistleError::invalid_param(
                "mode must set at least one of CLASSIFY/LOCALIZE",
            ));
        }
        if mode.contains(Mode::LOCALIZE) && self.localizer.is_none() {
            return Err(WhistleError::unsupported(
                "localization requires exactly 2 channels",
            ));
        }
        if frame.len() != self.frame_len * self.nchannels {
            return Err(WhistleError::invalid_param(
                "frame length does not match nchannels * frame_len",
            ));
        }

        let rms = self.deinterleave(frame);
        if rms <= SILENCE_RMS {
            // Fast path: silent frames are reported without touching the
            // smoothing history, so they don't wash out recent results.
            return Ok(AnalysisResult::silent());
        }

        if let (Some(sbp), Some(mbp)) = (&mut self.bandpass_stereo, &mut self.bandpass_mono) {
            for ch in 0..self.nchannels {
                sbp.process(ch, &mut self.input[ch]);
            }
            mbp.process(0, &mut self.mono);
        }

        let mut vec = [0.0; 32];
        self.extractor.process(&self.mono, &mut vec);

        let score = if mode.contains(Mode::CLASSIFY) {
            self.classifier.forward(&vec)
        } else {
            0.0
        };

        let angle = if mode.contains(Mode::LOCALIZE) {
            let localizer = self.localizer.as_mut().unwrap();
            localizer.process(&self.input[0], &self.input[1])
        } else {
            0.0
        };

        Ok(self.smooth(score, angle))
    }

    fn smooth(&mut self, score: f64, angle: f64) -> AnalysisResult {
        self.score_history.copy_within(1.., 0);
        self.score_history[HISTORY_LEN - 1] = score;
        self.angle_history.copy_within(1.., 0);
        self.angle_history[HISTORY_LEN - 1] = angle;

        let avg_score = self.score_history.iter().sum::<f64>() / HISTORY_LEN as f64;
        let avg_angle = self.angle_history.iter().sum::<f64>() / HISTORY_LEN as f64;
        AnalysisResult {
            score: avg_score,
            angle: avg_angle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Classifier, Topology};

    fn test_pattern(sample_rate: u32) -> Pattern {
        let c = Classifier::randomized(Topology::Small, 1);
        Pattern::new(500, 4000, sample_rate, Topology::Small.name(), c.serialize())
    }

    #[test]
    fn silent_frame_returns_zeroed_result_without_history_update() {
        let pattern = test_pattern(44_100);
        let mut id = Identifier::new(44_100, 4096, 2, 20.0, &pattern).unwrap();
        let frame = vec![0.0_f32; 4096 * 2];
        let result = id.process(&frame, Mode::CLASSIFY | Mode::LOCALIZE).unwrap();
        assert_eq!(result.score, 0.0);
        assert_eq!(result.angle, 0.0);
        // history untouched: still at its initial neutral state
        assert_eq!(id.score_history, [0.5; HISTORY_LEN]);
        assert_eq!(id.angle_history, [0.0; HISTORY_LEN]);
    }

    #[test]
    fn sample_rate_mismatch_is_rejected() {
        let pattern = test_pattern(44_100);
        let err = Identifier::new(48_000, 1024, 2, 20.0, &pattern);
        assert!(err.is_err());
    }

    #[test]
    fn mode_requires_at_least_one_bit() {
        let pattern = test_pattern(44_100);
        let mut id = Identifier::new(44_100, 1024, 2, 20.0, &pattern).unwrap();
        let frame = vec![0.1_f32; 1024 * 2];
        assert!(id.process(&frame, Mode::empty()).is_err());
    }

    #[test]
    fn localize_without_stereo_is_unsupported() {
        let pattern = test_pattern(44_100);
        let mut id = Identifier::new(44_100, 1024, 1, 20.0, &pattern).unwrap();
        let frame = vec![0.1_f32; 1024];
        assert!(id.process(&frame, Mode::LOCALIZE).is_err());
        assert!(id.process(&frame, Mode::CLASSIFY).is_ok());
    }
}
