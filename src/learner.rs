//! Collects labelled feature vectors across one or more training sequences
//! and drives batched classifier training.

use crate::bandpass::Bandpass;
use crate::classifier::{Classifier, Topology};
use crate::error::{Result, WhistleError};
use crate::extractor::Extractor;
use crate::feature::ResultValue;
use crate::pattern::Pattern;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"WHSL";
const RECORD_LEN: usize = 4 + 32 * 4;

/// Accumulates `(label, MFCC)` samples across training sequences and turns
/// them into a [`Pattern`] on demand.
pub struct Learner {
    extractor: Extractor,
    bandpass: Option<Bandpass>,
    topology: Topology,
    min_freq: u32,
    max_freq: u32,
    sample_rate: u32,
    values: Vec<ResultValue>,
}

impl Learner {
    /// `min_freq`/`max_freq` of `(0, 0)` disables the bandpass stage and
    /// widens extraction to the full band, per spec.md's boundary case.
    pub fn new(
        topology: Topology,
        sample_rate: u32,
        frame_length: usize,
        min_freq: u32,
        max_freq: u32,
    ) -> Result<Self> {
        if sample_rate == 0 {
            return Err(WhistleError::invalid_param("sample_rate must be > 0"));
        }
        if !(min_freq == 0 && max_freq == 0) && min_freq >= max_freq {
            return Err(WhistleError::invalid_param(
                "min_freq must be < max_freq unless both are zero",
            ));
        }
        if max_freq as u64 * 2 > sample_rate as u64 {
            return Err(WhistleError::invalid_param(
                "max_freq must be <= sample_rate/2",
            ));
        }

        let bandpass = if min_freq != 0 && max_freq != 0 {
            Some(Bandpass::new(sample_rate, 1, min_freq, max_freq)?)
        } else {
            None
        };

        Ok(Self {
            extractor: Extractor::new(frame_length, sample_rate, min_freq, max_freq)?,
            bandpass,
            topology,
            min_freq,
            max_freq,
            sample_rate,
            values: Vec::new(),
        })
    }

    pub fn sample_count(&self) -> usize {
        self.values.len()
    }

    /// Processes one labelled frame. `label < 0` is ignored (no sequence
    /// separator is inserted implicitly — call [`Learner::finish_sequence`]
    /// explicitly for that).
    pub fn process(&mut self, label: i32, frame: &[f32]) -> Result<()> {
        if label < 0 {
            return Ok(());
        }
        let mut buf = frame.to_vec();
        if let Some(bp) = &mut self.bandpass {
            bp.process(0, &mut buf);
        }
        let mut vec = [0.0; 32];
        self.extractor.process(&buf, &mut vec);
        self.values.push(ResultValue::new(label, vec));
        Ok(())
    }

    /// Appends a sequence-separator sample, marking the end of one
    /// independently-ordered training pass.
    pub fn finish_sequence(&mut self) {
        self.values.push(ResultValue::sequence_separator());
    }

    /// Trains the configured topology on every sample collected so far
    /// (skipping separators), stamping the resulting [`Pattern`] with this
    /// learner's frequency band and sample rate.
    pub fn generate_pattern(&self, target_rate: f64) -> Pattern {
        self.generate_pattern_seeded(target_rate, 0)
    }

    /// As [`Learner::generate_pattern`], with an explicit PRNG seed for the
    /// classifier's initial weights (tests pin this for reproducibility).
    pub fn generate_pattern_seeded(&self, target_rate: f64, seed: u64) -> Pattern {
        tracing::info!(
            samples = self.values.len(),
            target_rate,
            topology = self.topology.name(),
            "training classifier"
        );
        let classifier = Classifier::learn(self.topology, &self.values, target_rate, seed);
        Pattern::new(
            self.min_freq,
            self.max_freq,
            self.sample_rate,
            self.topology.name(),
            classifier.serialize(),
        )
    }

    /// Writes the learner's state (including an implicit
    /// [`Learner::finish_sequence`]) as a `WHSL` file.
    pub fn save_state(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.finish_sequence();
        tracing::debug!(samples = self.values.len(), path = %path.as_ref().display(), "saving learner state");

        let mut file = fs::File::create(path)?;
        file.write_all(MAGIC)?;
        file.write_all(&self.min_freq.to_be_bytes())?;
        file.write_all(&self.max_freq.to_be_bytes())?;
        file.write_all(&self.sample_rate.to_be_bytes())?;

        let data_size = self.values.len() as u32 * RECORD_LEN as u32;
        file.write_all(&data_size.to_be_bytes())?;

        for v in &self.values {
            file.write_all(&v.label.to_be_bytes())?;
            for &x in &v.vec {
                file.write_all(&(x as f32).to_be_bytes())?;
            }
        }
        Ok(())
    }

    /// Reconstructs a learner from a `WHSL` file. If `pattern` is given,
    /// the file's band/sample-rate/classifier metadata must agree with it
    /// (and, when `sample_rate == 0`, the file's rate is used instead).
    pub fn new_from_state(
        topology: Topology,
        mut sample_rate: u32,
        frame_length: usize,
        path: impl AsRef<Path>,
        pattern: Option<&Pattern>,
    ) -> Result<Self> {
        if let Some(p) = pattern {
            if p.classifier_name() != topology.name() {
                tracing::warn!(
                    pattern_classifier = p.classifier_name(),
                    requested = topology.name(),
                    "incompatible classifier name"
                );
                return Err(WhistleError::incompatible(
                    "pattern classifier name does not match requested topology",
                ));
            }
            if sample_rate == 0 {
                sample_rate = p.sample_rate();
            } else if sample_rate != p.sample_rate() {
                tracing::warn!(
                    requested = sample_rate,
                    pattern = p.sample_rate(),
                    "incompatible sample rate"
                );
                return Err(WhistleError::incompatible(
                    "learner state sample rate disagrees with pattern",
                ));
            }
        }

        let mut bytes = Vec::new();
        fs::File::open(path)?.read_to_end(&mut bytes)?;

        if bytes.len() < 20 || &bytes[0..4] != MAGIC {
            return Err(WhistleError::invalid_format("bad WHSL magic"));
        }
        let file_min = be_u32(&bytes, 4)?;
        let file_max = be_u32(&bytes, 8)?;
        let file_sr = be_u32(&bytes, 12)?;
        let data_size = be_u32(&bytes, 16)? as usize;

        if data_size % RECORD_LEN != 0 {
            return Err(WhistleError::invalid_format(
                "WHSL data_size not a multiple of the record length",
            ));
        }
        if bytes.len() < 20 + data_size {
            return Err(WhistleError::invalid_format("truncated WHSL data"));
        }

        if let Some(p) = pattern {
            if file_min != p.min_freq() || file_max != p.max_freq() {
                return Err(WhistleError::incompatible(
                    "learner state frequency band disagrees with pattern",
                ));
            }
            if file_sr != p.sample_rate() {
                tracing::warn!(
                    file_sample_rate = file_sr,
                    pattern_sample_rate = p.sample_rate(),
                    "incompatible sample rate in learner state file"
                );
                return Err(WhistleError::incompatible(
                    "learner state sample rate disagrees with pattern",
                ));
            }
        }

        let sr = if sample_rate == 0 { file_sr } else { sample_rate };
        let mut learner = Learner::new(topology, sr, frame_length, file_min, file_max)?;

        let count = data_size / RECORD_LEN;
        learner.values.reserve(count);
        let mut cursor = 20;
        for _ in 0..count {
            let label = i32::from_be_bytes(bytes[cursor..cursor + 4].try_into().unwrap());
            cursor += 4;
            let mut vec = [0.0_f64; 32];
            for slot in vec.iter_mut() {
                let raw: [u8; 4] = bytes[cursor..cursor + 4].try_into().unwrap();
                *slot = f32::from_be_bytes(raw) as f64;
                cursor += 4;
            }
            learner.values.push(ResultValue::new(label, vec));
        }

        Ok(learner)
    }
}

fn be_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .map(|s| u32::from_be_bytes(s.try_into().unwrap()))
        .ok_or_else(|| WhistleError::invalid_format("truncated WHSL header"))
}
