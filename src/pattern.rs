//! `WHSP` pattern files: a persisted classifier plus its frequency band.

use crate::error::{Result, WhistleError};
use std::fs;
use std::io::Write;
use std::path::Path;

const MAGIC: &[u8; 4] = b"WHSP";

/// An immutable, persisted model: a classifier's trained weights together
/// with the frequency band and sample rate it was trained for.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    min_freq: u32,
    max_freq: u32,
    sample_rate: u32,
    classifier_name: String,
    classifier_data: Vec<u8>,
}

impl Pattern {
    pub fn new(
        min_freq: u32,
        max_freq: u32,
        sample_rate: u32,
        classifier_name: impl Into<String>,
        classifier_data: Vec<u8>,
    ) -> Self {
        Self {
            min_freq,
            max_freq,
            sample_rate,
            classifier_name: classifier_name.into(),
            classifier_data,
        }
    }

    pub fn min_freq(&self) -> u32 {
        self.min_freq
    }

    pub fn max_freq(&self) -> u32 {
        self.max_freq
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn classifier_name(&self) -> &str {
        &self.classifier_name
    }

    /// Returns the classifier data, with a soft sanity check that `name`
    /// matches the name this pattern was stamped with.
    pub fn classifier_data(&self, name: &str) -> Result<&[u8]> {
        if name != self.classifier_name {
            return Err(WhistleError::incompatible(format!(
                "pattern holds classifier `{}`, requested `{}`",
                self.classifier_name, name
            )));
        }
        Ok(&self.classifier_data)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading pattern");
        let bytes = fs::read(path)?;
        Self::load_bytes(&bytes)
    }

    fn load_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 20 || &bytes[0..4] != MAGIC {
            return Err(WhistleError::invalid_format("bad WHSP magic"));
        }
        let min_freq = be_u32(bytes, 4)?;
        let max_freq = be_u32(bytes, 8)?;
        let sample_rate = be_u32(bytes, 12)?;
        let name_len = be_u32(bytes, 16)? as usize;
        if name_len == 0 {
            return Err(WhistleError::invalid_format("no classifier name"));
        }
        let name_start = 20;
        let name_end = name_start + name_len;
        if bytes.len() < name_end + 4 {
            return Err(WhistleError::invalid_format("truncated WHSP name"));
        }
        let name_bytes = &bytes[name_start..name_end];
        let nul = name_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(name_bytes.len());
        let classifier_name = String::from_utf8_lossy(&name_bytes[..nul]).into_owned();

        let data_len = be_u32(bytes, name_end)? as usize;
        if data_len == 0 {
            return Err(WhistleError::invalid_format("no classifier data"));
        }
        let data_start = name_end + 4;
        let data_end = data_start + data_len;
        if bytes.len() < data_end {
            return Err(WhistleError::invalid_format("truncated WHSP data"));
        }
        let classifier_data = bytes[data_start..data_end].to_vec();

        Ok(Self {
            min_freq,
            max_freq,
            sample_rate,
            classifier_name,
            classifier_data,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        tracing::info!(
            path = %path.as_ref().display(),
            classifier = %self.classifier_name,
            "saving pattern"
        );
        let mut file = fs::File::create(path)?;
        file.write_all(MAGIC)?;
        file.write_all(&self.min_freq.to_be_bytes())?;
        file.write_all(&self.max_freq.to_be_bytes())?;
        file.write_all(&self.sample_rate.to_be_bytes())?;

        let mut name_bytes = self.classifier_name.clone().into_bytes();
        name_bytes.push(0);
        file.write_all(&(name_bytes.len() as u32).to_be_bytes())?;
        file.write_all(&name_bytes)?;

        file.write_all(&(self.classifier_data.len() as u32).to_be_bytes())?;
        file.write_all(&self.classifier_data)?;
        Ok(())
    }
}

fn be_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .map(|s| u32::from_be_bytes(s.try_into().unwrap()))
        .ok_or_else(|| WhistleError::invalid_format("truncated WHSP header"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn round_trips_through_a_file() {
        let pattern = Pattern::new(500, 4000, 44_100, "WhsNNClassifier_32_16_1", vec![1, 2, 3, 4]);
        let file = NamedTempFile::new().unwrap();
        pattern.save(file.path()).unwrap();
        let loaded = Pattern::load(file.path()).unwrap();
        assert_eq!(pattern, loaded);
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = b"XXXX0000000000000000".to_vec();
        assert!(Pattern::load_bytes(&bytes).is_err());
    }

    #[test]
    fn rejects_empty_name_or_data() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&500u32.to_be_bytes());
        bytes.extend_from_slice(&4000u32.to_be_bytes());
        bytes.extend_from_slice(&44_100u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes()); // name_len == 0
        assert!(Pattern::load_bytes(&bytes).is_err());
    }

    #[test]
    fn classifier_data_checks_name() {
        let pattern = Pattern::new(500, 4000, 44_100, "WhsNNClassifier_32_16_1", vec![1, 2]);
        assert!(pattern.classifier_data("WhsNNClassifier_32_16_1").is_ok());
        assert!(pattern.classifier_data("WhsNNClassifier_32_32_1").is_err());
    }
}
