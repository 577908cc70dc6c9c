//! Core data types shared across the extractor, classifier, and learner.

/// A 32-dimensional MFCC feature vector, the common currency between the
/// extractor and the classifier.
pub type FeatureVector = [f64; 32];

/// One labelled training example: a classifier feature vector paired with
/// its intended output.
///
/// `label` follows the original's convention: `0` is the negative class,
/// `1` is the positive class, and any negative value marks a sequence
/// separator inserted by [`crate::learner::Learner::finish_sequence`] —
/// such entries are skipped during training rather than fed to the
/// network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultValue {
    pub label: i32,
    pub vec: FeatureVector,
}

impl ResultValue {
    pub fn new(label: i32, vec: FeatureVector) -> Self {
        Self { label, vec }
    }

    /// Sentinel marking a sequence boundary; never trained on.
    pub fn sequence_separator() -> Self {
        Self {
            label: i32::MIN,
            vec: [0.0; 32],
        }
    }

    pub fn is_separator(&self) -> bool {
        self.label < 0
    }
}

/// Outcome of one [`crate::identifier::Identifier::process`] call.
///
/// Named `AnalysisResult` rather than `Result` to avoid shadowing
/// `std::result::Result` throughout the crate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisResult {
    /// Smoothed classifier confidence in `[0, 1]`.
    pub score: f64,
    /// Smoothed source azimuth in radians, `[-pi/2, pi/2]`.
    pub angle: f64,
}

impl AnalysisResult {
    /// The identifier's initial history state: a neutral score and a
    /// straight-ahead angle, before any frame has been processed.
    pub fn neutral() -> Self {
        Self {
            score: 0.5,
            angle: 0.0,
        }
    }

    /// The result returned for a frame judged silent: a zero score and a
    /// straight-ahead angle, returned without perturbing history (unlike
    /// [`AnalysisResult::neutral`], which seeds that history).
    pub fn silent() -> Self {
        Self {
            score: 0.0,
            angle: 0.0,
        }
    }
}

/// One record from a `WHST` training-labels file: a labelled span of a
/// recording, in sample frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingLabel {
    pub label: i32,
    pub start: u64,
    pub stop: u64,
}

impl TrainingLabel {
    pub fn new(label: i32, start: u64, stop: u64) -> Self {
        Self { label, start, stop }
    }
}
