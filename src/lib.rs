//! Real-time whistle detection: frame windowing, band-pass filtering,
//! MFCC feature extraction, a fixed-topology neural classifier with
//! on-line backpropagation, and stereo time-difference-of-arrival
//! localization.
//!
//! Two entry points cover the library's operational modes:
//!
//! - [`Learner`] accepts labelled audio frames and produces a serialized
//!   [`Pattern`] (a trained classifier plus the frequency band and sample
//!   rate it was trained for).
//! - [`Identifier`] consumes live audio frames against a `Pattern` and
//!   emits a smoothed classification score and arrival angle via
//!   [`AnalysisResult`].
//!
//! [`StreamAdapter`] turns a push-based byte stream into the fixed-size
//! frames both of the above expect; [`training_data`] reads and writes
//! the `WHST` label-span format used to drive a `Learner` over a
//! pre-recorded file.

pub mod bandpass;
pub mod classifier;
pub mod error;
pub mod extractor;
pub mod feature;
pub mod fft;
pub mod identifier;
pub mod learner;
pub mod localizer;
pub mod math;
pub mod pattern;
pub mod stream;
pub mod training_data;

pub use bandpass::Bandpass;
pub use classifier::{Classifier, Topology};
pub use error::{Result, WhistleError};
pub use extractor::Extractor;
pub use feature::{AnalysisResult, FeatureVector, ResultValue, TrainingLabel};
pub use identifier::{Identifier, Mode};
pub use learner::Learner;
pub use localizer::Localizer;
pub use pattern::Pattern;
pub use stream::StreamAdapter;
