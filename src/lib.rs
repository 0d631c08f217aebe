//! Real-time audio features and drum onset detection over analyser-style
//! byte spectra.
//!
//! An [`AudioAnalyzer`] pulls one frequency and one time-domain snapshot per
//! tick from a [`FrameSource`] and derives band energies, transients, volume,
//! zero-crossing rate, spectral centroid and debounced kick/snare/hi-hat
//! onsets from them.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;

pub use analysis::analyzer::AudioAnalyzer;
pub use analysis::bands::{Band, BandSet};
pub use analysis::frame::FeatureFrame;
pub use analysis::onset::{DrumDetectionState, Instrument};
pub use analysis::thresholds::Thresholds;
pub use audio::analyser::PcmAnalyser;
pub use audio::source::{ByteFrameSource, FrameSource};
pub use error::{AnalyzerError, SourceError};
