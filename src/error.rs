use thiserror::Error;

/// Failures raised by a frame source while it is being attached or reconfigured.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SourceError {
    #[error("audio source unavailable: {0}")]
    Unavailable(String),

    #[error("FFT size {0} must be a power of two between 32 and 32768")]
    UnsupportedFftSize(usize),
}

/// Errors surfaced to whoever sets the analyzer up.
///
/// Per-tick queries never return these; they degrade to neutral values instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalyzerError {
    #[error("upstream audio graph failed to attach")]
    Upstream(#[from] SourceError),

    #[error("invalid FFT size {0}")]
    InvalidFftSize(usize),
}
