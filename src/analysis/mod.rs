pub mod analyzer;
pub mod bands;
pub mod features;
pub mod frame;
pub mod history;
pub mod onset;
pub mod thresholds;
