use serde::Serialize;

/// Per-tick feature snapshot handed to the rendering layer.
///
/// Owned and detached from the analyzer, so a renderer can keep it around
/// across frames without borrowing analyzer state.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FeatureFrame {
    /// Timestamp of the update that produced this frame (ms)
    pub time_ms: u64,
    /// RMS level of the time-domain window
    pub volume: f32,
    /// Broad band energies (0.0-1.0)
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    /// Positive energy deltas in the drum bands
    pub kick_transient: f32,
    pub snare_transient: f32,
    pub hihat_transient: f32,
    /// Spectral centroid, normalized by bin count
    pub spectral_centroid: f32,
    pub zero_crossing_rate: f32,
    /// Onset flags, true only on the tick an onset was accepted
    pub kick: bool,
    pub snare: bool,
    pub hihat: bool,
}

impl FeatureFrame {
    pub fn has_onset(&self) -> bool {
        self.kick || self.snare || self.hihat
    }
}
