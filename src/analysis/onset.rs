use serde::Serialize;

use super::thresholds::{Thresholds, BASS, HIHAT_ATTACK, KICK_ATTACK, MID, SNARE_ATTACK, TREBLE, VOLUME};

pub const DEFAULT_MIN_TIME_BETWEEN_BEATS_MS: u64 = 100;
pub const MIN_TIME_BETWEEN_BEATS_FLOOR_MS: u64 = 50;

/// Hi-hats are noisy; their waveform crosses the midline often.
const HIHAT_MIN_ZERO_CROSSING_RATE: f32 = 0.3;
const HIHAT_MIN_SPECTRAL_CENTROID: f32 = 0.6;
/// Kick energy must dominate the mid band by this ratio.
const KICK_MIN_LOW_TO_MID_RATIO: f32 = 0.5;
const RATIO_EPSILON: f32 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Instrument {
    Kick,
    Snare,
    Hihat,
}

impl Instrument {
    pub const ALL: [Instrument; 3] = [Instrument::Kick, Instrument::Snare, Instrument::Hihat];
}

/// Feature values an onset decision is made from, sampled once per tick.
///
/// Each instrument is tested against a conjunction of conditions whose limits
/// are fractions of the user thresholds.
#[derive(Clone, Copy, Debug, Default)]
pub struct DrumFeatures {
    pub volume: f32,
    pub mid_energy: f32,
    pub kick_energy: f32,
    pub kick_average: f32,
    pub kick_transient: f32,
    pub snare_body_energy: f32,
    pub snare_body_transient: f32,
    pub snare_attack_energy: f32,
    pub snare_attack_transient: f32,
    pub hihat_energy: f32,
    pub hihat_transient: f32,
    pub zero_crossing_rate: f32,
    pub spectral_centroid: f32,
}

impl DrumFeatures {
    pub fn matches(&self, instrument: Instrument, thresholds: &Thresholds) -> bool {
        match instrument {
            Instrument::Kick => self.matches_kick(thresholds),
            Instrument::Snare => self.matches_snare(thresholds),
            Instrument::Hihat => self.matches_hihat(thresholds),
        }
    }

    pub fn matches_kick(&self, t: &Thresholds) -> bool {
        let loud_enough = self.volume > t.value(VOLUME) * 0.7;
        // Adaptive: compare against the band's own recent average.
        let energetic = self.kick_energy > self.kick_average * 1.5
            && self.kick_energy > t.value(BASS) * 0.8;
        let attack = self.kick_transient > t.value(KICK_ATTACK);
        let low_to_mid = self.kick_energy / (self.mid_energy + RATIO_EPSILON);

        loud_enough && energetic && attack && low_to_mid > KICK_MIN_LOW_TO_MID_RATIO
    }

    pub fn matches_snare(&self, t: &Thresholds) -> bool {
        let loud_enough = self.volume > t.value(VOLUME) * 0.6;
        let body = self.snare_body_energy > t.value(MID) * 0.7
            && self.snare_body_transient > t.value(SNARE_ATTACK) * 0.5;
        let attack = self.snare_attack_energy > t.value(MID) * 0.6
            && self.snare_attack_transient > t.value(SNARE_ATTACK) * 0.7;

        loud_enough && body && attack
    }

    pub fn matches_hihat(&self, t: &Thresholds) -> bool {
        self.hihat_energy > t.value(TREBLE) * 0.5
            && self.hihat_transient > t.value(HIHAT_ATTACK)
            && self.zero_crossing_rate > HIHAT_MIN_ZERO_CROSSING_RATE
            && self.spectral_centroid > HIHAT_MIN_SPECTRAL_CENTROID
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct OnsetGate {
    active: bool,
    last_onset_ms: Option<u64>,
}

impl OnsetGate {
    fn evaluate(&mut self, matched: bool, now_ms: u64, min_interval_ms: u64) -> bool {
        let rested = self
            .last_onset_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= min_interval_ms);
        self.active = matched && rested;
        if self.active {
            self.last_onset_ms = Some(now_ms);
        }
        self.active
    }
}

/// Copy of the debounce state handed to callers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DrumDetectionState {
    pub kick: bool,
    pub snare: bool,
    pub hihat: bool,
    pub last_kick_ms: Option<u64>,
    pub last_snare_ms: Option<u64>,
    pub last_hihat_ms: Option<u64>,
    pub min_time_between_beats_ms: u64,
}

/// Debounced onset flags for kick, snare and hi-hat.
///
/// An accepted onset raises the instrument's flag for a single tick and
/// starts its refractory window.
#[derive(Clone, Debug)]
pub struct DrumDetector {
    kick: OnsetGate,
    snare: OnsetGate,
    hihat: OnsetGate,
    min_time_between_beats_ms: u64,
}

impl Default for DrumDetector {
    fn default() -> Self {
        Self {
            kick: OnsetGate::default(),
            snare: OnsetGate::default(),
            hihat: OnsetGate::default(),
            min_time_between_beats_ms: DEFAULT_MIN_TIME_BETWEEN_BEATS_MS,
        }
    }
}

impl DrumDetector {
    fn gate_mut(&mut self, instrument: Instrument) -> &mut OnsetGate {
        match instrument {
            Instrument::Kick => &mut self.kick,
            Instrument::Snare => &mut self.snare,
            Instrument::Hihat => &mut self.hihat,
        }
    }

    fn gate(&self, instrument: Instrument) -> &OnsetGate {
        match instrument {
            Instrument::Kick => &self.kick,
            Instrument::Snare => &self.snare,
            Instrument::Hihat => &self.hihat,
        }
    }

    /// Re-evaluate every instrument for the tick at `now_ms`.
    pub fn evaluate(&mut self, features: &DrumFeatures, thresholds: &Thresholds, now_ms: u64) {
        let min_interval = self.min_time_between_beats_ms;
        for instrument in Instrument::ALL {
            let matched = features.matches(instrument, thresholds);
            if self.gate_mut(instrument).evaluate(matched, now_ms, min_interval) {
                log::debug!("{:?} onset at {} ms", instrument, now_ms);
            }
        }
    }

    pub fn is_active(&self, instrument: Instrument) -> bool {
        self.gate(instrument).active
    }

    pub fn min_time_between_beats_ms(&self) -> u64 {
        self.min_time_between_beats_ms
    }

    /// Values below the 50 ms floor are raised to it.
    pub fn set_min_time_between_beats(&mut self, ms: u64) {
        self.min_time_between_beats_ms = ms.max(MIN_TIME_BETWEEN_BEATS_FLOOR_MS);
    }

    pub fn state(&self) -> DrumDetectionState {
        DrumDetectionState {
            kick: self.kick.active,
            snare: self.snare.active,
            hihat: self.hihat.active,
            last_kick_ms: self.kick.last_onset_ms,
            last_snare_ms: self.snare.last_onset_ms,
            last_hihat_ms: self.hihat.last_onset_ms,
            min_time_between_beats_ms: self.min_time_between_beats_ms,
        }
    }
}
