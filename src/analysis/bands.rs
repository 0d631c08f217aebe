use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

pub const BASS: &str = "bass";
pub const MID: &str = "mid";
pub const TREBLE: &str = "treble";
pub const KICK_DRUM: &str = "kick_drum";
pub const SNARE_DRUM_BODY: &str = "snare_drum_body";
pub const SNARE_DRUM_ATTACK: &str = "snare_drum_attack";
pub const HIHAT: &str = "hihat";

/// Bands whose energy is tracked in the rolling history.
pub const DRUM_BANDS: [&str; 4] = [KICK_DRUM, SNARE_DRUM_BODY, SNARE_DRUM_ATTACK, HIHAT];

/// Frequency interval in Hz. `min_hz < max_hz` always holds for bands held by a [`BandSet`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min_hz: f32,
    pub max_hz: f32,
}

impl Band {
    /// Returns `None` unless `0 <= min_hz < max_hz`.
    pub fn new(min_hz: f32, max_hz: f32) -> Option<Self> {
        let band = Self { min_hz, max_hz };
        band.is_valid().then_some(band)
    }

    pub fn is_valid(&self) -> bool {
        self.min_hz.is_finite() && self.max_hz.is_finite() && 0.0 <= self.min_hz && self.min_hz < self.max_hz
    }

    /// Inclusive FFT bin range covered by this band.
    ///
    /// Bin index is `floor(bin_count * hz / nyquist)`. The upper index is
    /// clipped to the last bin; a band starting above Nyquist covers nothing.
    pub fn bin_range(&self, bin_count: usize, sample_rate: f32) -> Option<RangeInclusive<usize>> {
        if bin_count == 0 || !sample_rate.is_finite() || sample_rate <= 0.0 {
            return None;
        }
        let nyquist = sample_rate / 2.0;
        let index = |hz: f32| (bin_count as f32 * hz / nyquist).floor() as usize;
        let min_index = index(self.min_hz);
        if min_index >= bin_count {
            return None;
        }
        let max_index = index(self.max_hz).min(bin_count - 1);
        Some(min_index..=max_index)
    }
}

/// Named frequency bands. Overlapping ranges are allowed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BandSet {
    bands: BTreeMap<String, Band>,
}

impl Default for BandSet {
    fn default() -> Self {
        let defaults = [
            (BASS, 20.0, 250.0),
            (MID, 250.0, 2000.0),
            (TREBLE, 2000.0, 20000.0),
            (KICK_DRUM, 20.0, 120.0),
            (SNARE_DRUM_BODY, 200.0, 650.0),
            (SNARE_DRUM_ATTACK, 800.0, 1200.0),
            (HIHAT, 7000.0, 12000.0),
        ];
        Self {
            bands: defaults
                .into_iter()
                .map(|(name, min_hz, max_hz)| (name.to_string(), Band { min_hz, max_hz }))
                .collect(),
        }
    }
}

impl BandSet {
    pub fn get(&self, name: &str) -> Option<Band> {
        self.bands.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bands.contains_key(name)
    }

    /// Update the range of an existing band. Unknown names and inverted ranges
    /// are ignored; returns whether the band changed.
    pub fn set_range(&mut self, name: &str, min_hz: f32, max_hz: f32) -> bool {
        let Some(slot) = self.bands.get_mut(name) else {
            return false;
        };
        match Band::new(min_hz, max_hz) {
            Some(band) => {
                *slot = band;
                true
            }
            None => {
                log::warn!(
                    "Ignoring range {}..{} Hz for band '{}': min must be below max",
                    min_hz,
                    max_hz,
                    name
                );
                false
            }
        }
    }

    /// Add or replace a band. Invalid ranges are rejected.
    pub fn insert(&mut self, name: impl Into<String>, band: Band) -> bool {
        if !band.is_valid() {
            return false;
        }
        self.bands.insert(name.into(), band);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Band)> {
        self.bands.iter().map(|(name, band)| (name.as_str(), *band))
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }
}
