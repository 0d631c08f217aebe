use serde::Serialize;
use std::collections::BTreeMap;

pub const VOLUME: &str = "volume";
pub const BASS: &str = "bass";
pub const MID: &str = "mid";
pub const TREBLE: &str = "treble";
pub const KICK_ATTACK: &str = "kick_attack";
pub const SNARE_ATTACK: &str = "snare_attack";
pub const HIHAT_ATTACK: &str = "hihat_attack";

/// Detection thresholds, each kept in [0, 1].
///
/// The set of names is fixed at construction; writes to unknown names are dropped.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Thresholds {
    values: BTreeMap<String, f32>,
}

impl Default for Thresholds {
    fn default() -> Self {
        let defaults = [
            (VOLUME, 0.5),
            (BASS, 0.5),
            (MID, 0.4),
            (TREBLE, 0.2),
            (KICK_ATTACK, 0.15),
            (SNARE_ATTACK, 0.25),
            (HIHAT_ATTACK, 0.10),
        ];
        Self {
            values: defaults
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }
}

impl Thresholds {
    pub fn get(&self, name: &str) -> Option<f32> {
        self.values.get(name).copied()
    }

    /// Threshold value, 0.0 for unknown names.
    pub fn value(&self, name: &str) -> f32 {
        self.get(name).unwrap_or(0.0)
    }

    /// Store `value` clamped to [0, 1]. Returns false for unknown names or NaN.
    pub fn set(&mut self, name: &str, value: f32) -> bool {
        let Some(slot) = self.values.get_mut(name) else {
            return false;
        };
        if value.is_nan() {
            log::warn!("Ignoring NaN for threshold '{}'", name);
            return false;
        }
        *slot = value.clamp(0.0, 1.0);
        true
    }

    /// Apply several writes at once; returns how many were accepted.
    pub fn set_all<I, K>(&mut self, values: I) -> usize
    where
        I: IntoIterator<Item = (K, f32)>,
        K: AsRef<str>,
    {
        values
            .into_iter()
            .filter(|(name, value)| self.set(name.as_ref(), *value))
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }
}
