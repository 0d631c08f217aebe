pub const DEFAULT_HISTORY_SIZE: usize = 10;

/// Fixed-capacity ring of recent band energies.
///
/// Starts out full of zeros, so early averages are pulled towards silence.
#[derive(Clone, Debug)]
pub struct EnergyHistory {
    values: Vec<f32>,
    cursor: usize,
}

impl EnergyHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: vec![0.0; capacity.max(1)],
            cursor: 0,
        }
    }

    /// Overwrite the oldest entry.
    pub fn push(&mut self, value: f32) {
        self.values[self.cursor] = value;
        self.cursor = (self.cursor + 1) % self.values.len();
    }

    pub fn average(&self) -> f32 {
        self.values.iter().sum::<f32>() / self.values.len() as f32
    }

    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.values[self.cursor..]
            .iter()
            .chain(&self.values[..self.cursor])
            .copied()
    }
}

impl Default for EnergyHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}
