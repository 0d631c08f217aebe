use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::source::{is_valid_fft_size, FrameSource};
use crate::error::SourceError;

pub const DEFAULT_MIN_DECIBELS: f32 = -90.0;
pub const DEFAULT_MAX_DECIBELS: f32 = -10.0;

/// Analyser-node style frame source over a PCM stream.
///
/// Samples are pushed in as they are decoded or captured; every read looks at
/// the most recent `fft_size` samples. The spectrum is Blackman-windowed,
/// scaled by 1/N, smoothed over time and mapped from
/// [`min_decibels`, `max_decibels`] onto 0-255.
pub struct PcmAnalyser {
    sample_rate: f32,
    fft_size: usize,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
    planner: FftPlanner<f32>,
    fft: Option<Arc<dyn Fft<f32>>>,
    window: Vec<f32>,
    ring: Vec<f32>,
    write_pos: usize,
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl PcmAnalyser {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            fft_size: 0,
            smoothing: 0.0,
            min_decibels: DEFAULT_MIN_DECIBELS,
            max_decibels: DEFAULT_MAX_DECIBELS,
            planner: FftPlanner::new(),
            fft: None,
            window: Vec::new(),
            ring: Vec::new(),
            write_pos: 0,
            smoothed: Vec::new(),
            scratch: Vec::new(),
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    /// Set the dB range mapped onto the byte spectrum. Ignored unless `min < max`.
    pub fn set_decibel_range(&mut self, min_decibels: f32, max_decibels: f32) {
        if min_decibels < max_decibels {
            self.min_decibels = min_decibels;
            self.max_decibels = max_decibels;
        } else {
            log::warn!(
                "Ignoring decibel range {:.1}..{:.1}: min must be below max",
                min_decibels,
                max_decibels
            );
        }
    }

    /// Append PCM samples (nominally -1.0..1.0) to the analysis window.
    pub fn push_samples(&mut self, samples: &[f32]) {
        if self.ring.is_empty() {
            return;
        }
        // Only the tail can survive in the window.
        let tail = &samples[samples.len().saturating_sub(self.ring.len())..];
        for &s in tail {
            self.ring[self.write_pos] = s;
            self.write_pos = (self.write_pos + 1) % self.ring.len();
        }
    }

    /// Window samples in chronological order.
    fn ordered(&self) -> impl Iterator<Item = f32> + '_ {
        self.ring[self.write_pos..]
            .iter()
            .chain(self.ring[..self.write_pos].iter())
            .copied()
    }

    fn byte_from_magnitude(&self, magnitude: f32) -> u8 {
        if magnitude <= 0.0 {
            return 0;
        }
        let db = 20.0 * magnitude.log10();
        let range = self.max_decibels - self.min_decibels;
        (255.0 / range * (db - self.min_decibels)).floor().clamp(0.0, 255.0) as u8
    }
}

impl FrameSource for PcmAnalyser {
    fn configure(&mut self, fft_size: usize, smoothing: f32) -> Result<(), SourceError> {
        if !is_valid_fft_size(fft_size) {
            return Err(SourceError::UnsupportedFftSize(fft_size));
        }
        if self.sample_rate <= 0.0 {
            return Err(SourceError::Unavailable(format!(
                "invalid sample rate {}",
                self.sample_rate
            )));
        }

        self.fft = Some(self.planner.plan_fft_forward(fft_size));
        self.fft_size = fft_size;
        self.window = blackman_window(fft_size);
        self.ring = vec![0.0; fft_size];
        self.write_pos = 0;
        self.smoothed = vec![0.0; fft_size / 2];
        self.scratch = vec![Complex::new(0.0, 0.0); fft_size];
        self.set_smoothing(smoothing);
        Ok(())
    }

    fn set_smoothing(&mut self, smoothing: f32) {
        self.smoothing = smoothing.clamp(0.0, 1.0);
    }

    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn read_frequency_data(&mut self, out: &mut [u8]) {
        let Some(fft) = self.fft.clone() else {
            out.fill(0);
            return;
        };

        let mut scratch = std::mem::take(&mut self.scratch);
        for ((slot, sample), w) in scratch.iter_mut().zip(self.ordered()).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        fft.process(&mut scratch);

        let n = self.fft_size as f32;
        let tau = self.smoothing;
        for (k, prev) in self.smoothed.iter_mut().enumerate() {
            let magnitude = scratch[k].norm() / n;
            *prev = tau * *prev + (1.0 - tau) * magnitude;
        }
        self.scratch = scratch;

        for (i, byte) in out.iter_mut().enumerate() {
            *byte = self
                .smoothed
                .get(i)
                .map_or(0, |&m| self.byte_from_magnitude(m));
        }
    }

    fn read_time_domain_data(&mut self, out: &mut [u8]) {
        out.fill(128);
        for (byte, sample) in out.iter_mut().zip(self.ordered()) {
            *byte = (128.0 * (sample + 1.0)).clamp(0.0, 255.0) as u8;
        }
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    let a0 = 0.42;
    let a1 = 0.5;
    let a2 = 0.08;
    (0..size)
        .map(|i| {
            let x = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
            a0 - a1 * x.cos() + a2 * (2.0 * x).cos()
        })
        .collect()
}
