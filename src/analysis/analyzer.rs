use std::collections::BTreeMap;
use std::time::Instant;

use super::bands::{self, Band, BandSet, DRUM_BANDS};
use super::features;
use super::frame::FeatureFrame;
use super::history::{EnergyHistory, DEFAULT_HISTORY_SIZE};
use super::onset::{DrumDetectionState, DrumDetector, DrumFeatures, Instrument};
use super::thresholds::Thresholds;
use crate::audio::source::{is_valid_fft_size, FrameSource, SILENT_SAMPLE};
use crate::config::Config;
use crate::error::{AnalyzerError, SourceError};

pub const DEFAULT_FFT_SIZE: usize = 2048;
pub const DEFAULT_SMOOTHING: f32 = 0.5;

/// Per-tick feature extraction and drum onset detection over a [`FrameSource`].
///
/// Holds the current and previous byte snapshots, the rolling energy history
/// of the drum bands and the debounced onset flags. Call `update` once per
/// render tick, then query. Until `init` succeeds every query returns a
/// neutral value (0, false or an empty vector) and `update` does nothing.
pub struct AudioAnalyzer<S> {
    source: Option<S>,
    fft_size: usize,
    smoothing: f32,
    sample_rate: f32,

    frequency: Vec<u8>,
    prev_frequency: Vec<u8>,
    time_domain: Vec<u8>,
    prev_time_domain: Vec<u8>,

    bands: BandSet,
    thresholds: Thresholds,
    history: BTreeMap<&'static str, EnergyHistory>,
    drums: DrumDetector,

    clock_origin: Instant,
    last_update_ms: u64,
}

impl<S: FrameSource> Default for AudioAnalyzer<S> {
    fn default() -> Self {
        Self::new(DEFAULT_FFT_SIZE, DEFAULT_SMOOTHING)
    }
}

impl<S: FrameSource> AudioAnalyzer<S> {
    /// Create an uninitialized analyzer. The FFT size is validated on `init`.
    pub fn new(fft_size: usize, smoothing: f32) -> Self {
        Self {
            source: None,
            fft_size,
            smoothing: clamp_unit(smoothing).unwrap_or(DEFAULT_SMOOTHING),
            sample_rate: 0.0,
            frequency: Vec::new(),
            prev_frequency: Vec::new(),
            time_domain: Vec::new(),
            prev_time_domain: Vec::new(),
            bands: BandSet::default(),
            thresholds: Thresholds::default(),
            history: new_history(DEFAULT_HISTORY_SIZE),
            drums: DrumDetector::default(),
            clock_origin: Instant::now(),
            last_update_ms: 0,
        }
    }

    /// Build an analyzer from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        let settings = &config.analyzer;
        let mut analyzer = Self::new(settings.fft_size, settings.smoothing);
        analyzer.history = new_history(settings.history_size);
        analyzer.set_min_time_between_beats(settings.min_time_between_beats_ms);

        for (name, value) in &config.thresholds {
            if analyzer.thresholds.get(name).is_none() {
                log::warn!("Ignoring unknown threshold '{}' in config", name);
                continue;
            }
            // NaN values are rejected (and logged) by the setter
            analyzer.set_threshold(name, *value);
        }
        for (name, band) in &config.bands {
            if !analyzer.bands.insert(name.as_str(), *band) {
                log::warn!(
                    "Ignoring band '{}' in config: {}..{} Hz is not a valid range",
                    name,
                    band.min_hz,
                    band.max_hz
                );
            }
        }
        analyzer
    }

    /// Attach the upstream frame source.
    ///
    /// On failure the analyzer stays uninitialized and the source is dropped;
    /// the error is returned once and setup is not retried. Calling this on an
    /// initialized analyzer keeps the current source.
    pub fn init(&mut self, mut source: S) -> Result<(), AnalyzerError> {
        if self.is_initialized() {
            log::debug!("AudioAnalyzer already initialized, keeping current source");
            return Ok(());
        }
        if !is_valid_fft_size(self.fft_size) {
            return Err(AnalyzerError::InvalidFftSize(self.fft_size));
        }
        if let Err(err) = source.configure(self.fft_size, self.smoothing) {
            log::error!("AudioAnalyzer initialization failed: {}", err);
            return Err(err.into());
        }

        let sample_rate = source.sample_rate();
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            let err = SourceError::Unavailable(format!("invalid sample rate {}", sample_rate));
            log::error!("AudioAnalyzer initialization failed: {}", err);
            return Err(err.into());
        }

        self.sample_rate = sample_rate;
        self.source = Some(source);
        self.allocate_buffers();
        log::info!(
            "AudioAnalyzer initialized with FFT size {} ({} bins, {} Hz)",
            self.fft_size,
            self.bin_count(),
            self.sample_rate
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.source.is_some()
    }

    /// Access the attached source, e.g. to feed it samples between ticks.
    pub fn source_mut(&mut self) -> Option<&mut S> {
        self.source.as_mut()
    }

    pub fn source(&self) -> Option<&S> {
        self.source.as_ref()
    }

    /// Advance one tick using the analyzer's monotonic clock.
    pub fn update(&mut self) {
        let now_ms = self.clock_origin.elapsed().as_millis() as u64;
        self.update_at(now_ms);
    }

    /// Advance one tick at an explicit time in milliseconds.
    ///
    /// Times must come from one consistent clock; the refractory window is
    /// measured between successive values.
    pub fn update_at(&mut self, now_ms: u64) {
        let Some(source) = self.source.as_mut() else {
            return;
        };

        self.prev_frequency.copy_from_slice(&self.frequency);
        self.prev_time_domain.copy_from_slice(&self.time_domain);
        source.read_frequency_data(&mut self.frequency);
        source.read_time_domain_data(&mut self.time_domain);
        self.last_update_ms = now_ms;

        self.update_energy_history();
        let drum_features = self.drum_features();
        self.drums.evaluate(&drum_features, &self.thresholds, now_ms);
    }

    fn update_energy_history(&mut self) {
        for name in DRUM_BANDS {
            let energy = self.energy(name);
            if let Some(history) = self.history.get_mut(name) {
                history.push(energy);
            }
        }
    }

    fn drum_features(&self) -> DrumFeatures {
        DrumFeatures {
            volume: self.volume(),
            mid_energy: self.energy(bands::MID),
            kick_energy: self.energy(bands::KICK_DRUM),
            kick_average: self.average_energy(bands::KICK_DRUM),
            kick_transient: self.transient(bands::KICK_DRUM),
            snare_body_energy: self.energy(bands::SNARE_DRUM_BODY),
            snare_body_transient: self.transient(bands::SNARE_DRUM_BODY),
            snare_attack_energy: self.energy(bands::SNARE_DRUM_ATTACK),
            snare_attack_transient: self.transient(bands::SNARE_DRUM_ATTACK),
            hihat_energy: self.energy(bands::HIHAT),
            hihat_transient: self.transient(bands::HIHAT),
            zero_crossing_rate: self.zero_crossing_rate(),
            spectral_centroid: self.spectral_centroid(),
        }
    }

    fn allocate_buffers(&mut self) {
        let bins = self.fft_size / 2;
        self.frequency = vec![0; bins];
        self.prev_frequency = vec![0; bins];
        self.time_domain = vec![SILENT_SAMPLE; bins];
        self.prev_time_domain = vec![SILENT_SAMPLE; bins];
    }

    fn band_bins(&self, band: &str) -> Option<std::ops::RangeInclusive<usize>> {
        if !self.is_initialized() {
            return None;
        }
        self.bands
            .get(band)?
            .bin_range(self.frequency.len(), self.sample_rate)
    }

    // ---- feature queries ----

    /// RMS level of the current time-domain window, nominally 0.0-1.0.
    pub fn volume(&self) -> f32 {
        if !self.is_initialized() {
            return 0.0;
        }
        features::volume(&self.time_domain)
    }

    /// Mean normalized magnitude of a named band, 0 for unknown bands.
    pub fn energy(&self, band: &str) -> f32 {
        self.band_bins(band)
            .map_or(0.0, |bins| features::band_energy(&self.frequency, bins))
    }

    /// Rise of a band's energy since the previous tick. Never negative.
    pub fn transient(&self, band: &str) -> f32 {
        self.band_bins(band).map_or(0.0, |bins| {
            features::transient(&self.frequency, &self.prev_frequency, bins)
        })
    }

    pub fn zero_crossing_rate(&self) -> f32 {
        if !self.is_initialized() {
            return 0.0;
        }
        features::zero_crossing_rate(&self.time_domain)
    }

    pub fn spectral_centroid(&self) -> f32 {
        if !self.is_initialized() {
            return 0.0;
        }
        features::spectral_centroid(&self.frequency)
    }

    /// Mean of the rolling history; only drum bands keep one.
    pub fn average_energy(&self, band: &str) -> f32 {
        self.history.get(band).map_or(0.0, EnergyHistory::average)
    }

    /// Raw magnitude of one bin, 0 when out of range.
    pub fn frequency_value(&self, index: usize) -> u8 {
        self.frequency.get(index).copied().unwrap_or(0)
    }

    pub fn normalized_frequency_data(&self) -> Vec<f32> {
        self.frequency.iter().map(|&m| m as f32 / 255.0).collect()
    }

    pub fn frequency_data(&self) -> &[u8] {
        &self.frequency
    }

    pub fn time_domain_data(&self) -> &[u8] {
        &self.time_domain
    }

    // ---- onsets ----

    pub fn is_kick(&self) -> bool {
        self.drums.is_active(Instrument::Kick)
    }

    pub fn is_snare(&self) -> bool {
        self.drums.is_active(Instrument::Snare)
    }

    pub fn is_hihat(&self) -> bool {
        self.drums.is_active(Instrument::Hihat)
    }

    pub fn is_onset(&self, instrument: Instrument) -> bool {
        self.drums.is_active(instrument)
    }

    /// Beat on the low band; same as [`is_kick`](Self::is_kick).
    pub fn is_bass(&self) -> bool {
        self.is_kick()
    }

    pub fn is_mid(&self) -> bool {
        self.is_snare()
    }

    pub fn is_treble(&self) -> bool {
        self.is_hihat()
    }

    /// Kick criteria on the current frame, ignoring the refractory window.
    pub fn matches_kick(&self) -> bool {
        self.is_initialized() && self.drum_features().matches_kick(&self.thresholds)
    }

    pub fn matches_snare(&self) -> bool {
        self.is_initialized() && self.drum_features().matches_snare(&self.thresholds)
    }

    pub fn matches_hihat(&self) -> bool {
        self.is_initialized() && self.drum_features().matches_hihat(&self.thresholds)
    }

    /// Whether a band's energy exceeds `threshold`, or the threshold of the
    /// same name when none is given.
    pub fn is_energy_above_threshold(&self, band: &str, threshold: Option<f32>) -> bool {
        if !self.is_initialized() || !self.bands.contains(band) {
            return false;
        }
        match threshold.or_else(|| self.thresholds.get(band)) {
            Some(limit) => self.energy(band) > limit,
            None => false,
        }
    }

    pub fn is_bass_active(&self, threshold: Option<f32>) -> bool {
        self.is_energy_above_threshold(bands::BASS, threshold)
    }

    pub fn is_mid_active(&self, threshold: Option<f32>) -> bool {
        self.is_energy_above_threshold(bands::MID, threshold)
    }

    pub fn is_treble_active(&self, threshold: Option<f32>) -> bool {
        self.is_energy_above_threshold(bands::TREBLE, threshold)
    }

    /// Snapshot of this tick's features for the renderer.
    pub fn frame(&self) -> FeatureFrame {
        FeatureFrame {
            time_ms: self.last_update_ms,
            volume: self.volume(),
            bass: self.energy(bands::BASS),
            mid: self.energy(bands::MID),
            treble: self.energy(bands::TREBLE),
            kick_transient: self.transient(bands::KICK_DRUM),
            snare_transient: self.transient(bands::SNARE_DRUM_ATTACK),
            hihat_transient: self.transient(bands::HIHAT),
            spectral_centroid: self.spectral_centroid(),
            zero_crossing_rate: self.zero_crossing_rate(),
            kick: self.is_kick(),
            snare: self.is_snare(),
            hihat: self.is_hihat(),
        }
    }

    // ---- configuration ----

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn bin_count(&self) -> usize {
        self.frequency.len()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn smoothing_time_constant(&self) -> f32 {
        self.smoothing
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds.clone()
    }

    pub fn bands(&self) -> BandSet {
        self.bands.clone()
    }

    pub fn drum_detection_state(&self) -> DrumDetectionState {
        self.drums.state()
    }

    /// Change the analysis window. Buffers are reallocated at the new bin
    /// count and the previous frame reads as silence until the next tick.
    pub fn set_fft_size(&mut self, fft_size: usize) -> Result<(), AnalyzerError> {
        if !is_valid_fft_size(fft_size) {
            log::warn!("Rejecting FFT size {}", fft_size);
            return Err(AnalyzerError::InvalidFftSize(fft_size));
        }
        if let Some(source) = self.source.as_mut() {
            source.configure(fft_size, self.smoothing)?;
        }
        self.fft_size = fft_size;
        if self.is_initialized() {
            self.allocate_buffers();
            log::info!("FFT size changed to {} ({} bins)", fft_size, self.bin_count());
        }
        Ok(())
    }

    /// Clamped to [0, 1]; NaN is ignored.
    pub fn set_smoothing_time_constant(&mut self, value: f32) {
        let Some(smoothing) = clamp_unit(value) else {
            log::warn!("Ignoring NaN smoothing time constant");
            return;
        };
        self.smoothing = smoothing;
        if let Some(source) = self.source.as_mut() {
            source.set_smoothing(smoothing);
        }
    }

    /// Move an existing band. Returns false for unknown bands or inverted ranges.
    pub fn set_band_range(&mut self, band: &str, min_hz: f32, max_hz: f32) -> bool {
        self.bands.set_range(band, min_hz, max_hz)
    }

    /// Register a new band (or replace one). Only drum bands keep history.
    pub fn insert_band(&mut self, name: &str, band: Band) -> bool {
        self.bands.insert(name, band)
    }

    pub fn set_threshold(&mut self, name: &str, value: f32) -> bool {
        self.thresholds.set(name, value)
    }

    pub fn set_all_thresholds<I, K>(&mut self, values: I) -> usize
    where
        I: IntoIterator<Item = (K, f32)>,
        K: AsRef<str>,
    {
        self.thresholds.set_all(values)
    }

    pub fn min_time_between_beats(&self) -> u64 {
        self.drums.min_time_between_beats_ms()
    }

    /// Minimum milliseconds between two onsets of one instrument (at least 50).
    pub fn set_min_time_between_beats(&mut self, ms: u64) {
        self.drums.set_min_time_between_beats(ms);
    }
}

fn new_history(capacity: usize) -> BTreeMap<&'static str, EnergyHistory> {
    DRUM_BANDS
        .into_iter()
        .map(|name| (name, EnergyHistory::new(capacity)))
        .collect()
}

fn clamp_unit(value: f32) -> Option<f32> {
    (!value.is_nan()).then(|| value.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::thresholds;
    use crate::audio::source::ByteFrameSource;
    use crate::error::SourceError;
    use approx::assert_relative_eq;

    const SR: f32 = 44100.0;
    const BINS: usize = 1024;

    fn analyzer() -> AudioAnalyzer<ByteFrameSource> {
        let mut analyzer = AudioAnalyzer::new(2048, 0.5);
        analyzer.init(ByteFrameSource::new(SR)).unwrap();
        analyzer
    }

    fn feed(analyzer: &mut AudioAnalyzer<ByteFrameSource>, freq: &[u8], time: &[u8], now_ms: u64) {
        analyzer.source_mut().unwrap().push_frame(freq, time);
        analyzer.update_at(now_ms);
    }

    /// Full-scale bins over [lo, hi] Hz at 44.1 kHz / 2048.
    fn spectrum(ranges: &[(f32, f32)]) -> Vec<u8> {
        let mut freq = vec![0u8; BINS];
        for &(lo, hi) in ranges {
            let bins = Band::new(lo, hi).unwrap().bin_range(BINS, SR).unwrap();
            freq[bins].fill(255);
        }
        freq
    }

    fn square_wave(period: usize, low: u8, high: u8) -> Vec<u8> {
        (0..BINS)
            .map(|i| if (i / period) % 2 == 0 { high } else { low })
            .collect()
    }

    struct DeadSource;

    impl FrameSource for DeadSource {
        fn configure(&mut self, _: usize, _: f32) -> Result<(), SourceError> {
            Err(SourceError::Unavailable("permission denied".into()))
        }
        fn set_smoothing(&mut self, _: f32) {}
        fn sample_rate(&self) -> f32 {
            SR
        }
        fn read_frequency_data(&mut self, out: &mut [u8]) {
            out.fill(255);
        }
        fn read_time_domain_data(&mut self, out: &mut [u8]) {
            out.fill(0);
        }
    }

    #[test]
    fn uninitialized_queries_are_neutral() {
        let mut analyzer: AudioAnalyzer<ByteFrameSource> = AudioAnalyzer::default();
        analyzer.update_at(100);
        assert!(!analyzer.is_initialized());
        assert_eq!(analyzer.volume(), 0.0);
        assert_eq!(analyzer.energy(bands::BASS), 0.0);
        assert_eq!(analyzer.transient(bands::BASS), 0.0);
        assert_eq!(analyzer.zero_crossing_rate(), 0.0);
        assert_eq!(analyzer.spectral_centroid(), 0.0);
        assert_eq!(analyzer.frequency_value(3), 0);
        assert!(analyzer.normalized_frequency_data().is_empty());
        assert!(!analyzer.is_kick() && !analyzer.matches_kick());
        assert!(!analyzer.is_bass_active(Some(0.0)));
    }

    #[test]
    fn failed_setup_reports_once_and_stays_uninitialized() {
        let mut analyzer: AudioAnalyzer<DeadSource> = AudioAnalyzer::default();
        let err = analyzer.init(DeadSource).unwrap_err();
        assert!(matches!(err, AnalyzerError::Upstream(SourceError::Unavailable(_))));
        assert!(!analyzer.is_initialized());

        analyzer.update_at(0);
        assert_eq!(analyzer.volume(), 0.0);
        assert_eq!(analyzer.energy(bands::BASS), 0.0);
    }

    #[test]
    fn init_rejects_unusable_sample_rates() {
        for rate in [0.0, -44100.0, f32::NAN, f32::INFINITY] {
            let mut analyzer: AudioAnalyzer<ByteFrameSource> = AudioAnalyzer::default();
            let err = analyzer.init(ByteFrameSource::new(rate)).unwrap_err();
            assert!(
                matches!(err, AnalyzerError::Upstream(SourceError::Unavailable(_))),
                "rate {} gave {:?}",
                rate,
                err
            );
            assert!(!analyzer.is_initialized());
            assert_eq!(analyzer.bin_count(), 0);

            analyzer.update_at(0);
            assert_eq!(analyzer.energy(bands::BASS), 0.0);
            assert_eq!(analyzer.energy(bands::TREBLE), 0.0);
            assert!(!analyzer.is_kick());
        }
    }

    #[test]
    fn wall_clock_updates_advance() {
        let mut analyzer = analyzer();
        let mut freq = vec![0u8; BINS];
        freq[..=11].fill(255);
        analyzer.source_mut().unwrap().push_frame(&freq, &[128; BINS]);
        analyzer.update();
        let first = analyzer.frame();
        assert_relative_eq!(first.bass, 1.0);
        assert_relative_eq!(analyzer.transient(bands::BASS), 1.0);

        std::thread::sleep(std::time::Duration::from_millis(5));
        analyzer.source_mut().unwrap().push_frame(&[0; BINS], &[128; BINS]);
        analyzer.update();
        let second = analyzer.frame();
        assert_eq!(second.bass, 0.0);
        assert!(second.time_ms >= first.time_ms + 5);
        assert_relative_eq!(analyzer.average_energy(bands::KICK_DRUM), 0.1);
    }

    #[test]
    fn nan_threshold_in_config_keeps_default() {
        let config: Config = toml::from_str(
            r#"
            [thresholds]
            bass = nan
            mid = 0.3
            "#,
        )
        .unwrap();
        let analyzer: AudioAnalyzer<ByteFrameSource> = AudioAnalyzer::from_config(&config);
        assert_eq!(analyzer.thresholds().get(thresholds::BASS), Some(0.5));
        assert_eq!(analyzer.thresholds().get(thresholds::MID), Some(0.3));
    }

    #[test]
    fn init_rejects_invalid_fft_size() {
        let mut analyzer = AudioAnalyzer::new(1000, 0.5);
        assert_eq!(
            analyzer.init(ByteFrameSource::new(SR)),
            Err(AnalyzerError::InvalidFftSize(1000))
        );
        assert!(!analyzer.is_initialized());
    }

    #[test]
    fn bass_scenario() {
        let mut analyzer = analyzer();
        assert_eq!(analyzer.bin_count(), BINS);

        let mut freq = vec![0u8; BINS];
        freq[..=55].fill(255);
        feed(&mut analyzer, &freq, &[128; BINS], 0);

        assert_relative_eq!(analyzer.energy(bands::BASS), 1.0);
        assert_relative_eq!(analyzer.energy(bands::TREBLE), 0.0);
        assert_eq!(analyzer.energy("cowbell"), 0.0);
    }

    #[test]
    fn energies_stay_in_unit_range() {
        let mut analyzer = analyzer();
        let freq: Vec<u8> = (0..BINS).map(|i| (i * 37 % 256) as u8).collect();
        let time: Vec<u8> = (0..BINS).map(|i| (i * 91 % 256) as u8).collect();
        feed(&mut analyzer, &freq, &time, 0);
        for (name, _) in analyzer.bands().iter() {
            let energy = analyzer.energy(name);
            assert!((0.0..=1.0).contains(&energy), "{} = {}", name, energy);
            assert!(analyzer.transient(name) >= 0.0);
        }
    }

    #[test]
    fn transients_ignore_falling_energy() {
        let mut analyzer = analyzer();
        let loud = spectrum(&[(20.0, 250.0)]);
        feed(&mut analyzer, &loud, &[128; BINS], 0);
        assert_relative_eq!(analyzer.transient(bands::BASS), 1.0);

        feed(&mut analyzer, &[0; BINS], &[128; BINS], 16);
        assert_eq!(analyzer.transient(bands::BASS), 0.0);
    }

    #[test]
    fn volume_and_zero_crossings() {
        let mut analyzer = analyzer();
        feed(&mut analyzer, &[0; BINS], &[128; BINS], 0);
        assert_eq!(analyzer.volume(), 0.0);
        assert_eq!(analyzer.zero_crossing_rate(), 0.0);

        feed(&mut analyzer, &[0; BINS], &square_wave(1, 60, 200), 16);
        assert!(analyzer.volume() > 0.0);
        assert_relative_eq!(analyzer.zero_crossing_rate(), 1.0);
    }

    #[test]
    fn queries_are_stable_between_updates() {
        let mut analyzer = analyzer();
        feed(&mut analyzer, &spectrum(&[(7000.0, 12000.0)]), &square_wave(2, 90, 170), 0);
        let first = analyzer.frame();
        let second = analyzer.frame();
        assert_eq!(first, second);
        assert_eq!(analyzer.energy(bands::HIHAT), analyzer.energy(bands::HIHAT));
    }

    #[test]
    fn history_tracks_drum_bands() {
        let mut analyzer = analyzer();
        let kick = spectrum(&[(20.0, 120.0)]);
        feed(&mut analyzer, &kick, &[128; BINS], 0);
        assert_relative_eq!(analyzer.average_energy(bands::KICK_DRUM), 0.1);
        feed(&mut analyzer, &kick, &[128; BINS], 16);
        assert_relative_eq!(analyzer.average_energy(bands::KICK_DRUM), 0.2);
        assert_eq!(analyzer.average_energy(bands::BASS), 0.0);
    }

    #[test]
    fn kick_fires_and_debounces() {
        let mut analyzer = analyzer();
        let kick = spectrum(&[(20.0, 250.0)]);
        let silent = vec![0u8; BINS];
        let loud_time = square_wave(64, 0, 255);

        feed(&mut analyzer, &kick, &loud_time, 1_000);
        assert!(analyzer.is_kick());
        assert!(analyzer.is_bass());
        assert_eq!(analyzer.drum_detection_state().last_kick_ms, Some(1_000));

        // Next tick without a hit: flag drops
        feed(&mut analyzer, &silent, &loud_time, 1_016);
        assert!(!analyzer.is_kick());

        // Hit again inside the refractory window: criteria met, no onset
        feed(&mut analyzer, &kick, &loud_time, 1_050);
        assert!(analyzer.matches_kick());
        assert!(!analyzer.is_kick());

        // Hit again once the window has passed
        feed(&mut analyzer, &silent, &loud_time, 1_066);
        feed(&mut analyzer, &kick, &loud_time, 1_100);
        assert!(analyzer.is_kick());
    }

    #[test]
    fn kick_needs_volume() {
        let mut analyzer = analyzer();
        feed(&mut analyzer, &spectrum(&[(20.0, 250.0)]), &[128; BINS], 0);
        assert!(!analyzer.is_kick());
    }

    #[test]
    fn snare_fires_on_body_and_attack() {
        let mut analyzer = analyzer();
        let snare = spectrum(&[(200.0, 650.0), (800.0, 1200.0)]);
        feed(&mut analyzer, &snare, &square_wave(64, 0, 255), 0);
        assert!(analyzer.is_snare());
        assert!(analyzer.is_mid());
        assert!(!analyzer.is_kick());
        assert!(!analyzer.is_hihat());
    }

    #[test]
    fn hihat_fires_on_bright_noise() {
        let mut analyzer = analyzer();
        let hihat = spectrum(&[(7000.0, 20000.0)]);
        feed(&mut analyzer, &hihat, &square_wave(1, 100, 160), 0);
        assert!(analyzer.spectral_centroid() > 0.6);
        assert!(analyzer.is_hihat());
        assert!(analyzer.is_treble());

        // Same spectrum with a smooth waveform is not noisy enough
        let mut other = self::analyzer();
        feed(&mut other, &hihat, &square_wave(64, 100, 160), 0);
        assert!(!other.is_hihat());
    }

    #[test]
    fn resizing_fft_reallocates_buffers() {
        let mut analyzer = analyzer();
        feed(&mut analyzer, &spectrum(&[(20.0, 250.0)]), &[128; BINS], 0);

        analyzer.set_fft_size(512).unwrap();
        assert_eq!(analyzer.bin_count(), 256);
        assert_eq!(analyzer.frequency_data().len(), 256);
        assert_eq!(analyzer.time_domain_data().len(), 256);
        assert_eq!(analyzer.energy(bands::BASS), 0.0);
        assert_eq!(analyzer.volume(), 0.0);

        // 256 bins over 22050 Hz: bass covers bins 0..=2
        let mut freq = vec![0u8; 256];
        freq[..3].fill(255);
        feed(&mut analyzer, &freq, &[128; 256], 16);
        assert_relative_eq!(analyzer.energy(bands::BASS), 1.0);
        assert_relative_eq!(analyzer.transient(bands::BASS), 1.0);
    }

    #[test]
    fn invalid_fft_size_keeps_state() {
        let mut analyzer = analyzer();
        assert_eq!(analyzer.set_fft_size(3000), Err(AnalyzerError::InvalidFftSize(3000)));
        assert_eq!(analyzer.fft_size(), 2048);
        assert_eq!(analyzer.bin_count(), BINS);
    }

    #[test]
    fn configuration_is_clamped() {
        let mut analyzer = analyzer();
        analyzer.set_threshold(thresholds::BASS, 1.5);
        assert_eq!(analyzer.thresholds().get(thresholds::BASS), Some(1.0));
        analyzer.set_threshold(thresholds::BASS, -0.2);
        assert_eq!(analyzer.thresholds().get(thresholds::BASS), Some(0.0));

        analyzer.set_smoothing_time_constant(3.0);
        assert_eq!(analyzer.smoothing_time_constant(), 1.0);
        analyzer.set_smoothing_time_constant(f32::NAN);
        assert_eq!(analyzer.smoothing_time_constant(), 1.0);

        analyzer.set_min_time_between_beats(20);
        assert_eq!(analyzer.min_time_between_beats(), 50);
    }

    #[test]
    fn accessors_return_copies() {
        let mut analyzer = analyzer();
        let mut bands = analyzer.bands();
        bands.set_range(bands::BASS, 100.0, 200.0);
        assert_eq!(
            analyzer.bands().get(bands::BASS),
            Some(Band { min_hz: 20.0, max_hz: 250.0 })
        );

        let mut thresholds = analyzer.thresholds();
        thresholds.set(thresholds::MID, 0.9);
        assert_eq!(analyzer.thresholds().get(thresholds::MID), Some(0.4));

        assert!(analyzer.set_band_range(bands::BASS, 40.0, 200.0));
        assert!(!analyzer.set_band_range("sub", 10.0, 40.0));
    }

    #[test]
    fn band_activity_uses_named_threshold() {
        let mut analyzer = analyzer();
        feed(&mut analyzer, &spectrum(&[(20.0, 250.0)]), &[128; BINS], 0);
        assert!(analyzer.is_bass_active(None));
        assert!(!analyzer.is_mid_active(None));
        assert!(!analyzer.is_bass_active(Some(1.0)));

        // Drum bands have no threshold of their own
        assert!(!analyzer.is_energy_above_threshold(bands::KICK_DRUM, None));
        assert!(analyzer.is_energy_above_threshold(bands::KICK_DRUM, Some(0.5)));
    }

    #[test]
    fn frequency_accessors_are_bounds_checked() {
        let mut analyzer = analyzer();
        let mut freq = vec![0u8; BINS];
        freq[10] = 51;
        feed(&mut analyzer, &freq, &[128; BINS], 0);
        assert_eq!(analyzer.frequency_value(10), 51);
        assert_eq!(analyzer.frequency_value(BINS), 0);
        let normalized = analyzer.normalized_frequency_data();
        assert_eq!(normalized.len(), BINS);
        assert_relative_eq!(normalized[10], 0.2);
    }

    #[test]
    fn independent_instances_do_not_share_state() {
        let mut a = analyzer();
        let b = analyzer();
        feed(&mut a, &spectrum(&[(20.0, 250.0)]), &square_wave(64, 0, 255), 0);
        assert!(a.is_kick());
        assert!(!b.is_kick());
        assert_eq!(b.energy(bands::BASS), 0.0);
    }

    #[test]
    fn config_overrides_are_applied() {
        let config: Config = toml::from_str(
            r#"
            [analyzer]
            fft_size = 1024
            min_time_between_beats_ms = 30
            history_size = 4

            [thresholds]
            volume = 0.35
            bogus = 0.9

            [bands.sub]
            min_hz = 20.0
            max_hz = 60.0

            [bands.broken]
            min_hz = 500.0
            max_hz = 100.0
            "#,
        )
        .unwrap();
        let mut analyzer: AudioAnalyzer<ByteFrameSource> = AudioAnalyzer::from_config(&config);
        assert_eq!(analyzer.min_time_between_beats(), 50);
        assert_eq!(analyzer.thresholds().get(thresholds::VOLUME), Some(0.35));
        assert!(analyzer.bands().contains("sub"));
        assert!(!analyzer.bands().contains("broken"));

        analyzer.init(ByteFrameSource::new(SR)).unwrap();
        assert_eq!(analyzer.bin_count(), 512);
        let kick = spectrum(&[(20.0, 120.0)]);
        feed(&mut analyzer, &kick[..512], &[128; 512], 0);
        assert_relative_eq!(analyzer.average_energy(bands::KICK_DRUM), 0.25);
    }
}
