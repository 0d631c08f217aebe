use crate::error::SourceError;

pub const MIN_FFT_SIZE: usize = 32;
pub const MAX_FFT_SIZE: usize = 32768;

/// Byte value of a time-domain sample sitting on the midline.
pub const SILENT_SAMPLE: u8 = 128;

pub fn is_valid_fft_size(fft_size: usize) -> bool {
    fft_size.is_power_of_two() && (MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&fft_size)
}

/// Upstream audio graph as seen by the analyzer.
///
/// A source delivers, once per tick, a byte-valued magnitude spectrum and a
/// byte-valued time-domain window. Both have `fft_size / 2` entries.
pub trait FrameSource {
    /// Attach or re-attach the source for analysis windows of `fft_size` samples.
    fn configure(&mut self, fft_size: usize, smoothing: f32) -> Result<(), SourceError>;

    fn set_smoothing(&mut self, smoothing: f32);

    /// Sample rate of the analysed signal in Hz.
    fn sample_rate(&self) -> f32;

    /// Fill `out` with the current magnitude spectrum (0-255 per bin).
    fn read_frequency_data(&mut self, out: &mut [u8]);

    /// Fill `out` with the current time-domain window (128 = silence).
    fn read_time_domain_data(&mut self, out: &mut [u8]);
}

/// Frame source fed directly by the host.
///
/// Useful when the host already runs its own FFT, and for building synthetic
/// frames. Whatever was last pushed is served on every read.
#[derive(Debug, Clone)]
pub struct ByteFrameSource {
    sample_rate: f32,
    frequency: Vec<u8>,
    time_domain: Vec<u8>,
}

impl ByteFrameSource {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            frequency: Vec::new(),
            time_domain: Vec::new(),
        }
    }

    pub fn bin_count(&self) -> usize {
        self.frequency.len()
    }

    /// Replace the served frame. Inputs longer than the bin count are truncated,
    /// shorter ones are padded with silence.
    pub fn push_frame(&mut self, frequency: &[u8], time_domain: &[u8]) {
        self.set_frequency_data(frequency);
        self.set_time_domain_data(time_domain);
    }

    pub fn set_frequency_data(&mut self, frequency: &[u8]) {
        copy_padded(&mut self.frequency, frequency, 0);
    }

    pub fn set_time_domain_data(&mut self, time_domain: &[u8]) {
        copy_padded(&mut self.time_domain, time_domain, SILENT_SAMPLE);
    }
}

impl FrameSource for ByteFrameSource {
    fn configure(&mut self, fft_size: usize, _smoothing: f32) -> Result<(), SourceError> {
        if !is_valid_fft_size(fft_size) {
            return Err(SourceError::UnsupportedFftSize(fft_size));
        }
        let bins = fft_size / 2;
        self.frequency = vec![0; bins];
        self.time_domain = vec![SILENT_SAMPLE; bins];
        Ok(())
    }

    fn set_smoothing(&mut self, _smoothing: f32) {}

    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn read_frequency_data(&mut self, out: &mut [u8]) {
        copy_padded(out, &self.frequency, 0);
    }

    fn read_time_domain_data(&mut self, out: &mut [u8]) {
        copy_padded(out, &self.time_domain, SILENT_SAMPLE);
    }
}

fn copy_padded(dst: &mut [u8], src: &[u8], fill: u8) {
    let n = dst.len().min(src.len());
    dst[..n].copy_from_slice(&src[..n]);
    dst[n..].fill(fill);
}
