use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "audiopulse", about = "Audio feature extraction and drum onset detection")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: PathBuf,

    /// Write JSON lines here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file (defaults to ./audiopulse.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Analysis ticks per second
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// FFT window size (power of two, 32-32768)
    #[arg(long, default_value_t = 2048)]
    pub fft_size: usize,

    /// Spectrum smoothing time constant (0.0-1.0)
    #[arg(long, default_value_t = 0.5)]
    pub smoothing: f32,

    /// Minimum milliseconds between onsets of one drum (at least 50)
    #[arg(long, default_value_t = 100)]
    pub min_beat_interval: u64,

    /// Only emit frames with a kick, snare or hi-hat onset
    #[arg(long)]
    pub onsets_only: bool,
}
