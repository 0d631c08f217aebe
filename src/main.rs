mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};

use audiopulse::audio::decode;
use audiopulse::config::{self, Config};
use audiopulse::{AudioAnalyzer, FeatureFrame, PcmAnalyser};
use cli::Cli;

#[derive(Default)]
struct OnsetCounts {
    kick: usize,
    snare: usize,
    hihat: usize,
}

impl OnsetCounts {
    fn record(&mut self, frame: &FeatureFrame) {
        self.kick += frame.kick as usize;
        self.snare += frame.snare as usize;
        self.hihat += frame.hihat as usize;
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    let mut cfg = Config::default();
    if let Some(path) = config::find_config(cli.config.clone()) {
        if let Some(loaded) = config::load_config(&path) {
            log::info!("Loaded config from {}", path.display());
            cfg = loaded;
            // Config values apply only when the CLI is at its default
            if cli.fps == 60 { cli.fps = cfg.output.fps; }
            if cli.fft_size == 2048 { cli.fft_size = cfg.analyzer.fft_size; }
            if cli.smoothing == 0.5 { cli.smoothing = cfg.analyzer.smoothing; }
            if cli.min_beat_interval == 100 {
                cli.min_beat_interval = cfg.analyzer.min_time_between_beats_ms;
            }
        } else {
            log::warn!("Failed to load config from {}, using defaults", path.display());
        }
    }
    cfg.analyzer.fft_size = cli.fft_size;
    cfg.analyzer.smoothing = cli.smoothing;
    cfg.analyzer.min_time_between_beats_ms = cli.min_beat_interval;

    if cli.fps == 0 {
        anyhow::bail!("--fps must be at least 1");
    }
    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }

    log::info!("Input: {}", cli.input.display());
    log::info!(
        "FFT size {}, smoothing {:.2}, {} ticks/s",
        cli.fft_size,
        cli.smoothing,
        cli.fps
    );

    log::info!("Decoding audio...");
    let audio = decode::decode_file(&cli.input)?;

    let mut source = PcmAnalyser::new(audio.sample_rate as f32);
    source.set_decibel_range(cfg.analyzer.min_decibels, cfg.analyzer.max_decibels);

    let mut analyzer = AudioAnalyzer::from_config(&cfg);
    analyzer
        .init(source)
        .context("Failed to set up the analyzer")?;

    let mut out: Box<dyn Write> = match cli.output {
        Some(ref path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };

    let sample_rate = audio.sample_rate as u64;
    let total_ticks = (audio.samples.len() as u64 * cli.fps as u64).div_ceil(sample_rate.max(1));

    let pb = ProgressBar::new(total_ticks);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ticks ({eta} remaining)")?
            .progress_chars("=>-"),
    );

    let mut counts = OnsetCounts::default();
    let mut written = 0usize;
    let mut consumed = 0usize;

    for tick in 0..total_ticks {
        let end = (((tick + 1) * sample_rate) / cli.fps as u64) as usize;
        let end = end.min(audio.samples.len());
        if let Some(source) = analyzer.source_mut() {
            source.push_samples(&audio.samples[consumed..end]);
        }
        consumed = end;

        analyzer.update_at(audio.time_ms(end));
        let frame = analyzer.frame();
        counts.record(&frame);

        if !cli.onsets_only || frame.has_onset() {
            serde_json::to_writer(&mut out, &frame).context("Failed to serialize frame")?;
            writeln!(out)?;
            written += 1;
        }
        pb.set_position(tick + 1);
    }

    pb.finish_with_message("Analysis complete");
    out.flush().context("Failed to flush output")?;

    log::info!(
        "Done: {} frames written, {} kicks, {} snares, {} hi-hats over {:.1}s",
        written,
        counts.kick,
        counts.snare,
        counts.hihat,
        audio.duration_secs()
    );
    Ok(())
}
