use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use keyword_study::analysis::{FeatureExtractor, NoiseLevelMeter};
use keyword_study::audio::{convert_to_canonical_wav, AudioLoader};
use keyword_study::error::ErrorCode;
use keyword_study::fixtures::{SyntheticPattern, SyntheticSpec};
use keyword_study::session::evaluate_session;
use keyword_study::{DetectionResult, KeywordPipeline, PipelineConfig};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "kws_cli",
    about = "Keyword detection and noise measurement for study recordings"
)]
struct Cli {
    /// JSON pipeline configuration (defaults are used when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log at DEBUG level
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run keyword detection on one or more recordings
    Detect {
        /// Override the configured model artifact
        #[arg(long)]
        model: Option<PathBuf>,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Measure background noise level in dBFS
    Noise { file: PathBuf },
    /// Print feature map shape and value summary
    Features { file: PathBuf },
    /// Evaluate every recording of a session directory
    Evaluate {
        #[arg(long)]
        model: Option<PathBuf>,
        dir: PathBuf,
    },
    /// Convert any recording to 16 kHz mono 16-bit WAV
    Convert { input: PathBuf, output: PathBuf },
    /// Write a synthetic fixture WAV
    Synth {
        #[arg(long, value_enum)]
        pattern: SyntheticPattern,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 1_000)]
        duration_ms: u32,
        #[arg(long, default_value_t = 440.0)]
        frequency_hz: f32,
        #[arg(long, default_value_t = 0.8)]
        amplitude: f32,
        #[arg(long, default_value_t = 0)]
        burst_offset_ms: u32,
        #[arg(long, default_value_t = 300)]
        burst_duration_ms: u32,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli
        .config
        .as_ref()
        .map(PipelineConfig::load_from_file)
        .unwrap_or_default();

    match cli.command {
        Commands::Detect { model, files } => run_detect(config, model, &files),
        Commands::Noise { file } => run_noise(&config, &file),
        Commands::Features { file } => run_features(&config, &file),
        Commands::Evaluate { model, dir } => run_evaluate(config, model, &dir),
        Commands::Convert { input, output } => run_convert(&config, &input, &output),
        Commands::Synth {
            pattern,
            out,
            duration_ms,
            frequency_hz,
            amplitude,
            burst_offset_ms,
            burst_duration_ms,
        } => {
            let spec = SyntheticSpec {
                pattern,
                frequency_hz,
                amplitude,
                duration_ms,
                burst_offset_ms,
                burst_duration_ms,
                ..SyntheticSpec::default()
            };
            run_synth(&config, &spec, &out)
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn build_pipeline(mut config: PipelineConfig, model: Option<PathBuf>) -> Result<KeywordPipeline> {
    if let Some(model) = model {
        config.inference.model_path = model;
    }
    KeywordPipeline::from_config(config).context("initializing keyword pipeline")
}

fn read_recording(path: &Path) -> Result<(Vec<u8>, Option<String>)> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let hint = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    Ok((bytes, hint))
}

fn run_detect(config: PipelineConfig, model: Option<PathBuf>, files: &[PathBuf]) -> Result<ExitCode> {
    let pipeline = build_pipeline(config, model)?;
    let mut failures = 0usize;

    for path in files {
        let (bytes, hint) = read_recording(path)?;
        let report = match pipeline.extract_and_detect(&bytes, hint.as_deref()) {
            Ok(result) => DetectReport::ok(path, result),
            Err(err) => {
                failures += 1;
                DetectReport::failed(path, err.code(), err.message())
            }
        };
        println!("{}", serde_json::to_string(&report)?);
    }

    Ok(if failures == 0 {
        ExitCode::from(0)
    } else {
        ExitCode::from(2)
    })
}

fn run_noise(config: &PipelineConfig, path: &Path) -> Result<ExitCode> {
    let (bytes, hint) = read_recording(path)?;
    let buffer = AudioLoader::new(config.audio.sample_rate)
        .decode(&bytes, hint.as_deref())
        .with_context(|| format!("decoding {}", path.display()))?;
    let meter = NoiseLevelMeter::new(config.noise.full_scale, config.noise.floor_dbfs);

    let report = NoiseReport {
        file: path.display().to_string(),
        noise_level_dbfs: meter.measure(&buffer.samples),
    };
    println!("{}", serde_json::to_string(&report)?);
    Ok(ExitCode::from(0))
}

fn run_features(config: &PipelineConfig, path: &Path) -> Result<ExitCode> {
    let (bytes, hint) = read_recording(path)?;
    let buffer = AudioLoader::new(config.audio.sample_rate)
        .load(&bytes, hint.as_deref())
        .with_context(|| format!("decoding {}", path.display()))?;
    let extractor = FeatureExtractor::new(config)?;
    let extracted = extractor
        .extract(&buffer.samples)
        .with_context(|| format!("extracting features from {}", path.display()))?;

    let features = &extracted.features;
    let min = features.iter().copied().fold(f32::INFINITY, f32::min);
    let max = features.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let report = FeatureReport {
        file: path.display().to_string(),
        window_offset: extracted.selection.offset,
        shape: features.shape().to_vec(),
        min,
        max,
        mean: features.mean().unwrap_or(0.0),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::from(0))
}

fn run_evaluate(config: PipelineConfig, model: Option<PathBuf>, dir: &Path) -> Result<ExitCode> {
    let pipeline = build_pipeline(config, model)?;
    let report = evaluate_session(&pipeline, dir)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::from(0))
}

fn run_convert(config: &PipelineConfig, input: &Path, output: &Path) -> Result<ExitCode> {
    let (bytes, hint) = read_recording(input)?;
    let wav = convert_to_canonical_wav(&bytes, hint.as_deref(), config.audio.sample_rate)
        .with_context(|| format!("converting {}", input.display()))?;
    fs::write(output, wav).with_context(|| format!("writing {}", output.display()))?;
    Ok(ExitCode::from(0))
}

fn run_synth(config: &PipelineConfig, spec: &SyntheticSpec, out: &Path) -> Result<ExitCode> {
    let wav = spec.to_wav(config.audio.sample_rate)?;
    fs::write(out, wav).with_context(|| format!("writing {}", out.display()))?;
    Ok(ExitCode::from(0))
}

#[derive(Serialize)]
struct DetectReport {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    probability: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl DetectReport {
    fn ok(path: &Path, result: DetectionResult) -> Self {
        Self {
            file: path.display().to_string(),
            probability: Some(result.probability),
            detected: Some(result.detected),
            error_code: None,
            error: None,
        }
    }

    fn failed(path: &Path, code: i32, message: String) -> Self {
        Self {
            file: path.display().to_string(),
            probability: None,
            detected: None,
            error_code: Some(code),
            error: Some(message),
        }
    }
}

#[derive(Serialize)]
struct NoiseReport {
    file: String,
    noise_level_dbfs: f32,
}

#[derive(Serialize)]
struct FeatureReport {
    file: String,
    window_offset: usize,
    shape: Vec<usize>,
    min: f32,
    max: f32,
    mean: f32,
}
