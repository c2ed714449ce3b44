use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use subcue::config::{Config, OutputFormat};
use subcue::pipeline::{process_file, PipelineConfig};
use subcue::print_summary;
use subcue::subtitle::format_delay;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "subcue")]
#[command(version, about = "Subtitle cue conversion and timing")]
#[command(long_about = "Parse MicroDVD, MPL2 and SubRip subtitles, apply a delay and write SRT or JSON.")]
struct Cli {
    /// Input subtitle file
    input: PathBuf,

    /// Output subtitle file (defaults to input name with appropriate extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format: srt, json (defaults to the configured format)
    #[arg(short, long)]
    format: Option<String>,

    /// Input MIME type (e.g., text/x-microdvd); guessed from the extension otherwise
    #[arg(short, long)]
    mime: Option<String>,

    /// Subtitle delay in milliseconds, negative to show subtitles earlier
    #[arg(long, allow_hyphen_values = true)]
    delay_ms: Option<i32>,

    /// Frame rate for MicroDVD files without a frame rate header
    #[arg(long)]
    frame_rate: Option<f64>,

    /// Skip cues that finished before this time (milliseconds)
    #[arg(long)]
    start_ms: Option<i64>,

    /// With --start-ms, append the skipped cues after the others
    #[arg(long, requires = "start_ms")]
    backfill: bool,

    /// Apply typeface and edge preferences from the config
    #[arg(long)]
    render: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// `-v` forces debug output; otherwise `RUST_LOG` applies, falling back to info.
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn init_logging(verbose: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    FmtSubscriber::builder()
        .with_env_filter(log_filter(verbose, rust_log.as_deref()))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn derive_output_path(input: &Path, format: &OutputFormat) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    let mut output = input.to_path_buf();
    output.set_file_name(format!("{}.{}", stem.to_string_lossy(), format.extension()));
    output
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Validate input file exists
    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }

    // Load and validate configuration
    let config = Config::load().context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;

    // Parse format
    let format: OutputFormat = match cli.format {
        Some(ref format) => format.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        None => config.default_format,
    };

    if let Some(rate) = cli.frame_rate {
        if !rate.is_finite() || rate <= 0.0 {
            anyhow::bail!("Frame rate must be a positive number, got {}", rate);
        }
    }

    // Derive output path if not specified
    let output = cli
        .output
        .unwrap_or_else(|| derive_output_path(&cli.input, &format));
    if output == cli.input {
        anyhow::bail!("Output path would overwrite the input: {}", output.display());
    }

    info!("Input:    {}", cli.input.display());
    info!("Output:   {}", output.display());
    info!("Format:   {}", format);
    info!(
        "Delay:    {}",
        format_delay(cli.delay_ms.unwrap_or(config.subtitle_delay_ms))
    );

    let pipeline_config = PipelineConfig {
        format,
        mime_type: cli.mime,
        delay_ms: cli.delay_ms,
        frame_rate: cli.frame_rate,
        start_time_us: cli.start_ms.map(|ms| ms.saturating_mul(1000)),
        backfill: cli.backfill,
        render: cli.render,
    };

    let result = process_file(&cli.input, &output, &config, pipeline_config)
        .with_context(|| format!("Failed to convert {}", cli.input.display()))?;

    print_summary(&result);

    Ok(())
}
