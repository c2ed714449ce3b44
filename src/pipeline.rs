use crate::config::{Config, OutputFormat};
use crate::error::{Result, SubcueError};
use crate::subtitle::{
    create_formatter, format_delay, CueModifier, CuesWithTiming, DefaultParserFactory,
    DisplayMetrics, EnhancedParserFactory, Format, JsonFormatter, OffsetParserFactory,
    OutputWindow, ParserFactory, SubtitleFormat, SubtitleFormatter, SubtitleParser, MIME_MICRODVD,
    MIME_SUBRIP, MIME_TEXT_PLAIN,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Configuration for one conversion run.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Output subtitle format.
    pub format: OutputFormat,
    /// MIME type of the input; guessed from the file extension when unset.
    pub mime_type: Option<String>,
    /// Overrides the configured subtitle delay.
    pub delay_ms: Option<i32>,
    /// Overrides the configured fallback frame rate.
    pub frame_rate: Option<f64>,
    /// Only keep cues still showing at this time.
    pub start_time_us: Option<i64>,
    /// Append the cues ending before `start_time_us` after the others.
    pub backfill: bool,
    /// Apply typeface and edge preferences to the parsed cues.
    pub render: bool,
}

/// Statistics from one conversion.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Total time taken for the entire pipeline.
    pub total_time: Duration,
    /// Number of timed cue batches written.
    pub cue_count: usize,
    /// Batches that ended before the requested start time.
    pub backfilled_count: usize,
    /// Format sniffed from frame-based content.
    pub detected_format: Option<SubtitleFormat>,
    pub mime_type: String,
    /// Delay applied to every cue.
    pub delay_ms: i32,
}

#[derive(Debug)]
pub struct PipelineResult {
    /// Path to the output subtitle file.
    pub output_path: PathBuf,
    pub cues: Vec<CuesWithTiming>,
    pub stats: PipelineStats,
}

/// Guess a subtitle MIME type from a file extension.
pub fn mime_for_path(path: &Path) -> Result<&'static str> {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "srt" => Ok(MIME_SUBRIP),
        "sub" => Ok(MIME_MICRODVD),
        "txt" => Ok(MIME_TEXT_PLAIN),
        _ => Err(SubcueError::UnsupportedFormat(format!(
            "{} (pass a MIME type explicitly)",
            path.display()
        ))),
    }
}

fn output_window(pipeline_config: &PipelineConfig) -> OutputWindow {
    match pipeline_config.start_time_us {
        None => OutputWindow::all_cues(),
        Some(start) if pipeline_config.backfill => {
            OutputWindow::cues_after_then_remaining_cues_before(start)
        }
        Some(start) => OutputWindow::only_cues_after(start),
    }
}

/// Build a render-time modifier from the display preferences.
pub fn cue_modifier(config: &Config) -> Result<CueModifier> {
    let mut modifier = CueModifier::new(DisplayMetrics {
        density_dpi: config.density_dpi,
    });
    modifier.set_subtitle_typeface(config.typeface, None);
    modifier.set_edge_type(config.edge_type);
    modifier.set_shadow_color(config.shadow_color()?);
    Ok(modifier)
}

/// Parse a subtitle file and write it back out as SRT or JSON.
///
/// The input goes through the format dispatcher and the user delay, and
/// optionally through the render-time modifier.
pub fn process_file(
    input: &Path,
    output: &Path,
    config: &Config,
    pipeline_config: PipelineConfig,
) -> Result<PipelineResult> {
    let start_time = Instant::now();

    // Validate input file exists
    if !input.exists() {
        return Err(SubcueError::FileNotFound(input.display().to_string()));
    }

    let mime_type = match &pipeline_config.mime_type {
        Some(mime) => mime.clone(),
        None => mime_for_path(input)?.to_string(),
    };
    let delay_ms = pipeline_config.delay_ms.unwrap_or(config.subtitle_delay_ms);
    let frame_rate = pipeline_config.frame_rate.unwrap_or(config.fallback_frame_rate);

    // ═══════════════════════════════════════════════════════════════════════
    // Stage 1: Parsing
    // ═══════════════════════════════════════════════════════════════════════
    info!("Stage 1/2: Parsing {:?} as {}", input, mime_type);
    let data = fs::read(input)?;

    let factory = OffsetParserFactory::new(
        EnhancedParserFactory::new(DefaultParserFactory::new(), frame_rate),
        delay_ms,
    );
    let mut parser = factory.create(&Format::new(&mime_type))?;

    let window = output_window(&pipeline_config);
    let mut cues = Vec::new();
    let mut backfilled_count = 0;
    parser.parse(&data, window, &mut |batch| {
        if let (Some(start), Some(end)) = (window.start_time_us, batch.end_time_us()) {
            if end < start {
                backfilled_count += 1;
            }
        }
        cues.push(batch);
    })?;

    let detected_format = parser.inner().detected_format();
    info!(
        "Parsed {} cues ({} backfilled)",
        cues.len(),
        backfilled_count
    );
    if let Some(format) = detected_format {
        debug!("Content format: {}", format);
    }

    if pipeline_config.render {
        let modifier = cue_modifier(config)?;
        cues = cues
            .into_iter()
            .map(|batch| modifier.modify_batch(&batch).unwrap_or(batch))
            .collect();
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Stage 2: Writing
    // ═══════════════════════════════════════════════════════════════════════
    info!("Stage 2/2: Writing {} subtitles", pipeline_config.format);

    let content = match pipeline_config.format {
        OutputFormat::Json => JsonFormatter {
            source_file: Some(input.display().to_string()),
            mime_type: Some(mime_type.clone()),
        }
        .to_json(&cues)?,
        format => create_formatter(format).format(&cues),
    };
    fs::write(output, content)?;

    info!("Wrote {} entries to {:?}", cues.len(), output);

    let stats = PipelineStats {
        total_time: start_time.elapsed(),
        cue_count: cues.len(),
        backfilled_count,
        detected_format,
        mime_type,
        delay_ms,
    };

    Ok(PipelineResult {
        output_path: output.to_path_buf(),
        cues,
        stats,
    })
}

/// Log a summary of the pipeline results.
pub fn print_summary(result: &PipelineResult) {
    info!("Output:     {}", result.output_path.display());
    info!("Cues:       {}", result.stats.cue_count);
    if result.stats.backfilled_count > 0 {
        info!("Backfilled: {}", result.stats.backfilled_count);
    }
    info!("MIME type:  {}", result.stats.mime_type);
    if let Some(format) = result.stats.detected_format {
        info!("Detected:   {}", format);
    }
    info!("Delay:      {}", format_delay(result.stats.delay_ms));
    info!(
        "Total:      {:.2}s",
        result.stats.total_time.as_secs_f64()
    );
}
