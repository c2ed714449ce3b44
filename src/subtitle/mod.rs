pub mod color;
pub mod detect;
pub mod enhanced_subrip;
pub mod factory;
pub mod json;
pub mod microdvd;
pub mod modifier;
pub mod offset;
pub mod srt;
pub mod subrip;
pub mod tags;
pub mod text_run;

pub use color::{Color, ColorParseError};
pub use detect::{detect_format, SubtitleFormat};
pub use enhanced_subrip::EnhancedSubripParser;
pub use factory::{DefaultParserFactory, EnhancedParser, EnhancedParserFactory, ParserFactory};
pub use json::JsonFormatter;
pub use microdvd::{FallbackParser, MicroDvdParser};
pub use modifier::{CueModifier, DisplayMetrics, SubtitleEdgeType, SubtitleTypeface};
pub use offset::{format_delay, OffsetParser, OffsetParserFactory};
pub use srt::{render_markup, SrtFormatter};
pub use subrip::SubripParser;
pub use text_run::{Shadow, Span, Style, TextRun, TypefaceRef};

use crate::config::OutputFormat;
use crate::error::{Result, SubcueError};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::debug;

pub const MIME_SUBRIP: &str = "application/x-subrip";
pub const MIME_MICRODVD: &str = "text/x-microdvd";
pub const MIME_MPL2: &str = "text/x-mpl2";
pub const MIME_TEXT_PLAIN: &str = "text/plain";

/// 23.976 fps, the NTSC film rate.
pub const NTSC_FILM_FRAME_RATE: f64 = 24000.0 / 1001.0;

/// One caption unit ready for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub text: TextRun,
}

impl Cue {
    pub fn new(text: impl Into<TextRun>) -> Self {
        Self { text: text.into() }
    }
}

/// Cues shown together over one time interval.
///
/// `None` timing means unset: no start time, or shown until replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuesWithTiming {
    pub cues: Vec<Cue>,
    pub start_time_us: Option<i64>,
    pub duration_us: Option<u64>,
}

impl CuesWithTiming {
    pub fn new(cues: Vec<Cue>, start_time_us: Option<i64>, duration_us: Option<u64>) -> Self {
        Self {
            cues,
            start_time_us,
            duration_us,
        }
    }

    pub fn end_time_us(&self) -> Option<i64> {
        match (self.start_time_us, self.duration_us) {
            (Some(start), Some(duration)) => Some(start.saturating_add_unsigned(duration)),
            _ => None,
        }
    }
}

/// Which cues a parser emits, relative to a requested start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputWindow {
    pub start_time_us: Option<i64>,
    /// Also emit cues ending before `start_time_us`, after all the others.
    pub output_all_cues: bool,
}

impl OutputWindow {
    pub fn all_cues() -> Self {
        Self {
            start_time_us: None,
            output_all_cues: true,
        }
    }

    pub fn only_cues_after(start_time_us: i64) -> Self {
        Self {
            start_time_us: Some(start_time_us),
            output_all_cues: false,
        }
    }

    pub fn cues_after_then_remaining_cues_before(start_time_us: i64) -> Self {
        Self {
            start_time_us: Some(start_time_us),
            output_all_cues: true,
        }
    }

    /// Whether a cue ending at `end_time_us` belongs to the main output.
    pub fn includes(&self, end_time_us: i64) -> bool {
        self.start_time_us.map_or(true, |start| end_time_us >= start)
    }

    fn backfills(&self) -> bool {
        self.start_time_us.is_some() && self.output_all_cues
    }
}

/// Routes timed cues through an [`OutputWindow`], holding back early cues
/// until [`WindowedOutput::finish`].
pub(crate) struct WindowedOutput<'a> {
    window: OutputWindow,
    output: &'a mut dyn FnMut(CuesWithTiming),
    backfill: Option<Vec<CuesWithTiming>>,
    dropped: usize,
}

impl<'a> WindowedOutput<'a> {
    pub(crate) fn new(window: OutputWindow, output: &'a mut dyn FnMut(CuesWithTiming)) -> Self {
        let backfill = window.backfills().then(Vec::new);
        Self {
            window,
            output,
            backfill,
            dropped: 0,
        }
    }

    pub(crate) fn accept(&mut self, cues: CuesWithTiming) {
        let end = cues.end_time_us().or(cues.start_time_us).unwrap_or(i64::MAX);
        if self.window.includes(end) {
            (self.output)(cues);
        } else if let Some(backfill) = self.backfill.as_mut() {
            backfill.push(cues);
        } else {
            self.dropped += 1;
        }
    }

    pub(crate) fn finish(self) {
        if let Some(backfill) = self.backfill {
            if !backfill.is_empty() {
                debug!("Emitting {} backfilled cues", backfill.len());
            }
            for cues in backfill {
                (self.output)(cues);
            }
        }
        if self.dropped > 0 {
            debug!("Dropped {} cues before requested start time", self.dropped);
        }
    }
}

/// How a new batch of cues relates to the ones already shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CueReplacementBehavior {
    /// Overlapping cues are shown together.
    #[default]
    Merge,
    /// Each batch replaces everything shown before it.
    Replace,
}

/// Metadata describing the subtitle track being parsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Format {
    pub sample_mime_type: Option<String>,
    /// Video frame rate, if known.
    pub frame_rate: Option<f64>,
}

impl Format {
    pub fn new(mime_type: &str) -> Self {
        Self {
            sample_mime_type: Some(mime_type.to_string()),
            frame_rate: None,
        }
    }

    pub fn with_frame_rate(mut self, frame_rate: f64) -> Self {
        self.frame_rate = Some(frame_rate);
        self
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.sample_mime_type.as_deref()
    }
}

/// Result of a transformation that may leave its input untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Modified<T> {
    Unchanged,
    Replaced(T),
}

impl<T> Modified<T> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Modified::Unchanged)
    }

    /// Resolve against the original value.
    pub fn unwrap_or(self, original: T) -> T {
        match self {
            Modified::Unchanged => original,
            Modified::Replaced(value) => value,
        }
    }
}

/// A parser turning a subtitle sample into timed cues.
///
/// Instances hold per-session state and are not shared between threads
/// while parsing.
pub trait SubtitleParser {
    fn parse(
        &mut self,
        data: &[u8],
        window: OutputWindow,
        output: &mut dyn FnMut(CuesWithTiming),
    ) -> Result<()> {
        self.parse_range(data, 0, data.len(), window, output)
    }

    fn parse_range(
        &mut self,
        data: &[u8],
        offset: usize,
        length: usize,
        window: OutputWindow,
        output: &mut dyn FnMut(CuesWithTiming),
    ) -> Result<()>;

    fn reset(&mut self);

    fn cue_replacement_behavior(&self) -> CueReplacementBehavior;
}

impl std::fmt::Debug for dyn SubtitleParser + Send {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SubtitleParser({:?})", self.cue_replacement_behavior())
    }
}

impl<P: SubtitleParser + ?Sized> SubtitleParser for Box<P> {
    fn parse(
        &mut self,
        data: &[u8],
        window: OutputWindow,
        output: &mut dyn FnMut(CuesWithTiming),
    ) -> Result<()> {
        (**self).parse(data, window, output)
    }

    fn parse_range(
        &mut self,
        data: &[u8],
        offset: usize,
        length: usize,
        window: OutputWindow,
        output: &mut dyn FnMut(CuesWithTiming),
    ) -> Result<()> {
        (**self).parse_range(data, offset, length, window, output)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn cue_replacement_behavior(&self) -> CueReplacementBehavior {
        (**self).cue_replacement_behavior()
    }
}

/// Collect every emitted batch into a `Vec`.
pub fn parse_to_vec<P: SubtitleParser + ?Sized>(
    parser: &mut P,
    data: &[u8],
    window: OutputWindow,
) -> Result<Vec<CuesWithTiming>> {
    let mut collected = Vec::new();
    parser.parse(data, window, &mut |cues| collected.push(cues))?;
    Ok(collected)
}

/// Slice and decode `data[offset..offset + length]` as UTF-8.
pub(crate) fn decode_range(data: &[u8], offset: usize, length: usize) -> Result<Cow<'_, str>> {
    let end = offset
        .checked_add(length)
        .filter(|end| *end <= data.len())
        .ok_or(SubcueError::InvalidRange {
            offset,
            length,
            size: data.len(),
        })?;

    let text = String::from_utf8_lossy(&data[offset..end]);
    if let Cow::Owned(_) = text {
        debug!("Subtitle buffer contained invalid UTF-8, replaced malformed sequences");
    }
    Ok(text)
}

/// Lines of a buffer, split on `\n`, `\r\n` or `\r`.
pub(crate) fn lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = Some(text);
    std::iter::from_fn(move || {
        let current = rest?;
        match current.find(['\n', '\r']) {
            Some(pos) => {
                let skip = if current[pos..].starts_with("\r\n") { 2 } else { 1 };
                rest = Some(&current[pos + skip..]);
                Some(&current[..pos])
            }
            None => {
                rest = None;
                (!current.is_empty()).then_some(current)
            }
        }
    })
}

/// Display time given to a trailing cue that has no duration.
const DEFAULT_LAST_CUE_DURATION_US: i64 = 2_000_000;

/// Writes timed cues out as a subtitle file.
pub trait SubtitleFormatter {
    fn format(&self, cues: &[CuesWithTiming]) -> String;
    fn extension(&self) -> &'static str;
}

pub fn create_formatter(format: OutputFormat) -> Box<dyn SubtitleFormatter> {
    match format {
        OutputFormat::Srt => Box::new(srt::SrtFormatter),
        OutputFormat::Json => Box::new(json::JsonFormatter::default()),
    }
}

/// Start and end of each batch in microseconds.
///
/// Open-ended batches run until the next batch starts, the last one for
/// two seconds. Unset start times are treated as zero.
pub(crate) fn display_intervals(batches: &[CuesWithTiming]) -> Vec<(i64, i64)> {
    batches
        .iter()
        .enumerate()
        .map(|(i, batch)| {
            let start = batch.start_time_us.unwrap_or(0);
            let end = batch.end_time_us().unwrap_or_else(|| {
                batches[i + 1..]
                    .iter()
                    .filter_map(|next| next.start_time_us)
                    .find(|next_start| *next_start > start)
                    .unwrap_or(start.saturating_add(DEFAULT_LAST_CUE_DURATION_US))
            });
            (start, end.max(start))
        })
        .collect()
}

/// `HH:MM:SS<separator>mmm`; negative times clamp to zero.
pub(crate) fn format_timestamp(time_us: i64, separator: char) -> String {
    let total_ms = time_us.max(0) / 1000;
    let total_secs = total_ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = total_ms % 1000;
    format!(
        "{:02}:{:02}:{:02}{}{:03}",
        hours, minutes, seconds, separator, millis
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed(start: i64, duration: u64) -> CuesWithTiming {
        CuesWithTiming::new(vec![Cue::new("x")], Some(start), Some(duration))
    }

    #[test]
    fn test_end_time() {
        assert_eq!(timed(1_000, 500).end_time_us(), Some(1_500));
        let open = CuesWithTiming::new(vec![], Some(10), None);
        assert_eq!(open.end_time_us(), None);
    }

    #[test]
    fn test_window_includes() {
        assert!(OutputWindow::all_cues().includes(0));
        let window = OutputWindow::only_cues_after(3_000_000);
        assert!(window.includes(3_000_000));
        assert!(!window.includes(2_999_999));
    }

    #[test]
    fn test_windowed_output_backfills_in_order() {
        let mut seen = Vec::new();
        {
            let mut sink = |cues: CuesWithTiming| seen.push(cues.end_time_us().unwrap());
            let mut out = WindowedOutput::new(
                OutputWindow::cues_after_then_remaining_cues_before(3_000_000),
                &mut sink,
            );
            for end in 1..=5 {
                out.accept(timed(0, end * 1_000_000));
            }
            out.finish();
        }
        assert_eq!(
            seen,
            vec![3_000_000, 4_000_000, 5_000_000, 1_000_000, 2_000_000]
        );
    }

    #[test]
    fn test_windowed_output_drops_without_backfill() {
        let mut seen = Vec::new();
        {
            let mut sink = |cues: CuesWithTiming| seen.push(cues.end_time_us().unwrap());
            let mut out = WindowedOutput::new(OutputWindow::only_cues_after(3_000_000), &mut sink);
            for end in 1..=5 {
                out.accept(timed(0, end * 1_000_000));
            }
            out.finish();
        }
        assert_eq!(seen, vec![3_000_000, 4_000_000, 5_000_000]);
    }

    #[test]
    fn test_decode_range() {
        let data = b"abcdef";
        assert_eq!(decode_range(data, 2, 3).unwrap(), "cde");
        assert!(matches!(
            decode_range(data, 4, 5),
            Err(SubcueError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_lines_handles_all_breaks() {
        let collected: Vec<&str> = lines("a\nb\r\nc\rd").collect();
        assert_eq!(collected, vec!["a", "b", "c", "d"]);
        let trailing: Vec<&str> = lines("a\n\nb\n").collect();
        assert_eq!(trailing, vec!["a", "", "b"]);
    }

    #[test]
    fn test_modified_unwrap_or() {
        assert_eq!(Modified::Unchanged.unwrap_or(1), 1);
        assert_eq!(Modified::Replaced(2).unwrap_or(1), 2);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(1_500_000, ','), "00:00:01,500");
        assert_eq!(format_timestamp(3_661_123_000, '.'), "01:01:01.123");
        assert_eq!(format_timestamp(-5, ','), "00:00:00,000");
    }

    #[test]
    fn test_display_intervals_close_open_ended_cues() {
        let batches = vec![
            CuesWithTiming::new(vec![Cue::new("a")], Some(1_000_000), None),
            timed(3_000_000, 500_000),
            CuesWithTiming::new(vec![Cue::new("c")], Some(5_000_000), None),
        ];
        assert_eq!(
            display_intervals(&batches),
            vec![
                (1_000_000, 3_000_000),
                (3_000_000, 3_500_000),
                (5_000_000, 7_000_000),
            ]
        );
    }
}
