// Frame-based subtitle parser: MicroDVD {start}{end}text and MPL2 [start][end]text
use super::detect::{detect_format, normalize_line, FrameLine, SubtitleFormat};
use super::enhanced_subrip::EnhancedSubripParser;
use super::tags::extract_text;
use super::{
    decode_range, lines, Cue, CueReplacementBehavior, CuesWithTiming, Format, OutputWindow,
    SubtitleParser, WindowedOutput, NTSC_FILM_FRAME_RATE,
};
use crate::error::Result;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// MPL2 times are in tenths of a second.
const MPL2_FRAME_RATE: f64 = 10.0;

static FRAME_RATE_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("Invalid regex"));

/// Parser used when the buffer is not MicroDVD or MPL2.
#[derive(Debug)]
pub enum FallbackParser {
    Subrip(EnhancedSubripParser),
    Baseline(Box<dyn SubtitleParser + Send>),
    /// No parser for this type; the content is ignored.
    Discard,
}

impl FallbackParser {
    fn parse_range(
        &mut self,
        data: &[u8],
        offset: usize,
        length: usize,
        window: OutputWindow,
        output: &mut dyn FnMut(CuesWithTiming),
    ) -> Result<()> {
        match self {
            FallbackParser::Subrip(parser) => parser.parse_range(data, offset, length, window, output),
            FallbackParser::Baseline(parser) => {
                parser.parse_range(data, offset, length, window, output)
            }
            FallbackParser::Discard => {
                debug!("No fallback parser, ignoring {} bytes", length);
                Ok(())
            }
        }
    }

    fn reset(&mut self) {
        match self {
            FallbackParser::Subrip(parser) => parser.reset(),
            FallbackParser::Baseline(parser) => parser.reset(),
            FallbackParser::Discard => {}
        }
    }

    fn cue_replacement_behavior(&self) -> CueReplacementBehavior {
        match self {
            FallbackParser::Subrip(parser) => parser.cue_replacement_behavior(),
            FallbackParser::Baseline(parser) => parser.cue_replacement_behavior(),
            FallbackParser::Discard => CueReplacementBehavior::Merge,
        }
    }
}

/// Frame rate and format state for one parse session.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRateState {
    /// Set by an in-band `{1}{1}25` style header.
    pub header_frame_rate: Option<f64>,
    pub fallback_frame_rate: f64,
    /// Set once, from the first non-blank line.
    pub detected_format: Option<SubtitleFormat>,
}

impl FrameRateState {
    /// Fallback priority: caller override, then the track's frame rate, then 23.976.
    pub fn new(format_frame_rate: Option<f64>, override_frame_rate: f64) -> Self {
        let fallback_frame_rate = if override_frame_rate > 0.0 {
            override_frame_rate
        } else {
            format_frame_rate
                .filter(|rate| *rate > 0.0)
                .unwrap_or(NTSC_FILM_FRAME_RATE)
        };
        Self {
            header_frame_rate: None,
            fallback_frame_rate,
            detected_format: None,
        }
    }

    pub fn effective_frame_rate(&self) -> f64 {
        if let Some(rate) = self.header_frame_rate {
            rate
        } else if self.detected_format == Some(SubtitleFormat::Mpl2) {
            MPL2_FRAME_RATE
        } else {
            self.fallback_frame_rate
        }
    }

    pub fn frame_to_time_us(&self, frame: i64) -> i64 {
        let frame = frame.max(0);
        let rate = self.effective_frame_rate();
        if rate == NTSC_FILM_FRAME_RATE {
            let us = i128::from(frame) * 1_000_000 * 1001 / 24_000;
            i64::try_from(us).unwrap_or(i64::MAX)
        } else {
            (frame as f64 * 1_000_000.0 / rate).round() as i64
        }
    }

    fn apply_header(&mut self, text: &str) {
        let text = text.trim();
        if text.starts_with("23.97") {
            self.header_frame_rate = Some(NTSC_FILM_FRAME_RATE);
        } else {
            match text.parse::<f64>() {
                Ok(rate) if rate > 0.0 => self.header_frame_rate = Some(rate),
                _ => warn!("Ignoring frame rate header: {}", text),
            }
        }
        debug!("Frame rate header: {:?}", self.header_frame_rate);
    }

    fn reset(&mut self) {
        self.header_frame_rate = None;
        self.detected_format = None;
    }
}

/// Parser for MicroDVD and MPL2 that hands any other content to a fallback.
#[derive(Debug)]
pub struct MicroDvdParser {
    state: FrameRateState,
    fallback: FallbackParser,
    cue_replacement_behavior: CueReplacementBehavior,
}

impl MicroDvdParser {
    /// `fallback_frame_rate <= 0` means use the track's frame rate.
    pub fn new(format: &Format, fallback: FallbackParser, fallback_frame_rate: f64) -> Self {
        let cue_replacement_behavior = fallback.cue_replacement_behavior();
        Self {
            state: FrameRateState::new(format.frame_rate, fallback_frame_rate),
            fallback,
            cue_replacement_behavior,
        }
    }

    pub fn state(&self) -> &FrameRateState {
        &self.state
    }

    pub fn detected_format(&self) -> Option<SubtitleFormat> {
        self.state.detected_format
    }

    fn parse_frame_lines(
        &mut self,
        text: &str,
        window: OutputWindow,
        output: &mut dyn FnMut(CuesWithTiming),
    ) {
        let mut out = WindowedOutput::new(window, output);
        for line in lines(text) {
            let line = normalize_line(line);
            if line.is_empty() {
                continue;
            }
            if let Some(cues) = self.parse_cue_line(line) {
                out.accept(cues);
            }
        }
        out.finish();
    }

    fn parse_cue_line(&mut self, line: &str) -> Option<CuesWithTiming> {
        let Some(frame_line) = FrameLine::parse(line) else {
            debug!("Skipping malformed line: {}", line);
            return None;
        };

        if is_frame_rate_header(&frame_line) {
            self.state.apply_header(frame_line.text);
            return None;
        }

        let start_us = self.state.frame_to_time_us(frame_line.start_frame);
        let end_us = self.state.frame_to_time_us(frame_line.end_frame).max(start_us);

        let cue = Cue::new(extract_text(frame_line.text));
        Some(CuesWithTiming::new(
            vec![cue],
            Some(start_us),
            Some((end_us - start_us) as u64),
        ))
    }
}

fn is_frame_rate_header(line: &FrameLine<'_>) -> bool {
    if line.start_frame != line.end_frame || line.start_frame > 1 {
        return false;
    }
    let text = line.text.trim();
    !text.is_empty() && FRAME_RATE_TEXT.is_match(text)
}

impl SubtitleParser for MicroDvdParser {
    fn parse_range(
        &mut self,
        data: &[u8],
        offset: usize,
        length: usize,
        window: OutputWindow,
        output: &mut dyn FnMut(CuesWithTiming),
    ) -> Result<()> {
        if self.state.detected_format.is_none() && length > 0 {
            let text = decode_range(data, offset, length)?;
            let format = detect_format(&text);
            debug!("Detected subtitle format: {}", format);
            self.state.detected_format = Some(format);
            if format.is_frame_based() {
                self.parse_frame_lines(&text, window, output);
                return Ok(());
            }
        } else if self.state.detected_format.is_some_and(SubtitleFormat::is_frame_based) {
            let text = decode_range(data, offset, length)?;
            self.parse_frame_lines(&text, window, output);
            return Ok(());
        }

        self.fallback.parse_range(data, offset, length, window, output)
    }

    fn reset(&mut self) {
        self.state.reset();
        self.fallback.reset();
    }

    fn cue_replacement_behavior(&self) -> CueReplacementBehavior {
        self.cue_replacement_behavior
    }
}
