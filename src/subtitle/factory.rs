// Parser selection by MIME type
use super::detect::SubtitleFormat;
use super::enhanced_subrip::EnhancedSubripParser;
use super::microdvd::{FallbackParser, MicroDvdParser};
use super::subrip::SubripParser;
use super::{
    CueReplacementBehavior, CuesWithTiming, Format, OutputWindow, SubtitleParser, MIME_MICRODVD,
    MIME_MPL2, MIME_SUBRIP, MIME_TEXT_PLAIN,
};
use crate::error::{Result, SubcueError};
use std::collections::HashMap;
use tracing::debug;

pub type BoxedParser = Box<dyn SubtitleParser + Send>;

/// Creates parsers for the formats it supports.
pub trait ParserFactory {
    type Parser: SubtitleParser;

    fn supports_format(&self, format: &Format) -> bool;

    fn cue_replacement_behavior(&self, format: &Format) -> Result<CueReplacementBehavior>;

    fn create(&self, format: &Format) -> Result<Self::Parser>;
}

struct BaselineEntry {
    constructor: fn() -> BoxedParser,
    behavior: CueReplacementBehavior,
}

/// Registry of baseline parsers, keyed by MIME type.
///
/// Ships with SubRip; hosts register their own parsers for other formats.
pub struct DefaultParserFactory {
    parsers: HashMap<String, BaselineEntry>,
}

impl Default for DefaultParserFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultParserFactory {
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
        }
        .with_parser(MIME_SUBRIP, subrip_parser, CueReplacementBehavior::Merge)
    }

    pub fn with_parser(
        mut self,
        mime_type: &str,
        constructor: fn() -> BoxedParser,
        behavior: CueReplacementBehavior,
    ) -> Self {
        self.parsers.insert(
            mime_type.to_string(),
            BaselineEntry {
                constructor,
                behavior,
            },
        );
        self
    }

    fn entry(&self, format: &Format) -> Result<&BaselineEntry> {
        format
            .mime_type()
            .and_then(|mime| self.parsers.get(mime))
            .ok_or_else(|| unsupported(format))
    }
}

impl ParserFactory for DefaultParserFactory {
    type Parser = BoxedParser;

    fn supports_format(&self, format: &Format) -> bool {
        self.entry(format).is_ok()
    }

    fn cue_replacement_behavior(&self, format: &Format) -> Result<CueReplacementBehavior> {
        Ok(self.entry(format)?.behavior)
    }

    fn create(&self, format: &Format) -> Result<BoxedParser> {
        Ok((self.entry(format)?.constructor)())
    }
}

fn subrip_parser() -> BoxedParser {
    Box::new(SubripParser::new())
}

fn unsupported(format: &Format) -> SubcueError {
    SubcueError::UnsupportedFormat(format.mime_type().unwrap_or("<none>").to_string())
}

/// MIME types whose content may be MicroDVD or MPL2.
fn is_frame_based_mime(mime_type: &str) -> bool {
    matches!(mime_type, MIME_MICRODVD | MIME_MPL2 | MIME_TEXT_PLAIN)
}

/// The parser chosen for one track.
#[derive(Debug)]
pub enum EnhancedParser {
    MicroDvd(MicroDvdParser),
    Subrip(EnhancedSubripParser),
    Baseline(BoxedParser),
}

impl EnhancedParser {
    /// Format sniffed from the content, for frame-based parsers that have seen data.
    pub fn detected_format(&self) -> Option<SubtitleFormat> {
        match self {
            EnhancedParser::MicroDvd(parser) => parser.detected_format(),
            EnhancedParser::Subrip(_) | EnhancedParser::Baseline(_) => None,
        }
    }
}

impl SubtitleParser for EnhancedParser {
    fn parse_range(
        &mut self,
        data: &[u8],
        offset: usize,
        length: usize,
        window: OutputWindow,
        output: &mut dyn FnMut(CuesWithTiming),
    ) -> Result<()> {
        match self {
            EnhancedParser::MicroDvd(parser) => {
                parser.parse_range(data, offset, length, window, output)
            }
            EnhancedParser::Subrip(parser) => parser.parse_range(data, offset, length, window, output),
            EnhancedParser::Baseline(parser) => {
                parser.parse_range(data, offset, length, window, output)
            }
        }
    }

    fn reset(&mut self) {
        match self {
            EnhancedParser::MicroDvd(parser) => parser.reset(),
            EnhancedParser::Subrip(parser) => parser.reset(),
            EnhancedParser::Baseline(parser) => parser.reset(),
        }
    }

    fn cue_replacement_behavior(&self) -> CueReplacementBehavior {
        match self {
            EnhancedParser::MicroDvd(parser) => parser.cue_replacement_behavior(),
            EnhancedParser::Subrip(parser) => parser.cue_replacement_behavior(),
            EnhancedParser::Baseline(parser) => parser.cue_replacement_behavior(),
        }
    }
}

/// Adds MicroDVD/MPL2 support and SubRip slash italics on top of a baseline factory.
pub struct EnhancedParserFactory {
    baseline: DefaultParserFactory,
    /// `<= 0` means use the track's frame rate.
    fallback_frame_rate: f64,
    /// Sniff SubRip tracks for MicroDVD/MPL2 content.
    frame_detection: bool,
}

impl Default for EnhancedParserFactory {
    fn default() -> Self {
        Self::new(DefaultParserFactory::new(), 0.0)
    }
}

impl EnhancedParserFactory {
    pub fn new(baseline: DefaultParserFactory, fallback_frame_rate: f64) -> Self {
        Self {
            baseline,
            fallback_frame_rate,
            frame_detection: true,
        }
    }

    pub fn with_frame_detection(mut self, enabled: bool) -> Self {
        self.frame_detection = enabled;
        self
    }
}

impl ParserFactory for EnhancedParserFactory {
    type Parser = EnhancedParser;

    fn supports_format(&self, format: &Format) -> bool {
        self.baseline.supports_format(format) || format.mime_type().is_some_and(is_frame_based_mime)
    }

    fn cue_replacement_behavior(&self, format: &Format) -> Result<CueReplacementBehavior> {
        match format.mime_type() {
            Some(mime) if is_frame_based_mime(mime) && !self.baseline.supports_format(format) => {
                Ok(CueReplacementBehavior::Merge)
            }
            _ => self.baseline.cue_replacement_behavior(format),
        }
    }

    fn create(&self, format: &Format) -> Result<EnhancedParser> {
        let mime = format.mime_type().unwrap_or_default();

        let parser = if mime == MIME_SUBRIP && !self.frame_detection {
            EnhancedParser::Subrip(EnhancedSubripParser::new())
        } else if mime == MIME_SUBRIP {
            let fallback = FallbackParser::Subrip(EnhancedSubripParser::new());
            EnhancedParser::MicroDvd(MicroDvdParser::new(format, fallback, self.fallback_frame_rate))
        } else if is_frame_based_mime(mime) {
            let fallback = if self.baseline.supports_format(format) {
                FallbackParser::Baseline(self.baseline.create(format)?)
            } else {
                FallbackParser::Discard
            };
            EnhancedParser::MicroDvd(MicroDvdParser::new(format, fallback, self.fallback_frame_rate))
        } else {
            EnhancedParser::Baseline(self.baseline.create(format)?)
        };

        debug!("Created parser for {}: {:?}", mime, parser);
        Ok(parser)
    }
}
