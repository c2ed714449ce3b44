// User subtitle delay: shift every cue by a fixed offset
use super::factory::ParserFactory;
use super::{CueReplacementBehavior, CuesWithTiming, Format, OutputWindow, SubtitleParser};
use crate::error::Result;
use tracing::debug;

/// Wraps a factory so that every parser it creates applies `delay`.
pub struct OffsetParserFactory<F> {
    delegate: F,
    delay_us: i64,
}

impl<F: ParserFactory> OffsetParserFactory<F> {
    /// Positive delays show subtitles later, negative ones earlier.
    pub fn new(delegate: F, delay_ms: i32) -> Self {
        Self {
            delegate,
            delay_us: i64::from(delay_ms) * 1000,
        }
    }

    pub fn delay_us(&self) -> i64 {
        self.delay_us
    }
}

impl<F: ParserFactory> ParserFactory for OffsetParserFactory<F> {
    type Parser = OffsetParser<F::Parser>;

    fn supports_format(&self, format: &Format) -> bool {
        self.delegate.supports_format(format)
    }

    fn cue_replacement_behavior(&self, format: &Format) -> Result<CueReplacementBehavior> {
        self.delegate.cue_replacement_behavior(format)
    }

    fn create(&self, format: &Format) -> Result<Self::Parser> {
        let parser = self.delegate.create(format)?;
        if self.delay_us == 0 {
            return Ok(OffsetParser::Passthrough(parser));
        }
        debug!("Shifting subtitles by {}us", self.delay_us);
        Ok(OffsetParser::Shifted {
            delegate: parser,
            delay_us: self.delay_us,
        })
    }
}

#[derive(Debug)]
pub enum OffsetParser<P> {
    /// Zero delay, cues pass through untouched.
    Passthrough(P),
    Shifted { delegate: P, delay_us: i64 },
}

impl<P> OffsetParser<P> {
    pub fn delay_us(&self) -> i64 {
        match self {
            OffsetParser::Passthrough(_) => 0,
            OffsetParser::Shifted { delay_us, .. } => *delay_us,
        }
    }

    pub fn inner(&self) -> &P {
        match self {
            OffsetParser::Passthrough(parser) => parser,
            OffsetParser::Shifted { delegate, .. } => delegate,
        }
    }
}

impl<P: SubtitleParser> SubtitleParser for OffsetParser<P> {
    fn parse_range(
        &mut self,
        data: &[u8],
        offset: usize,
        length: usize,
        window: OutputWindow,
        output: &mut dyn FnMut(CuesWithTiming),
    ) -> Result<()> {
        match self {
            OffsetParser::Passthrough(parser) => {
                parser.parse_range(data, offset, length, window, output)
            }
            OffsetParser::Shifted { delegate, delay_us } => {
                let delay_us = *delay_us;
                let window = adjust_window(window, delay_us);
                delegate.parse_range(data, offset, length, window, &mut |cues| {
                    if let Some(shifted) = shift_cues(cues, delay_us) {
                        output(shifted);
                    }
                })
            }
        }
    }

    fn reset(&mut self) {
        match self {
            OffsetParser::Passthrough(parser) => parser.reset(),
            OffsetParser::Shifted { delegate, .. } => delegate.reset(),
        }
    }

    fn cue_replacement_behavior(&self) -> CueReplacementBehavior {
        self.inner().cue_replacement_behavior()
    }
}

/// Move the requested start time into the unshifted timeline.
pub fn adjust_window(window: OutputWindow, delay_us: i64) -> OutputWindow {
    match window.start_time_us {
        None => window,
        Some(start) => OutputWindow {
            start_time_us: Some(start.saturating_sub(delay_us).max(0)),
            output_all_cues: window.output_all_cues,
        },
    }
}

/// Shift a batch by `delay_us`; `None` when it ends up entirely before zero.
pub fn shift_cues(cues: CuesWithTiming, delay_us: i64) -> Option<CuesWithTiming> {
    let Some(start) = cues.start_time_us else {
        return Some(cues);
    };
    let shifted_start = start.saturating_add(delay_us);

    let Some(duration) = cues.duration_us else {
        let shifted_start = shifted_start.max(0);
        if shifted_start == start {
            return Some(cues);
        }
        return Some(CuesWithTiming {
            start_time_us: Some(shifted_start),
            ..cues
        });
    };

    let shifted_end = start.saturating_add_unsigned(duration).saturating_add(delay_us);
    if shifted_end <= 0 {
        return None;
    }

    let shifted_start = shifted_start.max(0);
    let shifted_duration = shifted_end - shifted_start;
    if shifted_duration <= 0 {
        return None;
    }

    Some(CuesWithTiming {
        start_time_us: Some(shifted_start),
        duration_us: Some(shifted_duration as u64),
        ..cues
    })
}

/// On-screen summary of a delay, e.g. `"- 1.5 s"` or `"1 m 2.3 s"`.
pub fn format_delay(delay_ms: i32) -> String {
    let total_tenths = (delay_ms.unsigned_abs() + 50) / 100;
    let minutes = total_tenths / 600;
    let seconds = (total_tenths % 600) / 10;
    let tenths = total_tenths % 10;

    let seconds_part = format!("{}.{} s", seconds, tenths);
    let formatted = if minutes > 0 {
        format!("{} m {}", minutes, seconds_part)
    } else {
        seconds_part
    };

    if delay_ms < 0 && total_tenths > 0 {
        format!("- {}", formatted)
    } else {
        formatted
    }
}
