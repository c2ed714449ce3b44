// Baseline SubRip (.srt) parser
use super::color::Color;
use super::text_run::{Style, TextRun};
use super::{
    decode_range, lines, Cue, CueReplacementBehavior, CuesWithTiming, OutputWindow,
    SubtitleParser, WindowedOutput,
};
use crate::error::Result;
use tracing::debug;

/// Parser for SubRip blocks: index, `start --> end` line, text lines.
#[derive(Debug, Default)]
pub struct SubripParser;

impl SubripParser {
    pub fn new() -> Self {
        Self
    }
}

impl SubtitleParser for SubripParser {
    fn parse_range(
        &mut self,
        data: &[u8],
        offset: usize,
        length: usize,
        window: OutputWindow,
        output: &mut dyn FnMut(CuesWithTiming),
    ) -> Result<()> {
        let text = decode_range(data, offset, length)?;
        let mut out = WindowedOutput::new(window, output);
        let mut lines = lines(&text).peekable();

        while lines.peek().is_some() {
            // Skip empty lines
            while lines.peek().is_some_and(|l| l.trim().is_empty()) {
                lines.next();
            }

            let Some(mut line) = lines.next() else {
                break;
            };

            // The index line is optional
            if parse_timing_line(line).is_none() {
                if line.trim().parse::<u64>().is_err() {
                    debug!("Skipping invalid index: {}", line);
                }
                match lines.next() {
                    Some(next) => line = next,
                    None => break,
                }
            }

            let Some((start_us, end_us)) = parse_timing_line(line) else {
                debug!("Skipping invalid timing: {}", line);
                continue;
            };

            let mut text_lines = Vec::new();
            while let Some(line) = lines.peek() {
                if line.trim().is_empty() {
                    break;
                }
                text_lines.push(line.trim());
                lines.next();
            }

            let text = parse_srt_formatting(&text_lines.join("\n"));
            let duration = end_us.saturating_sub(start_us).max(0) as u64;
            out.accept(CuesWithTiming::new(
                vec![Cue::new(text)],
                Some(start_us),
                Some(duration),
            ));
        }

        out.finish();
        Ok(())
    }

    fn reset(&mut self) {}

    fn cue_replacement_behavior(&self) -> CueReplacementBehavior {
        CueReplacementBehavior::Merge
    }
}

/// Parse `00:00:01,500 --> 00:00:04,000` (trailing position info is ignored).
fn parse_timing_line(line: &str) -> Option<(i64, i64)> {
    let (start, end) = line.split_once("-->")?;
    let end = end.split_whitespace().next()?;
    Some((parse_timestamp(start.trim())?, parse_timestamp(end)?))
}

/// `[HH:]MM:SS[,mmm]`, with `.` also accepted before the milliseconds.
fn parse_timestamp(s: &str) -> Option<i64> {
    let (clock, millis) = match s.split_once([',', '.']) {
        Some((clock, millis)) => (clock, parse_digits(millis)?),
        None => (s, 0),
    };

    let parts = clock
        .split(':')
        .map(parse_digits)
        .collect::<Option<Vec<i64>>>()?;
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => (0, *m, *s),
        _ => return None,
    };

    hours
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(1000)?
        .checked_add(millis)?
        .checked_mul(1000)
}

fn parse_digits(s: &str) -> Option<i64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Convert `<b>`, `<i>`, `<u>` and `<font color>` tags into spans.
///
/// Unknown tags and `{\...}` override blocks are removed.
fn parse_srt_formatting(text: &str) -> TextRun {
    let mut run = TextRun::default();
    let mut open: Vec<(Style, usize)> = Vec::new();
    let mut rest = text;

    while let Some(pos) = rest.find(['<', '{']) {
        run.text.push_str(&rest[..pos]);
        let candidate = &rest[pos..];

        let close = if candidate.starts_with('<') {
            candidate.find('>')
        } else if candidate.starts_with("{\\") {
            candidate.find('}')
        } else {
            None
        };

        let Some(close) = close else {
            run.text.push_str(&candidate[..1]);
            rest = &candidate[1..];
            continue;
        };

        if candidate.starts_with('<') {
            handle_tag(&candidate[1..close], &mut run, &mut open);
        }
        rest = &candidate[close + 1..];
    }
    run.text.push_str(rest);

    // Unclosed tags run to the end of the text
    let len = run.text.len();
    for (style, start) in open {
        run.push_span(style, start, len);
    }
    run
}

fn handle_tag(tag: &str, run: &mut TextRun, open: &mut Vec<(Style, usize)>) {
    let tag = tag.trim();
    let (closing, name) = match tag.strip_prefix('/') {
        Some(name) => (true, name.trim()),
        None => (false, tag),
    };
    let name_end = name.find(char::is_whitespace).unwrap_or(name.len());
    let (name, attrs) = name.split_at(name_end);
    let name = name.to_ascii_lowercase();

    if closing {
        let closes = |style: &Style| match name.as_str() {
            "b" => *style == Style::Bold,
            "i" => *style == Style::Italic,
            "u" => *style == Style::Underline,
            "font" => matches!(style, Style::ForegroundColor { .. }),
            _ => false,
        };
        if let Some(idx) = open.iter().rposition(|(style, _)| closes(style)) {
            let (style, start) = open.remove(idx);
            let end = run.text.len();
            run.push_span(style, start, end);
        }
        return;
    }

    let start = run.text.len();
    match name.as_str() {
        "b" => open.push((Style::Bold, start)),
        "i" => open.push((Style::Italic, start)),
        "u" => open.push((Style::Underline, start)),
        "font" => {
            if let Some(color) = font_color(attrs) {
                open.push((Style::ForegroundColor { color }, start));
            }
        }
        _ => {}
    }
}

/// Extract the colour from ` color="#FF0000"` style attributes.
fn font_color(attrs: &str) -> Option<Color> {
    let lower = attrs.to_ascii_lowercase();
    let idx = lower.find("color")?;
    let value = attrs[idx + "color".len()..].trim_start().strip_prefix('=')?.trim_start();
    let value = value.trim_start_matches(['"', '\'']);
    let end = value
        .find(|c: char| c == '"' || c == '\'' || c.is_whitespace())
        .unwrap_or(value.len());
    Color::parse(&value[..end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::parse_to_vec;

    const SAMPLE: &str = "1\n00:00:01,500 --> 00:00:04,000\nHello, world!\n\n2\n00:00:04,500 --> 00:00:07,000\nThis is\na test.\n";

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("00:00:01,500"), Some(1_500_000));
        assert_eq!(parse_timestamp("01:01:01.123"), Some(3_661_123_000));
        assert_eq!(parse_timestamp("02:03"), Some(123_000_000));
        assert_eq!(parse_timestamp("aa:00:01,000"), None);
        assert_eq!(parse_timestamp("9999999999999:00:00,000"), None);
    }

    #[test]
    fn test_parse_blocks() {
        let cues = parse_to_vec(&mut SubripParser::new(), SAMPLE.as_bytes(), OutputWindow::all_cues())
            .unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].start_time_us, Some(1_500_000));
        assert_eq!(cues[0].duration_us, Some(2_500_000));
        assert_eq!(cues[1].cues[0].text.text, "This is\na test.");
    }

    #[test]
    fn test_crlf_and_missing_index() {
        let data = "00:00:01,000 --> 00:00:02,000\r\nNo index\r\n\r\n";
        let cues = parse_to_vec(&mut SubripParser::new(), data.as_bytes(), OutputWindow::all_cues())
            .unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].cues[0].text.text, "No index");
    }

    #[test]
    fn test_invalid_block_is_skipped() {
        let data = "1\nnot a timing line\nText\n\n2\n00:00:03,000 --> 00:00:04,000\nGood\n";
        let cues = parse_to_vec(&mut SubripParser::new(), data.as_bytes(), OutputWindow::all_cues())
            .unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].cues[0].text.text, "Good");
    }

    #[test]
    fn test_overflowing_timestamp_is_skipped() {
        let data = "1\n9999999999999:00:00,000 --> 9999999999999:00:01,000\nHi\n\n2\n00:00:05,000 --> 00:00:06,000\nAfter\n";
        let cues = parse_to_vec(&mut SubripParser::new(), data.as_bytes(), OutputWindow::all_cues())
            .unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].start_time_us, Some(5_000_000));
        assert_eq!(cues[0].cues[0].text.text, "After");
    }

    #[test]
    fn test_formatting_tags() {
        let run = parse_srt_formatting("<i>Slanted</i> and <b>bold</b>");
        assert_eq!(run.text, "Slanted and bold");
        let italic = run.spans_of(|s| *s == Style::Italic).next().unwrap();
        assert_eq!(run.slice(italic), "Slanted");
        let bold = run.spans_of(|s| *s == Style::Bold).next().unwrap();
        assert_eq!(run.slice(bold), "bold");
    }

    #[test]
    fn test_font_color_and_override_blocks() {
        let run = parse_srt_formatting("{\\an8}<font color=\"#00FF00\">Top</font>");
        assert_eq!(run.text, "Top");
        assert!(run.has_style(&Style::ForegroundColor {
            color: Color(0xFF00_FF00)
        }));
    }

    #[test]
    fn test_unclosed_tag_runs_to_end() {
        let run = parse_srt_formatting("<u>Under");
        assert_eq!(run.spans.len(), 1);
        assert_eq!(run.slice(&run.spans[0]), "Under");
    }

    #[test]
    fn test_window_applies() {
        let cues = parse_to_vec(
            &mut SubripParser::new(),
            SAMPLE.as_bytes(),
            OutputWindow::only_cues_after(5_000_000),
        )
        .unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].start_time_us, Some(4_500_000));
    }
}
