// SRT subtitle format
use super::text_run::{Style, TextRun};
use super::{display_intervals, format_timestamp, CuesWithTiming, SubtitleFormatter};
use std::cmp::Reverse;

pub struct SrtFormatter;

impl SubtitleFormatter for SrtFormatter {
    fn format(&self, cues: &[CuesWithTiming]) -> String {
        cues.iter()
            .zip(display_intervals(cues))
            .enumerate()
            .map(|(i, (batch, (start, end)))| {
                let text = batch
                    .cues
                    .iter()
                    .map(|cue| render_markup(&cue.text))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!(
                    "{}\n{} --> {}\n{}\n",
                    i + 1,
                    format_timestamp(start, ','),
                    format_timestamp(end, ','),
                    text
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn extension(&self) -> &'static str {
        "srt"
    }
}

/// SubRip markup for a style, if it has one.
fn markup(style: &Style) -> Option<(String, &'static str)> {
    match style {
        Style::Bold => Some(("<b>".to_string(), "</b>")),
        Style::Italic => Some(("<i>".to_string(), "</i>")),
        Style::BoldItalic => Some(("<b><i>".to_string(), "</i></b>")),
        Style::Underline => Some(("<u>".to_string(), "</u>")),
        Style::ForegroundColor { color } => Some((
            format!("<font color=\"{}\">", color.to_rgb_hex()),
            "</font>",
        )),
        Style::Typeface(typeface) if typeface.italic => Some(("<i>".to_string(), "</i>")),
        Style::Typeface(_) | Style::Shadow(_) => None,
    }
}

/// Render styled text as SubRip `<b>`/`<i>`/`<u>`/`<font>` markup.
///
/// At each offset, spans ending there close before spans starting there
/// open. Longer spans open first so that nested spans stay nested.
pub fn render_markup(run: &TextRun) -> String {
    let tagged: Vec<(usize, usize, usize, String, &'static str)> = run
        .spans
        .iter()
        .enumerate()
        .filter_map(|(i, span)| {
            markup(&span.style).map(|(open, close)| (i, span.start, span.end, open, close))
        })
        .collect();

    if tagged.is_empty() {
        return run.text.clone();
    }

    let mut boundaries: Vec<usize> = tagged
        .iter()
        .flat_map(|(_, start, end, ..)| [*start, *end])
        .collect();
    boundaries.push(run.text.len());
    boundaries.sort_unstable();
    boundaries.dedup();

    let mut out = String::with_capacity(run.text.len() + tagged.len() * 8);
    let mut copied = 0;
    for offset in boundaries {
        out.push_str(&run.text[copied..offset]);
        copied = offset;

        let mut closing: Vec<_> = tagged.iter().filter(|t| t.2 == offset).collect();
        closing.sort_by_key(|t| (Reverse(t.1), Reverse(t.0)));
        for (.., close) in closing {
            out.push_str(close);
        }

        let mut opening: Vec<_> = tagged.iter().filter(|t| t.1 == offset).collect();
        opening.sort_by_key(|t| (Reverse(t.2), t.0));
        for (.., open, _) in opening {
            out.push_str(open);
        }
    }
    out
}
