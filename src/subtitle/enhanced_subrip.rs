// SubRip with "/line" italics, a common fansub convention
use super::subrip::SubripParser;
use super::text_run::{Style, TextRun};
use super::{Cue, CueReplacementBehavior, CuesWithTiming, Modified, OutputWindow, SubtitleParser};
use crate::error::Result;

/// Wraps [`SubripParser`], turning a leading `/` on any line into italics.
#[derive(Debug, Default)]
pub struct EnhancedSubripParser {
    delegate: SubripParser,
}

impl EnhancedSubripParser {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SubtitleParser for EnhancedSubripParser {
    fn parse_range(
        &mut self,
        data: &[u8],
        offset: usize,
        length: usize,
        window: OutputWindow,
        output: &mut dyn FnMut(CuesWithTiming),
    ) -> Result<()> {
        self.delegate.parse_range(data, offset, length, window, &mut |cues| {
            let styled = apply_slash_line_styling(&cues);
            output(styled.unwrap_or(cues));
        })
    }

    fn reset(&mut self) {
        self.delegate.reset();
    }

    fn cue_replacement_behavior(&self) -> CueReplacementBehavior {
        self.delegate.cue_replacement_behavior()
    }
}

/// Restyle every cue in a batch; `Unchanged` when no line starts with `/`.
pub fn apply_slash_line_styling(batch: &CuesWithTiming) -> Modified<CuesWithTiming> {
    let mut updated: Option<Vec<Cue>> = None;

    for (i, cue) in batch.cues.iter().enumerate() {
        if let Modified::Replaced(new_cue) = style_cue(cue) {
            let cues = updated.get_or_insert_with(|| batch.cues.clone());
            cues[i] = new_cue;
        }
    }

    match updated {
        Some(cues) => Modified::Replaced(CuesWithTiming::new(
            cues,
            batch.start_time_us,
            batch.duration_us,
        )),
        None => Modified::Unchanged,
    }
}

pub fn style_cue(cue: &Cue) -> Modified<Cue> {
    match strip_leading_slashes(&cue.text) {
        Modified::Replaced(text) => Modified::Replaced(Cue { text }),
        Modified::Unchanged => Modified::Unchanged,
    }
}

/// Remove a leading `/` from each line and italicize the rest of that line.
///
/// Existing spans are shifted left past every removed slash.
pub fn strip_leading_slashes(run: &TextRun) -> Modified<TextRun> {
    let text = run.text.as_str();
    let bytes = text.as_bytes();

    // (slash offset, line end) in the original text
    let mut slashed: Vec<(usize, usize)> = Vec::new();
    let mut line_start = 0;
    while line_start < bytes.len() {
        let mut line_end = line_start;
        while line_end < bytes.len() && bytes[line_end] != b'\n' && bytes[line_end] != b'\r' {
            line_end += 1;
        }
        if bytes[line_start] == b'/' {
            slashed.push((line_start, line_end));
        }
        if line_end < bytes.len() && bytes[line_end] == b'\r' {
            line_end += 1;
        }
        if line_end < bytes.len() && bytes[line_end] == b'\n' {
            line_end += 1;
        }
        line_start = line_end;
    }

    if slashed.is_empty() {
        return Modified::Unchanged;
    }

    // Removed slashes strictly before an original offset
    let removed_before = |offset: usize| slashed.iter().take_while(|(slash, _)| *slash < offset).count();

    let mut new_text = String::with_capacity(text.len());
    let mut copied = 0;
    for (slash, _) in &slashed {
        new_text.push_str(&text[copied..*slash]);
        copied = slash + 1;
    }
    new_text.push_str(&text[copied..]);

    let mut styled = TextRun::new(new_text);
    for span in &run.spans {
        let start = span.start - removed_before(span.start);
        let end = span.end - removed_before(span.end);
        styled.push_span(span.style.clone(), start, end);
    }

    for (removed, (slash, line_end)) in slashed.iter().enumerate() {
        let start = slash - removed;
        let end = line_end - (removed + 1);
        styled.push_span(Style::Italic, start, end);
    }

    Modified::Replaced(styled)
}
