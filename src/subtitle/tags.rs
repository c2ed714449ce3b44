// MicroDVD / MPL2 inline tags: {y:biu}, {c:$RRGGBB}, | line breaks, / italics
use super::color::Color;
use super::text_run::{Style, TextRun};
use tracing::warn;

/// Styles collected from one line's tags, applied to the whole line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StyleFlags {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub color: Option<Color>,
}

impl StyleFlags {
    fn add_letters(&mut self, letters: &str) {
        for ch in letters.chars() {
            match ch.to_ascii_lowercase() {
                'b' => self.bold = true,
                'i' => self.italic = true,
                'u' => self.underline = true,
                _ => {}
            }
        }
    }

    /// Add whole-text spans for every collected style.
    pub fn apply(&self, run: &mut TextRun) {
        match (self.bold, self.italic) {
            (true, true) => run.push_full_span(Style::BoldItalic),
            (true, false) => run.push_full_span(Style::Bold),
            (false, true) => run.push_full_span(Style::Italic),
            (false, false) => {}
        }
        if self.underline {
            run.push_full_span(Style::Underline);
        }
        if let Some(color) = self.color {
            run.push_full_span(Style::ForegroundColor { color });
        }
    }
}

/// Convert the text part of a frame line into styled text.
pub fn extract_text(raw: &str) -> TextRun {
    let (clean, style) = extract_styles(raw);
    let with_breaks = convert_line_breaks(&clean);
    let mut run = apply_line_italics(&with_breaks, style.italic);
    style.apply(&mut run);
    run
}

/// Strip `{y:..}`, `{c:..}` and other single-letter tags, collecting their styles.
pub fn extract_styles(text: &str) -> (String, StyleFlags) {
    let mut style = StyleFlags::default();

    let text = strip_tags(text, |kind, body| {
        if !kind.eq_ignore_ascii_case(&'y') {
            return false;
        }
        style.add_letters(body);
        true
    });

    let text = strip_tags(&text, |kind, body| {
        if !kind.eq_ignore_ascii_case(&'c') || !is_color_token(body) {
            return false;
        }
        if style.color.is_none() {
            style.color = parse_color_token(body);
        }
        true
    });

    // Remaining tags ({f:..}, {s:..}, {p:..}, ...) have no effect here
    let text = strip_tags(&text, |_, _| true);

    (text, style)
}

/// `\|` becomes a literal `|`, any other `|` a line break.
pub fn convert_line_breaks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'|') => {
                chars.next();
                out.push('|');
            }
            '|' => out.push('\n'),
            _ => out.push(ch),
        }
    }
    out
}

/// Strip a leading `/` from each line and italicize that line.
///
/// When the whole text is already italic the slash is still removed but no
/// extra span is added.
pub fn apply_line_italics(text: &str, global_italic: bool) -> TextRun {
    let mut run = TextRun::default();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            run.text.push('\n');
        }
        let (line, slash) = match line.strip_prefix('/') {
            Some(rest) => (rest, true),
            None => (line, false),
        };
        let start = run.text.len();
        run.text.push_str(line);
        if slash && !global_italic && !line.is_empty() {
            let end = run.text.len();
            run.push_span(Style::Italic, start, end);
        }
    }
    run
}

/// Remove every `{X:body}` tag for which `consume(X, body)` returns true.
///
/// `X` is a single ASCII letter and `body` runs to the first `}`.
fn strip_tags(text: &str, mut consume: impl FnMut(char, &str) -> bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let candidate = &rest[open..];
        match parse_tag(candidate) {
            Some((kind, body, len)) if consume(kind, body) => {
                rest = &candidate[len..];
            }
            _ => {
                out.push('{');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Parse `{X:body}` at the start of `s`, returning kind, body and byte length.
fn parse_tag(s: &str) -> Option<(char, &str, usize)> {
    let bytes = s.as_bytes();
    if bytes.len() < 4 || bytes[0] != b'{' || !bytes[1].is_ascii_alphabetic() || bytes[2] != b':' {
        return None;
    }
    let close = s[3..].find('}')? + 3;
    Some((bytes[1] as char, &s[3..close], close + 1))
}

/// `$RRGGBB` or a run of letters.
fn is_color_token(body: &str) -> bool {
    match body.strip_prefix('$') {
        Some(hex) => hex.len() == 6 && hex.bytes().all(|b| b.is_ascii_hexdigit()),
        None => !body.is_empty() && body.bytes().all(|b| b.is_ascii_alphabetic()),
    }
}

fn parse_color_token(token: &str) -> Option<Color> {
    let parsed = match token.strip_prefix('$') {
        Some(hex) => Color::parse(&format!("#{}", hex)),
        None => Color::parse(token),
    };
    match parsed {
        Ok(color) => Some(color),
        Err(e) => {
            warn!("Ignoring color tag: {}", e);
            None
        }
    }
}
