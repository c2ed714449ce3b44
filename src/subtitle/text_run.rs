// Styled text shared by every parser and modifier
use super::color::Color;
use serde::{Deserialize, Serialize};

/// Drop shadow drawn behind glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shadow {
    pub radius: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub color: Color,
}

/// Direct reference to a concrete font face.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypefaceRef {
    /// Font family, `None` for the platform default.
    pub family: Option<String>,
    pub weight: u16,
    pub italic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Style {
    Bold,
    Italic,
    /// Bold and italic at once, as set by `{y:bi}`.
    BoldItalic,
    Underline,
    ForegroundColor { color: Color },
    Shadow(Shadow),
    Typeface(TypefaceRef),
}

/// A style applied to `text[start..end]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub style: Style,
    pub start: usize,
    pub end: usize,
}

/// Plain text plus style spans.
///
/// Offsets are byte offsets into `text` and always fall on `char` boundaries.
/// Spans may overlap (bold and italic over the same range is common).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub spans: Vec<Span>,
}

impl TextRun {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            spans: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Add a span, clamping it into the text. Empty ranges are ignored.
    pub fn push_span(&mut self, style: Style, start: usize, end: usize) {
        let end = end.min(self.text.len());
        let start = start.min(end);
        if start == end {
            return;
        }
        debug_assert!(self.text.is_char_boundary(start) && self.text.is_char_boundary(end));
        self.spans.push(Span { style, start, end });
    }

    /// Add a span covering the whole text.
    pub fn push_full_span(&mut self, style: Style) {
        let len = self.text.len();
        self.push_span(style, 0, len);
    }

    pub fn with_span(mut self, style: Style, start: usize, end: usize) -> Self {
        self.push_span(style, start, end);
        self
    }

    pub fn spans_of<'a>(&'a self, pred: impl Fn(&Style) -> bool + 'a) -> impl Iterator<Item = &'a Span> + 'a {
        self.spans.iter().filter(move |span| pred(&span.style))
    }

    pub fn has_style(&self, style: &Style) -> bool {
        self.spans.iter().any(|span| &span.style == style)
    }

    /// The covered substring for a span.
    pub fn slice(&self, span: &Span) -> &str {
        &self.text[span.start..span.end]
    }
}

impl From<&str> for TextRun {
    fn from(text: &str) -> Self {
        TextRun::new(text)
    }
}

impl From<String> for TextRun {
    fn from(text: String) -> Self {
        TextRun::new(text)
    }
}
