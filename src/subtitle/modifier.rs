// Display preferences applied to parsed cues just before rendering
use super::color::Color;
use super::text_run::{Shadow, Style, TextRun, TypefaceRef};
use super::{Cue, CuesWithTiming, Modified};
use serde::{Deserialize, Serialize};

/// Density of a 160 dpi screen, where one dp is one pixel.
const DENSITY_DEFAULT: u32 = 160;

const FONT_WEIGHT_MEDIUM: u16 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleTypeface {
    #[default]
    Default,
    /// Italics drawn with a medium-weight italic face.
    Medium,
}

impl std::fmt::Display for SubtitleTypeface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubtitleTypeface::Default => write!(f, "default"),
            SubtitleTypeface::Medium => write!(f, "medium"),
        }
    }
}

impl std::str::FromStr for SubtitleTypeface {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(SubtitleTypeface::Default),
            "medium" => Ok(SubtitleTypeface::Medium),
            _ => Err(format!(
                "Unknown typeface: {}. Use 'default' or 'medium'",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleEdgeType {
    #[default]
    None,
    Outline,
    DropShadow,
    /// Outline plus a one-dp drop shadow.
    OutlineShadow,
}

impl std::fmt::Display for SubtitleEdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubtitleEdgeType::None => write!(f, "none"),
            SubtitleEdgeType::Outline => write!(f, "outline"),
            SubtitleEdgeType::DropShadow => write!(f, "drop_shadow"),
            SubtitleEdgeType::OutlineShadow => write!(f, "outline_shadow"),
        }
    }
}

impl std::str::FromStr for SubtitleEdgeType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "none" => Ok(SubtitleEdgeType::None),
            "outline" => Ok(SubtitleEdgeType::Outline),
            "drop_shadow" => Ok(SubtitleEdgeType::DropShadow),
            "outline_shadow" => Ok(SubtitleEdgeType::OutlineShadow),
            _ => Err(format!(
                "Unknown edge type: {}. Use 'none', 'outline', 'drop_shadow' or 'outline_shadow'",
                s
            )),
        }
    }
}

/// Screen metrics supplied by the render host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayMetrics {
    pub density_dpi: u32,
}

impl Default for DisplayMetrics {
    fn default() -> Self {
        Self {
            density_dpi: DENSITY_DEFAULT,
        }
    }
}

impl DisplayMetrics {
    /// One density-independent pixel, rounded to whole device pixels.
    pub fn one_dp_in_px(&self) -> f32 {
        (self.density_dpi as f32 / DENSITY_DEFAULT as f32).round()
    }
}

#[derive(Debug, Clone)]
pub struct CueModifier {
    shadow: Shadow,
    typeface: SubtitleTypeface,
    italic_typeface: TypefaceRef,
    edge_type: SubtitleEdgeType,
}

impl CueModifier {
    pub fn new(metrics: DisplayMetrics) -> Self {
        let one_dp = metrics.one_dp_in_px();
        Self {
            shadow: Shadow {
                radius: one_dp,
                offset_x: one_dp,
                offset_y: one_dp,
                color: Color::BLACK,
            },
            typeface: SubtitleTypeface::Default,
            italic_typeface: medium_italic(None),
            edge_type: SubtitleEdgeType::None,
        }
    }

    /// Select the typeface mode; `family` is the base font used for subtitles.
    pub fn set_subtitle_typeface(&mut self, typeface: SubtitleTypeface, family: Option<String>) {
        self.typeface = typeface;
        self.italic_typeface = medium_italic(family);
    }

    pub fn subtitle_typeface(&self) -> SubtitleTypeface {
        self.typeface
    }

    pub fn set_edge_type(&mut self, edge_type: SubtitleEdgeType) {
        self.edge_type = edge_type;
    }

    pub fn edge_type(&self) -> SubtitleEdgeType {
        self.edge_type
    }

    pub fn set_shadow_color(&mut self, color: Color) {
        self.shadow.color = color;
    }

    pub fn shadow(&self) -> Shadow {
        self.shadow
    }

    /// Apply the preferences to every cue; `Unchanged` if none needed it.
    pub fn modify_cues(&self, cues: &[Cue]) -> Modified<Vec<Cue>> {
        let mut updated: Option<Vec<Cue>> = None;
        for (i, cue) in cues.iter().enumerate() {
            if let Modified::Replaced(new_cue) = self.modify_cue(cue) {
                updated.get_or_insert_with(|| cues.to_vec())[i] = new_cue;
            }
        }
        match updated {
            Some(cues) => Modified::Replaced(cues),
            None => Modified::Unchanged,
        }
    }

    pub fn modify_batch(&self, batch: &CuesWithTiming) -> Modified<CuesWithTiming> {
        match self.modify_cues(&batch.cues) {
            Modified::Replaced(cues) => Modified::Replaced(CuesWithTiming::new(
                cues,
                batch.start_time_us,
                batch.duration_us,
            )),
            Modified::Unchanged => Modified::Unchanged,
        }
    }

    pub fn modify_cue(&self, cue: &Cue) -> Modified<Cue> {
        let mut text = cue.text.clone();
        let mut modified = self.replace_italics(&mut text);
        modified |= self.add_shadow(&mut text);

        if modified {
            Modified::Replaced(Cue { text })
        } else {
            Modified::Unchanged
        }
    }

    /// Swap plain italic spans for the medium italic face.
    ///
    /// `BoldItalic` spans keep their synthetic style, since the medium face
    /// has a fixed weight.
    fn replace_italics(&self, text: &mut TextRun) -> bool {
        if self.typeface != SubtitleTypeface::Medium {
            return false;
        }

        let mut modified = false;
        for span in text.spans.iter_mut().filter(|s| s.style == Style::Italic) {
            span.style = Style::Typeface(self.italic_typeface.clone());
            modified = true;
        }
        modified
    }

    fn add_shadow(&self, text: &mut TextRun) -> bool {
        if self.edge_type != SubtitleEdgeType::OutlineShadow || text.is_empty() {
            return false;
        }
        text.push_full_span(Style::Shadow(self.shadow));
        true
    }
}

fn medium_italic(family: Option<String>) -> TypefaceRef {
    TypefaceRef {
        family,
        weight: FONT_WEIGHT_MEDIUM,
        italic: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::tags::extract_text;

    fn italic_cue() -> Cue {
        Cue::new(TextRun::new("Slanted\nPlain").with_span(Style::Italic, 0, 7))
    }

    fn modifier(typeface: SubtitleTypeface, edge: SubtitleEdgeType) -> CueModifier {
        let mut modifier = CueModifier::new(DisplayMetrics { density_dpi: 480 });
        modifier.set_subtitle_typeface(typeface, Some("Roboto".to_string()));
        modifier.set_edge_type(edge);
        modifier
    }

    #[test]
    fn test_one_dp() {
        assert_eq!(DisplayMetrics { density_dpi: 160 }.one_dp_in_px(), 1.0);
        assert_eq!(DisplayMetrics { density_dpi: 420 }.one_dp_in_px(), 3.0);
        assert_eq!(DisplayMetrics { density_dpi: 480 }.one_dp_in_px(), 3.0);
    }

    #[test]
    fn test_defaults_leave_cue_unchanged() {
        let modifier = CueModifier::new(DisplayMetrics::default());
        assert!(modifier.modify_cue(&italic_cue()).is_unchanged());
        assert!(modifier.modify_cues(&[italic_cue()]).is_unchanged());
    }

    #[test]
    fn test_medium_italic_replaces_italic() {
        let modifier = modifier(SubtitleTypeface::Medium, SubtitleEdgeType::None);
        let Modified::Replaced(cue) = modifier.modify_cue(&italic_cue()) else {
            panic!("expected replacement");
        };
        assert!(!cue.text.has_style(&Style::Italic));
        let span = &cue.text.spans[0];
        assert_eq!((span.start, span.end), (0, 7));
        assert_eq!(
            span.style,
            Style::Typeface(TypefaceRef {
                family: Some("Roboto".to_string()),
                weight: 500,
                italic: true,
            })
        );
    }

    #[test]
    fn test_bold_italic_and_bold_are_untouched() {
        let modifier = modifier(SubtitleTypeface::Medium, SubtitleEdgeType::None);
        let cue = Cue::new(
            TextRun::new("Strong")
                .with_span(Style::Bold, 0, 3)
                .with_span(Style::BoldItalic, 3, 6),
        );
        assert!(modifier.modify_cue(&cue).is_unchanged());
    }

    #[test]
    fn test_line_italic_under_bold_tag_is_replaced() {
        let modifier = modifier(SubtitleTypeface::Medium, SubtitleEdgeType::None);
        let cue = Cue::new(extract_text("{y:b}/Text"));
        let Modified::Replaced(cue) = modifier.modify_cue(&cue) else {
            panic!("expected replacement");
        };
        assert_eq!(cue.text.text, "Text");
        assert!(cue.text.has_style(&Style::Bold));
        assert!(!cue.text.has_style(&Style::Italic));
        assert!(cue
            .text
            .spans
            .iter()
            .any(|s| matches!(&s.style, Style::Typeface(t) if t.italic && t.weight == 500)));
    }

    #[test]
    fn test_bold_italic_tag_is_kept() {
        let modifier = modifier(SubtitleTypeface::Medium, SubtitleEdgeType::None);
        let cue = Cue::new(extract_text("{y:bi}Text"));
        assert!(modifier.modify_cue(&cue).is_unchanged());
    }

    #[test]
    fn test_outline_shadow_adds_shadow() {
        let mut modifier = modifier(SubtitleTypeface::Default, SubtitleEdgeType::OutlineShadow);
        modifier.set_shadow_color(Color(0x8000_0000));
        let Modified::Replaced(cue) = modifier.modify_cue(&Cue::new("Text")) else {
            panic!("expected replacement");
        };
        let span = cue.text.spans.last().unwrap();
        assert_eq!((span.start, span.end), (0, 4));
        assert_eq!(
            span.style,
            Style::Shadow(Shadow {
                radius: 3.0,
                offset_x: 3.0,
                offset_y: 3.0,
                color: Color(0x8000_0000),
            })
        );
    }

    #[test]
    fn test_other_edge_types_add_nothing() {
        let modifier = modifier(SubtitleTypeface::Default, SubtitleEdgeType::Outline);
        assert!(modifier.modify_cue(&Cue::new("Text")).is_unchanged());
    }

    #[test]
    fn test_batch_keeps_unmodified_cues() {
        let modifier = modifier(SubtitleTypeface::Medium, SubtitleEdgeType::None);
        let batch = CuesWithTiming::new(vec![Cue::new("Plain"), italic_cue()], Some(5), Some(10));
        let Modified::Replaced(updated) = modifier.modify_batch(&batch) else {
            panic!("expected replacement");
        };
        assert_eq!(updated.cues[0], batch.cues[0]);
        assert_ne!(updated.cues[1], batch.cues[1]);
        assert_eq!(updated.start_time_us, Some(5));
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("medium".parse::<SubtitleTypeface>().unwrap(), SubtitleTypeface::Medium);
        assert_eq!(
            "outline-shadow".parse::<SubtitleEdgeType>().unwrap(),
            SubtitleEdgeType::OutlineShadow
        );
        assert!("bold".parse::<SubtitleTypeface>().is_err());
        assert_eq!(SubtitleEdgeType::DropShadow.to_string(), "drop_shadow");
    }
}
