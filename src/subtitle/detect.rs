// Frame-based format detection (MicroDVD / MPL2)
use regex::Regex;
use std::sync::LazyLock;

static FRAME_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\{(-?\d+)\}\{(-?\d+)\}|\[(-?\d+)\]\[(-?\d+)\])(.*)$").expect("Invalid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    /// `{start}{end}text`, frame numbers.
    MicroDvd,
    /// `[start][end]text`, tenths of a second.
    Mpl2,
    Unrecognized,
}

impl SubtitleFormat {
    pub fn is_frame_based(self) -> bool {
        matches!(self, SubtitleFormat::MicroDvd | SubtitleFormat::Mpl2)
    }
}

impl std::fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubtitleFormat::MicroDvd => write!(f, "microdvd"),
            SubtitleFormat::Mpl2 => write!(f, "mpl2"),
            SubtitleFormat::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

/// One `{start}{end}text` or `[start][end]text` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLine<'a> {
    pub format: SubtitleFormat,
    pub start_frame: i64,
    pub end_frame: i64,
    pub text: &'a str,
}

impl<'a> FrameLine<'a> {
    /// Match a normalized line. Both bracket pairs must be of the same kind.
    pub fn parse(line: &'a str) -> Option<Self> {
        let caps = FRAME_LINE.captures(line)?;
        let (format, start, end) = match (caps.get(1), caps.get(2)) {
            (Some(start), Some(end)) => (SubtitleFormat::MicroDvd, start, end),
            _ => (SubtitleFormat::Mpl2, caps.get(3)?, caps.get(4)?),
        };

        Some(Self {
            format,
            // Out-of-range frame numbers make the line malformed
            start_frame: start.as_str().parse().ok()?,
            end_frame: end.as_str().parse().ok()?,
            text: caps.get(5).map_or("", |m| m.as_str()),
        })
    }
}

/// Trim a line and drop a leading byte order mark.
pub fn normalize_line(line: &str) -> &str {
    let trimmed = line.trim();
    match trimmed.strip_prefix('\u{FEFF}') {
        Some(rest) => rest.trim(),
        None => trimmed,
    }
}

/// Classify a buffer by its first non-blank line.
pub fn detect_format(text: &str) -> SubtitleFormat {
    super::lines(text)
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map_or(SubtitleFormat::Unrecognized, detect_line)
}

fn detect_line(line: &str) -> SubtitleFormat {
    FrameLine::parse(normalize_line(line)).map_or(SubtitleFormat::Unrecognized, |l| l.format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_microdvd() {
        assert_eq!(detect_format("{0}{25}Hello"), SubtitleFormat::MicroDvd);
        assert_eq!(detect_format("\n\n  {1}{1}23.976\n{10}{20}x"), SubtitleFormat::MicroDvd);
    }

    #[test]
    fn test_detect_mpl2() {
        assert_eq!(detect_format("[0][10]Hello"), SubtitleFormat::Mpl2);
    }

    #[test]
    fn test_detect_with_bom() {
        assert_eq!(detect_format("\u{FEFF}{0}{25}Hello"), SubtitleFormat::MicroDvd);
    }

    #[test]
    fn test_detect_unrecognized() {
        assert_eq!(
            detect_format("1\n00:00:01,000 --> 00:00:02,000\nHi"),
            SubtitleFormat::Unrecognized
        );
        assert_eq!(detect_format(""), SubtitleFormat::Unrecognized);
        assert_eq!(detect_format("   \n  "), SubtitleFormat::Unrecognized);
    }

    #[test]
    fn test_mixed_brackets_are_unrecognized() {
        assert_eq!(detect_format("{0}[10]Hello"), SubtitleFormat::Unrecognized);
        assert_eq!(detect_format("[0}{10]Hello"), SubtitleFormat::Unrecognized);
    }

    #[test]
    fn test_only_first_line_is_examined() {
        assert_eq!(detect_format("garbage\n{0}{25}Hello"), SubtitleFormat::Unrecognized);
    }

    #[test]
    fn test_frame_line_parse() {
        let line = FrameLine::parse("{-5}{30}{y:i}Text").unwrap();
        assert_eq!(line.format, SubtitleFormat::MicroDvd);
        assert_eq!(line.start_frame, -5);
        assert_eq!(line.end_frame, 30);
        assert_eq!(line.text, "{y:i}Text");

        let empty = FrameLine::parse("[1][2]").unwrap();
        assert_eq!(empty.text, "");
    }

    #[test]
    fn test_frame_line_overflow_is_rejected() {
        assert!(FrameLine::parse("{99999999999999999999}{1}x").is_none());
    }
}
