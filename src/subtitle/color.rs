// Colour values for foreground and shadow spans
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A packed ARGB colour (`0xAARRGGBB`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub u32);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("Unknown color: {0}")]
    UnknownColor(String),

    #[error("Invalid hex color: {0}")]
    InvalidHex(String),
}

const NAMED_COLORS: &[(&str, u32)] = &[
    ("black", 0xFF00_0000),
    ("darkgray", 0xFF44_4444),
    ("darkgrey", 0xFF44_4444),
    ("gray", 0xFF88_8888),
    ("grey", 0xFF88_8888),
    ("lightgray", 0xFFCC_CCCC),
    ("lightgrey", 0xFFCC_CCCC),
    ("white", 0xFFFF_FFFF),
    ("red", 0xFFFF_0000),
    ("green", 0xFF00_FF00),
    ("blue", 0xFF00_00FF),
    ("yellow", 0xFFFF_FF00),
    ("cyan", 0xFF00_FFFF),
    ("magenta", 0xFFFF_00FF),
    ("aqua", 0xFF00_FFFF),
    ("fuchsia", 0xFFFF_00FF),
    ("lime", 0xFF00_FF00),
    ("maroon", 0xFF80_0000),
    ("navy", 0xFF00_0080),
    ("olive", 0xFF80_8000),
    ("purple", 0xFF80_0080),
    ("silver", 0xFFC0_C0C0),
    ("teal", 0xFF00_8080),
];

impl Color {
    pub const BLACK: Color = Color(0xFF00_0000);
    pub const WHITE: Color = Color(0xFFFF_FFFF);

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Color(0xFF00_0000 | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b))
    }

    /// Parse `#RRGGBB`, `#AARRGGBB` or a case-insensitive colour name.
    pub fn parse(value: &str) -> Result<Self, ColorParseError> {
        if let Some(hex) = value.strip_prefix('#') {
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(ColorParseError::InvalidHex(value.to_string()));
            }
            let parsed = u32::from_str_radix(hex, 16)
                .map_err(|_| ColorParseError::InvalidHex(value.to_string()))?;
            return match hex.len() {
                6 => Ok(Color(0xFF00_0000 | parsed)),
                8 => Ok(Color(parsed)),
                _ => Err(ColorParseError::InvalidHex(value.to_string())),
            };
        }

        let lower = value.to_ascii_lowercase();
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, argb)| Color(*argb))
            .ok_or_else(|| ColorParseError::UnknownColor(value.to_string()))
    }

    pub fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// `#RRGGBB`, dropping alpha.
    pub fn to_rgb_hex(self) -> String {
        format!("#{:06X}", self.0 & 0x00FF_FFFF)
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:08X}", self.0)
    }
}

impl std::str::FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::parse(s)
    }
}
