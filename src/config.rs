use crate::error::{Result, SubcueError};
use crate::subtitle::{Color, SubtitleEdgeType, SubtitleTypeface};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Srt,
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Srt => write!(f, "srt"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "srt" => Ok(OutputFormat::Srt),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use 'srt' or 'json'", s)),
        }
    }
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Srt => "srt",
            OutputFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Positive values show subtitles later.
    pub subtitle_delay_ms: i32,
    /// Frame rate for MicroDVD files without a header; 0 means automatic.
    pub fallback_frame_rate: f64,
    pub typeface: SubtitleTypeface,
    pub edge_type: SubtitleEdgeType,
    pub shadow_color: String,
    pub density_dpi: u32,
    pub default_format: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            subtitle_delay_ms: 0,
            fallback_frame_rate: 0.0,
            typeface: SubtitleTypeface::default(),
            edge_type: SubtitleEdgeType::default(),
            shadow_color: "#000000".to_string(),
            density_dpi: 160,
            default_format: OutputFormat::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                config = toml::from_str::<Config>(&contents)?;
            }
        }

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(delay) = std::env::var("SUBCUE_DELAY_MS") {
            if let Ok(d) = delay.parse() {
                self.subtitle_delay_ms = d;
            }
        }
        if let Ok(rate) = std::env::var("SUBCUE_FRAME_RATE") {
            if let Ok(r) = rate.parse() {
                self.fallback_frame_rate = r;
            }
        }
        if let Ok(format) = std::env::var("SUBCUE_DEFAULT_FORMAT") {
            if let Ok(f) = format.parse() {
                self.default_format = f;
            }
        }
        if let Ok(typeface) = std::env::var("SUBCUE_TYPEFACE") {
            if let Ok(t) = typeface.parse() {
                self.typeface = t;
            }
        }
        if let Ok(edge_type) = std::env::var("SUBCUE_EDGE_TYPE") {
            if let Ok(e) = edge_type.parse() {
                self.edge_type = e;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.fallback_frame_rate.is_finite() || self.fallback_frame_rate < 0.0 {
            return Err(SubcueError::Config(format!(
                "Frame rate must be a non-negative number, got {}",
                self.fallback_frame_rate
            )));
        }

        if self.density_dpi == 0 {
            return Err(SubcueError::Config(
                "Screen density must be greater than 0".to_string(),
            ));
        }

        self.shadow_color()?;
        Ok(())
    }

    pub fn shadow_color(&self) -> Result<Color> {
        self.shadow_color.parse().map_err(|e| {
            SubcueError::Config(format!("Invalid shadow color '{}': {}", self.shadow_color, e))
        })
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("subcue").join("config.toml"))
    }
}
