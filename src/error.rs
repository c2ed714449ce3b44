use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubcueError {
    #[error("Unsupported subtitle format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid buffer range: offset {offset} + length {length} exceeds {size} bytes")]
    InvalidRange {
        offset: usize,
        length: usize,
        size: usize,
    },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SubcueError>;
