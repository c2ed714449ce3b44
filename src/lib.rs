pub mod config;
pub mod error;
pub mod pipeline;
pub mod subtitle;

pub use config::{Config, OutputFormat};
pub use error::{Result, SubcueError};
pub use pipeline::{process_file, print_summary, PipelineConfig, PipelineResult, PipelineStats};
