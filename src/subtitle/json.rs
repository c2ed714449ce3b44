// JSON subtitle format
use super::text_run::TextRun;
use super::{display_intervals, format_timestamp, CuesWithTiming, SubtitleFormatter};
use crate::error::Result;
use serde::Serialize;

#[derive(Default)]
pub struct JsonFormatter {
    pub source_file: Option<String>,
    pub mime_type: Option<String>,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    metadata: JsonMetadata,
    subtitles: Vec<JsonSubtitle<'a>>,
}

#[derive(Serialize)]
struct JsonMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    source_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
    subtitle_count: usize,
}

#[derive(Serialize)]
struct JsonSubtitle<'a> {
    index: usize,
    start: f64,
    end: f64,
    start_formatted: String,
    end_formatted: String,
    /// Plain text of every cue, one per line.
    text: String,
    /// Styled text of each cue.
    cues: Vec<&'a TextRun>,
}

impl JsonFormatter {
    /// Serialize the cues, returning serialization failures to the caller.
    pub fn to_json(&self, cues: &[CuesWithTiming]) -> Result<String> {
        let output = JsonOutput {
            metadata: JsonMetadata {
                source_file: self.source_file.clone(),
                mime_type: self.mime_type.clone(),
                subtitle_count: cues.len(),
            },
            subtitles: cues
                .iter()
                .zip(display_intervals(cues))
                .enumerate()
                .map(|(i, (batch, (start, end)))| JsonSubtitle {
                    index: i + 1,
                    start: seconds(start),
                    end: seconds(end),
                    start_formatted: format_timestamp(start, '.'),
                    end_formatted: format_timestamp(end, '.'),
                    text: batch
                        .cues
                        .iter()
                        .map(|cue| cue.text.text.as_str())
                        .collect::<Vec<_>>()
                        .join("\n"),
                    cues: batch.cues.iter().map(|cue| &cue.text).collect(),
                })
                .collect(),
        };

        Ok(serde_json::to_string_pretty(&output)?)
    }
}

impl SubtitleFormatter for JsonFormatter {
    fn format(&self, cues: &[CuesWithTiming]) -> String {
        self.to_json(cues).unwrap_or_else(|_| "{}".to_string())
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}

fn seconds(time_us: i64) -> f64 {
    time_us as f64 / 1_000_000.0
}
