//! The [`LineClassifier`](crate::classifier::LineClassifier)'s output (spec §3).

use crate::file_progress::FileProgress;
use crate::phase::Phase;

/// Result of classifying a single decoded text line.
///
/// Unset fields mean "this line did not carry that information." A single
/// line may contribute multiple features (spec §4.1).
#[derive(Debug, Clone, Default)]
pub struct ParsedLine {
    pub has_progress: bool,
    pub phase: Option<Phase>,
    pub phase_name: Option<String>,
    pub file_progress: Option<FileProgress>,
    pub completed_filename: Option<String>,
    pub overall_percent: Option<f64>,
    pub step_info: Option<(u64, u64)>,
    pub data_info: Option<(u64, u64)>,
    pub speed_info: Option<(String, f64)>,
    pub file_counter: Option<(u64, u64)>,
    pub message: String,
}

impl ParsedLine {
    pub fn unparsed(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }
}
