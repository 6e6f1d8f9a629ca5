//! Maps a scan report onto the pipeline's task result.

use std::fmt;

use tracing::info;

use crate::report::ScanReport;

pub const SAFE_MESSAGE: &str = "Models are safe. No safety checks failed.";
pub const FLAGGED_MESSAGE: &str = "One or more models failed one or more safety checks.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Succeeded,
    SucceededWithIssues,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "Succeeded",
            Self::SucceededWithIssues => "SucceededWithIssues",
            Self::Failed => "Failed",
        }
    }

    pub fn is_success(self) -> bool {
        !matches!(self, Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub status: TaskStatus,
    pub message: String,
}

impl TaskResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Failed,
            message: message.into(),
        }
    }
}

/// Clean when nothing was detected; otherwise a warning, or a failure when
/// `fail_on_detection` is set.
pub fn classify(detections: u64, fail_on_detection: bool) -> TaskStatus {
    match (detections > 0, fail_on_detection) {
        (false, _) => TaskStatus::Succeeded,
        (true, false) => TaskStatus::SucceededWithIssues,
        (true, true) => TaskStatus::Failed,
    }
}

pub fn interpret(report: &ScanReport, fail_on_detection: bool) -> TaskResult {
    let detections = report.detection_count();
    info!("Model failed {detections} safety checks.");
    let status = classify(detections, fail_on_detection);
    let message = match status {
        TaskStatus::Succeeded => SAFE_MESSAGE,
        _ => FLAGGED_MESSAGE,
    };
    TaskResult {
        status,
        message: message.to_string(),
    }
}
