//! Azure Pipelines logging commands.
//!
//! The agent reads `##vso[...]` lines from stdout to raise issues and set
//! the final task result.

use std::io::{self, Write};

use crate::outcome::{TaskResult, TaskStatus};

/// Escape message data so it stays on one logging command line.
pub fn escape_data(message: &str) -> String {
    message
        .replace('%', "%AZP25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn log_issue(out: &mut impl Write, kind: &str, message: &str) -> io::Result<()> {
    writeln!(out, "##vso[task.logissue type={kind}]{}", escape_data(message))
}

/// Emit the issue (if any) and the completion command for `result`.
pub fn report_result(out: &mut impl Write, result: &TaskResult) -> io::Result<()> {
    match result.status {
        TaskStatus::Succeeded => {}
        TaskStatus::SucceededWithIssues => log_issue(out, "warning", &result.message)?,
        TaskStatus::Failed => log_issue(out, "error", &result.message)?,
    }
    writeln!(
        out,
        "##vso[task.complete result={};]{}",
        result.status,
        escape_data(&result.message)
    )?;
    out.flush()
}

/// Process exit code for a result.
pub fn exit_code(status: TaskStatus) -> u8 {
    if status.is_success() {
        0
    } else {
        1
    }
}
