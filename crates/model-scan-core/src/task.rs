//! One task invocation: prepare output, route, scan, interpret, export.

use std::path::PathBuf;

use tracing::error;

use crate::client::{ClientConfig, ModelScanner, ScanClient};
use crate::error::Result;
use crate::outcome::{interpret, TaskResult};
use crate::report::{print_summary, OutputFormat};
use crate::router::{dispatch, route, ScanRequest};
use crate::sarif;

/// Everything the task reads from its inputs, gathered once up front.
#[derive(Debug, Clone)]
pub struct TaskConfig {
    pub request: ScanRequest,
    pub client: ClientConfig,
    pub fail_on_detection: bool,
    pub sarif_file: Option<PathBuf>,
    pub format: OutputFormat,
}

impl TaskConfig {
    pub fn new(request: ScanRequest) -> Self {
        Self {
            request,
            client: ClientConfig::default(),
            fail_on_detection: false,
            sarif_file: None,
            format: OutputFormat::default(),
        }
    }
}

/// Run against the real scanning service.
pub fn run(config: &TaskConfig) -> TaskResult {
    match ScanClient::new(config.client.clone()) {
        Ok(mut client) => run_task(config, &mut client),
        Err(err) => fail(err),
    }
}

/// Run with the given scanner. Every error ends up as a failed result.
pub fn run_task(config: &TaskConfig, scanner: &mut dyn ModelScanner) -> TaskResult {
    execute(config, scanner).unwrap_or_else(fail)
}

fn fail(err: crate::error::TaskError) -> TaskResult {
    error!(kind = ?err.kind(), "{err}");
    TaskResult::failed(err.to_string())
}

fn execute(config: &TaskConfig, scanner: &mut dyn ModelScanner) -> Result<TaskResult> {
    let sarif_dest = config
        .sarif_file
        .as_deref()
        .map(sarif::prepare_destination)
        .transpose()?;

    let plan = route(&config.request)?;
    let report = dispatch(&plan, scanner)?;
    print_summary(&plan, &report, config.format);
    let result = interpret(&report, config.fail_on_detection);

    if let Some(dest) = sarif_dest {
        let raw = scanner.sarif(&report.scan_id)?;
        sarif::export(&raw, &dest)?;
    }
    Ok(result)
}
