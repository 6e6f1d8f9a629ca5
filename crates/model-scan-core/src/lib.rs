//! model-scan-core — submits ML models to a remote scanning service.
//!
//! Routes a model location to the matching scan strategy, talks to the scan
//! API, maps detections onto a pipeline result and exports portable SARIF.

pub mod client;
pub mod error;
pub mod outcome;
pub mod pipeline;
pub mod report;
pub mod router;
pub mod sarif;
pub mod source;
pub mod task;
pub(crate) mod test_utils;

pub use client::{ClientConfig, ModelScanner, ScanClient};
pub use error::{ErrorKind, TaskError};
pub use outcome::{TaskResult, TaskStatus};
pub use router::{ScanPlan, ScanRequest};
pub use task::{run, run_task, TaskConfig};
