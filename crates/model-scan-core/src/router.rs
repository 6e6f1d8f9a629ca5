//! Picks the acquisition strategy for a model path and dispatches the scan.
//!
//! Precedence: an explicit community scan tag always wins, then `s3://`
//! object storage, then Azure Blob Storage URLs. Everything else, including
//! URIs with other schemes, is treated as a local file or folder.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::client::ModelScanner;
use crate::error::{Result, TaskError};
use crate::report::ScanReport;
use crate::source::{
    account_url, classify_url, derive_model_name, split_bucket_key, split_container_blob,
    CommunityScanSource, ModelSource, UrlKind,
};

/// Inputs that decide where a model is fetched from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanRequest {
    pub model_path: String,
    pub model_name: Option<String>,
    pub community_scan: Option<String>,
    pub model_version: Option<String>,
    pub azure_blob_sas_key: Option<String>,
}

impl ScanRequest {
    pub fn new(model_path: impl Into<String>) -> Self {
        Self {
            model_path: model_path.into(),
            ..Default::default()
        }
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = non_empty(name.into());
        self
    }

    pub fn with_community_scan(mut self, tag: impl Into<String>) -> Self {
        self.community_scan = non_empty(tag.into());
        self
    }

    pub fn with_model_version(mut self, version: impl Into<String>) -> Self {
        self.model_version = non_empty(version.into());
        self
    }

    pub fn with_azure_blob_sas_key(mut self, sas: impl Into<String>) -> Self {
        self.azure_blob_sas_key = non_empty(sas.into());
        self
    }

    /// Explicit name, or one derived from `from`.
    fn name_or_derive(&self, from: &str) -> String {
        self.model_name
            .clone()
            .unwrap_or_else(|| derive_model_name(from))
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// A routed request: the label to report under and where the model lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPlan {
    pub model_name: String,
    pub source: ModelSource,
}

pub fn route(request: &ScanRequest) -> Result<ScanPlan> {
    let path = request.model_path.as_str();
    if path.is_empty() {
        return Err(TaskError::MissingModelPath);
    }

    if let Some(tag) = &request.community_scan {
        return route_community(request, tag);
    }

    match classify_url(path) {
        UrlKind::ObjectStorage => {
            let (bucket, key) = split_bucket_key(path);
            Ok(ScanPlan {
                model_name: request.name_or_derive(&key),
                source: ModelSource::ObjectStorage { bucket, key },
            })
        }
        UrlKind::CloudBlob(url) => {
            let (container, blob) = split_container_blob(&url);
            let sas_key = request.azure_blob_sas_key.clone();
            Ok(ScanPlan {
                model_name: request.name_or_derive(&blob),
                source: ModelSource::CloudBlob {
                    account_url: account_url(&url, sas_key.as_deref()),
                    container,
                    blob,
                    sas_key,
                },
            })
        }
        UrlKind::Other | UrlKind::NotUrl => route_local(request),
    }
}

fn route_community(request: &ScanRequest, tag: &str) -> Result<ScanPlan> {
    let source: CommunityScanSource = tag.parse()?;
    let version = request
        .model_version
        .clone()
        .or_else(|| source.default_version().map(str::to_string))
        .ok_or(TaskError::MissingModelVersion)?;

    if classify_url(&request.model_path) != UrlKind::NotUrl {
        warn!(
            community_scan = %source,
            "model path looks like a URL; community scan tag takes precedence"
        );
    }

    Ok(ScanPlan {
        model_name: request.name_or_derive(&request.model_path),
        source: ModelSource::Community {
            source,
            location: request.model_path.clone(),
            version,
        },
    })
}

fn route_local(request: &ScanRequest) -> Result<ScanPlan> {
    let path = PathBuf::from(&request.model_path);
    let metadata = std::fs::metadata(&path).map_err(|e| TaskError::fs(&path, e))?;
    let model_name = request.name_or_derive(&request.model_path);
    let source = if metadata.is_dir() {
        ModelSource::LocalFolder { path }
    } else {
        ModelSource::LocalFile { path }
    };
    Ok(ScanPlan { model_name, source })
}

/// Issue the single remote scan call matching the plan.
pub fn dispatch(plan: &ScanPlan, scanner: &mut dyn ModelScanner) -> Result<ScanReport> {
    let name = plan.model_name.as_str();
    info!(model_name = %name, source = plan.source.label(), "starting scan");
    let report = match &plan.source {
        ModelSource::LocalFile { path } => scanner.scan_file(name, path)?,
        ModelSource::LocalFolder { path } => scanner.scan_folder(name, path)?,
        ModelSource::ObjectStorage { bucket, key } => scanner.scan_s3_model(name, bucket, key)?,
        ModelSource::CloudBlob {
            account_url,
            container,
            blob,
            sas_key,
        } => scanner.scan_azure_blob_model(name, account_url, container, blob, sas_key.as_deref())?,
        ModelSource::Community {
            source,
            location,
            version,
        } => scanner.community_scan(name, location, *source, version)?,
    };
    debug!(scan_id = %report.scan_id, status = %report.status, "scan finished");
    Ok(report)
}
