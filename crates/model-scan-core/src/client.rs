//! Model scanning service client.
//!
//! Talks to the scan API over blocking HTTP. Credentials are exchanged for a
//! bearer token via the OAuth2 client-credentials flow on first use; empty
//! credentials mean an unauthenticated (self-hosted) deployment.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use reqwest::blocking::{Body, Client, RequestBuilder, Response};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Result, TaskError};
use crate::report::ScanReport;
use crate::source::CommunityScanSource;

pub const DEFAULT_API_URL: &str = "https://api.us.hiddenlayer.ai";
pub const DEFAULT_AUTH_URL: &str = "https://auth.hiddenlayer.ai";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const REQUESTING_ENTITY: &str = "model-scan-pipeline-task";
const SARIF_MEDIA_TYPE: &str = "application/sarif+json";

/// The remote calls a task invocation can make. One scan call per run, plus
/// an optional SARIF fetch for the resulting scan.
pub trait ModelScanner {
    fn scan_file(&mut self, model_name: &str, path: &Path) -> Result<ScanReport>;

    fn scan_folder(&mut self, model_name: &str, path: &Path) -> Result<ScanReport>;

    fn scan_s3_model(&mut self, model_name: &str, bucket: &str, key: &str) -> Result<ScanReport>;

    fn scan_azure_blob_model(
        &mut self,
        model_name: &str,
        account_url: &str,
        container: &str,
        blob: &str,
        sas_key: Option<&str>,
    ) -> Result<ScanReport>;

    fn community_scan(
        &mut self,
        model_name: &str,
        model_path: &str,
        source: CommunityScanSource,
        version: &str,
    ) -> Result<ScanReport>;

    /// Raw SARIF document for a finished scan.
    fn sarif(&mut self, scan_id: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub auth_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ScanHandle {
    scan_id: String,
}

#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    model_name: &'a str,
    model_version: &'a str,
    requesting_entity: &'a str,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct JobRequest {
    pub access: JobAccess,
    pub inventory: JobInventory,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct JobAccess {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sas_key: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct JobInventory {
    pub model_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    pub requested_scan_location: String,
    pub requesting_entity: String,
}

impl JobRequest {
    fn new(source: &str, model_name: &str, location: String) -> Self {
        Self {
            access: JobAccess {
                source: source.to_string(),
                sas_key: None,
            },
            inventory: JobInventory {
                model_name: model_name.to_string(),
                model_version: None,
                requested_scan_location: location,
                requesting_entity: REQUESTING_ENTITY.to_string(),
            },
        }
    }

    pub fn s3(model_name: &str, bucket: &str, key: &str) -> Self {
        Self::new(
            CommunityScanSource::AwsIamRole.as_str(),
            model_name,
            format!("s3://{bucket}/{key}"),
        )
    }

    /// The SAS token travels in `access.sas_key`, never in the location.
    pub fn azure_blob(
        model_name: &str,
        account_url: &str,
        container: &str,
        blob: &str,
        sas_key: Option<&str>,
    ) -> Self {
        let account = account_url.split('?').next().unwrap_or(account_url);
        let mut job = Self::new(
            CommunityScanSource::AzureBlobSas.as_str(),
            model_name,
            format!("{account}/{container}/{blob}"),
        );
        job.access.sas_key = sas_key.filter(|s| !s.is_empty()).map(str::to_string);
        job
    }

    pub fn community(
        model_name: &str,
        model_path: &str,
        source: CommunityScanSource,
        version: &str,
    ) -> Self {
        let mut job = Self::new(source.as_str(), model_name, model_path.to_string());
        job.inventory.model_version = Some(version.to_string());
        job
    }
}

#[derive(Debug)]
pub struct ScanClient {
    config: ClientConfig,
    client: Client,
    token: Option<String>,
}

impl ScanClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        // a single request never outlives the whole scan deadline
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(config.timeout))
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            config,
            client,
            token: None,
        })
    }

    /// Bearer token, fetched once and cached. `None` when no client id is set.
    fn access_token(&mut self) -> Result<Option<String>> {
        if self.config.client_id.is_empty() {
            return Ok(None);
        }
        if let Some(token) = &self.token {
            return Ok(Some(token.clone()));
        }

        let url = format!(
            "{}/oauth2/token?grant_type=client_credentials",
            self.config.auth_url.trim_end_matches('/')
        );
        debug!(%url, "requesting access token");
        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .send()?;
        let token: TokenResponse = check_status(resp, "Authentication failed")?.json()?;
        self.token = Some(token.access_token.clone());
        Ok(Some(token.access_token))
    }

    fn request(&mut self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = api_endpoint(&self.config.api_url, path);
        debug!(%method, %url, "scan api request");
        let builder = self.client.request(method, url);
        Ok(match self.access_token()? {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    fn send_json<T: DeserializeOwned>(builder: RequestBuilder, message: &str) -> Result<T> {
        let resp = check_status(builder.send()?, message)?;
        Ok(resp.json()?)
    }

    fn begin_upload(&mut self, model_name: &str) -> Result<String> {
        let body = UploadRequest {
            model_name,
            model_version: "1",
            requesting_entity: REQUESTING_ENTITY,
        };
        let builder = self.request(Method::POST, "/scan/v3/upload")?.json(&body);
        let handle: ScanHandle = Self::send_json(builder, "Failed to start upload")?;
        debug!(scan_id = %handle.scan_id, "upload started");
        Ok(handle.scan_id)
    }

    fn upload_file(&mut self, scan_id: &str, file_name: &str, path: &Path) -> Result<()> {
        let file = std::fs::File::open(path).map_err(|e| TaskError::fs(path, e))?;
        debug!(%file_name, "uploading");
        let builder = self
            .request(Method::PUT, &format!("/scan/v3/upload/{scan_id}/file"))?
            .query(&[("file_name", file_name)])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::from(file));
        check_status(builder.send()?, "Failed to upload file")?;
        Ok(())
    }

    fn complete_upload(&mut self, scan_id: &str) -> Result<()> {
        let builder = self.request(Method::PATCH, &format!("/scan/v3/upload/{scan_id}"))?;
        check_status(builder.send()?, "Failed to complete upload")?;
        Ok(())
    }

    fn submit_job(&mut self, job: &JobRequest) -> Result<String> {
        info!(
            source = %job.access.source,
            location = %redact_query(&job.inventory.requested_scan_location),
            "submitting scan job"
        );
        let builder = self.request(Method::POST, "/scan/v3/jobs")?.json(job);
        let handle: ScanHandle = Self::send_json(builder, "Failed to submit scan job")?;
        Ok(handle.scan_id)
    }

    fn fetch_results(&mut self, scan_id: &str) -> Result<ScanReport> {
        let builder = self.request(Method::GET, &format!("/scan/v3/results/{scan_id}"))?;
        Self::send_json(builder, "Failed to fetch scan results")
    }

    /// Poll until the scan reaches a terminal status or the timeout elapses.
    fn wait_for_results(&mut self, scan_id: &str) -> Result<ScanReport> {
        let started = Instant::now();
        loop {
            let report = self.fetch_results(scan_id)?;
            match poll_state(&report.status) {
                PollState::Done => return Ok(report),
                PollState::Failed => {
                    return Err(TaskError::ScanFailed {
                        scan_id: scan_id.to_string(),
                        status: report.status,
                    })
                }
                PollState::Pending => debug!(%scan_id, status = %report.status, "scan not finished"),
            }
            if started.elapsed() >= self.config.timeout {
                return Err(TaskError::Timeout {
                    scan_id: scan_id.to_string(),
                });
            }
            std::thread::sleep(self.config.poll_interval);
        }
    }

    fn upload_and_wait(&mut self, model_name: &str, files: &[(String, PathBuf)]) -> Result<ScanReport> {
        let scan_id = self.begin_upload(model_name)?;
        for (name, path) in files {
            self.upload_file(&scan_id, name, path)?;
        }
        self.complete_upload(&scan_id)?;
        info!(%scan_id, files = files.len(), "upload complete, waiting for scan");
        self.wait_for_results(&scan_id)
    }
}

impl ModelScanner for ScanClient {
    fn scan_file(&mut self, model_name: &str, path: &Path) -> Result<ScanReport> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| model_name.to_string());
        self.upload_and_wait(model_name, &[(name, path.to_path_buf())])
    }

    fn scan_folder(&mut self, model_name: &str, path: &Path) -> Result<ScanReport> {
        let files = collect_files(path)?;
        if files.is_empty() {
            warn!(path = %path.display(), "folder contains no files");
        }
        self.upload_and_wait(model_name, &files)
    }

    fn scan_s3_model(&mut self, model_name: &str, bucket: &str, key: &str) -> Result<ScanReport> {
        let scan_id = self.submit_job(&JobRequest::s3(model_name, bucket, key))?;
        self.wait_for_results(&scan_id)
    }

    fn scan_azure_blob_model(
        &mut self,
        model_name: &str,
        account_url: &str,
        container: &str,
        blob: &str,
        sas_key: Option<&str>,
    ) -> Result<ScanReport> {
        let job = JobRequest::azure_blob(model_name, account_url, container, blob, sas_key);
        let scan_id = self.submit_job(&job)?;
        self.wait_for_results(&scan_id)
    }

    fn community_scan(
        &mut self,
        model_name: &str,
        model_path: &str,
        source: CommunityScanSource,
        version: &str,
    ) -> Result<ScanReport> {
        let job = JobRequest::community(model_name, model_path, source, version);
        let scan_id = self.submit_job(&job)?;
        self.wait_for_results(&scan_id)
    }

    fn sarif(&mut self, scan_id: &str) -> Result<String> {
        let builder = self
            .request(Method::GET, &format!("/scan/v3/results/{scan_id}"))?
            .header(reqwest::header::ACCEPT, SARIF_MEDIA_TYPE);
        let resp = check_status(builder.send()?, "Failed to fetch SARIF results")?;
        Ok(resp.text()?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollState {
    Done,
    Failed,
    Pending,
}

fn poll_state(status: &str) -> PollState {
    match status.to_ascii_lowercase().as_str() {
        "done" => PollState::Done,
        "failed" | "canceled" => PollState::Failed,
        _ => PollState::Pending,
    }
}

fn api_endpoint(base: &str, path: &str) -> String {
    format!("{}{path}", base.trim_end_matches('/'))
}

fn check_status(resp: Response, message: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(TaskError::Api {
        message: message.to_string(),
        status: status.as_u16(),
        body,
    })
}

/// Strip the query string so SAS tokens never reach the logs.
fn redact_query(location: &str) -> &str {
    location.split('?').next().unwrap_or(location)
}

/// All regular files under `root`, paired with their `/`-separated name
/// relative to `root`. Symlinks are not followed.
pub fn collect_files(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            TaskError::fs(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((name, entry.into_path()));
    }
    Ok(files)
}
