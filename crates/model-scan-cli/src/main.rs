//! Model scan pipeline task.
//!
//! Every input can be given as a flag or through the `INPUT_*` environment
//! variables the pipeline agent sets for task inputs.
//!
//! Usage:
//!   model-scan --model-path /models/model.pkl --fail-on-detections
//!   model-scan --model-path s3://bucket/path/to/model.bin --sarif-file results/model.sarif
//!   model-scan --model-path org/repo --community-scan HUGGING_FACE

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::builder::BoolishValueParser;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use model_scan_core::client::{ClientConfig, DEFAULT_API_URL, DEFAULT_AUTH_URL};
use model_scan_core::pipeline::{exit_code, report_result};
use model_scan_core::report::OutputFormat;
use model_scan_core::{run, ScanRequest, TaskConfig};

#[derive(Parser, Debug)]
#[command(name = "model-scan")]
#[command(version)]
#[command(about = "Scan ML models for malware and unsafe code in CI/CD pipelines")]
struct Cli {
    /// Local file or folder, s3:// URI, Azure Blob URL, or registry identifier
    // absent is reported as a task failure, not a usage error
    #[arg(long, env = "INPUT_MODELPATH")]
    model_path: Option<String>,

    /// Name to report the model under (derived from the path when omitted)
    #[arg(long, env = "INPUT_MODELNAME")]
    model_name: Option<String>,

    /// Scan service base URL
    #[arg(long, env = "INPUT_APIURL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// OAuth token endpoint base URL
    #[arg(long, env = "INPUT_AUTHURL", default_value = DEFAULT_AUTH_URL)]
    auth_url: String,

    /// Scan service client id
    #[arg(long, env = "INPUT_HLCLIENTID", default_value = "")]
    client_id: String,

    /// Scan service client secret
    #[arg(long, env = "INPUT_HLCLIENTSECRET", default_value = "", hide_env_values = true)]
    client_secret: String,

    /// Fail the task when any detection is reported
    #[arg(
        long,
        env = "INPUT_FAILONDETECTIONS",
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    fail_on_detections: Option<bool>,

    #[arg(
        long,
        env = "INPUT_FAILONDETECTION",
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_missing_value = "true",
        hide = true
    )]
    fail_on_detection: Option<bool>,

    /// Write normalised SARIF results to this file
    #[arg(long, env = "INPUT_SARIFFILE")]
    sarif_file: Option<PathBuf>,

    /// Community scan source (HUGGING_FACE, AWS_PRESIGNED, AZURE_BLOB_SAS, ...)
    #[arg(long, env = "INPUT_COMMUNITYSCAN")]
    community_scan: Option<String>,

    /// Model version or git ref for community scans
    #[arg(long, env = "INPUT_MODELVERSION")]
    model_version: Option<String>,

    /// SAS token for Azure Blob Storage models
    #[arg(long, env = "INPUT_AZUREBLOBSASKEY", hide_env_values = true)]
    azure_blob_sas_key: Option<String>,

    /// Seconds between scan status checks
    #[arg(long, default_value = "5")]
    poll_interval: u64,

    /// Seconds to wait for a scan to finish
    #[arg(long, default_value = "1800")]
    timeout: u64,

    /// Summary format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn task_config(&self) -> TaskConfig {
        let mut request = ScanRequest::new(self.model_path.as_deref().unwrap_or_default().trim());
        if let Some(name) = &self.model_name {
            request = request.with_model_name(name.as_str());
        }
        if let Some(tag) = &self.community_scan {
            request = request.with_community_scan(tag.as_str());
        }
        if let Some(version) = &self.model_version {
            request = request.with_model_version(version.as_str());
        }
        if let Some(sas) = &self.azure_blob_sas_key {
            request = request.with_azure_blob_sas_key(sas.as_str());
        }

        TaskConfig {
            request,
            client: ClientConfig {
                api_url: self.api_url.clone(),
                auth_url: self.auth_url.clone(),
                client_id: self.client_id.clone(),
                client_secret: self.client_secret.clone(),
                poll_interval: Duration::from_secs(self.poll_interval),
                timeout: Duration::from_secs(self.timeout),
            },
            fail_on_detection: self
                .fail_on_detections
                .or(self.fail_on_detection)
                .unwrap_or(false),
            sarif_file: self.sarif_file.clone().filter(|p| !p.as_os_str().is_empty()),
            format: self.format,
        }
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("failed to initialise logging: {e:#}");
    }

    let config = cli.task_config();
    debug!(
        api_url = %config.client.api_url,
        fail_on_detection = config.fail_on_detection,
        "task configured"
    );

    let result = run(&config);

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = report_result(&mut stdout, &result) {
        eprintln!("failed to report task result: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::from(exit_code(result.status))
}
