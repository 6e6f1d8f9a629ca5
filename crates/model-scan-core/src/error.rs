//! Error taxonomy for a single task invocation.

use std::path::PathBuf;

use thiserror::Error;

/// Broad category an error falls into, used for logging and exit reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Remote,
    FileSystem,
    Unknown,
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Input required: modelPath")]
    MissingModelPath,

    #[error("Unsupported community scan type: {0}")]
    UnsupportedCommunitySource(String),

    #[error("When running a community scan other than a Hugging Face model, you must provide a model version.")]
    MissingModelVersion,

    #[error("The current user does not have permissions to write to {}", .path.display())]
    SarifDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{message} status code: {status} body: {body}")]
    Api {
        message: String,
        status: u16,
        body: String,
    },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("{}: {source}", .path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid SARIF document: {0}")]
    InvalidSarif(#[from] serde_json::Error),

    #[error("Scan {scan_id} finished with status {status}")]
    ScanFailed { scan_id: String, status: String },

    #[error("Timed out waiting for scan {scan_id} to complete")]
    Timeout { scan_id: String },
}

impl TaskError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingModelPath
            | Self::UnsupportedCommunitySource(_)
            | Self::MissingModelVersion
            | Self::SarifDestination { .. } => ErrorKind::Configuration,
            Self::Api { .. } | Self::Transport(_) | Self::ScanFailed { .. } | Self::Timeout { .. } => {
                ErrorKind::Remote
            }
            Self::FileSystem { .. } => ErrorKind::FileSystem,
            Self::InvalidSarif(_) => ErrorKind::Unknown,
        }
    }

    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;
