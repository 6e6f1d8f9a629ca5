//! Model location classification.
//!
//! A model path is either a URI naming remote storage (S3 or Azure Blob
//! Storage), a registry identifier for a community scan, or a local file
//! system path. Anything that does not parse as an absolute URI is local.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;
use url::Url;

use crate::error::TaskError;

/// Host suffix identifying Azure Blob Storage accounts.
pub const BLOB_HOST_SUFFIX: &str = "blob.core.windows.net";

/// Label used when no segment of the model path can serve as a name.
pub const FALLBACK_MODEL_NAME: &str = "model";

/// Registry / access method for a community scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommunityScanSource {
    HuggingFace,
    AwsPresigned,
    AzureBlobSas,
    AwsIamRole,
    AzureBlobAd,
    GoogleSigned,
    GoogleOauth,
}

impl CommunityScanSource {
    pub const ALL: [CommunityScanSource; 7] = [
        Self::HuggingFace,
        Self::AwsPresigned,
        Self::AzureBlobSas,
        Self::AwsIamRole,
        Self::AzureBlobAd,
        Self::GoogleSigned,
        Self::GoogleOauth,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::HuggingFace => "HUGGING_FACE",
            Self::AwsPresigned => "AWS_PRESIGNED",
            Self::AzureBlobSas => "AZURE_BLOB_SAS",
            Self::AwsIamRole => "AWS_IAM_ROLE",
            Self::AzureBlobAd => "AZURE_BLOB_AD",
            Self::GoogleSigned => "GOOGLE_SIGNED",
            Self::GoogleOauth => "GOOGLE_OAUTH",
        }
    }

    /// Version used when none is given. Only the Hugging Face hub has one.
    pub fn default_version(self) -> Option<&'static str> {
        match self {
            Self::HuggingFace => Some("main"),
            _ => None,
        }
    }
}

impl fmt::Display for CommunityScanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommunityScanSource {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| TaskError::UnsupportedCommunitySource(s.to_string()))
    }
}

/// Where the model comes from. Exactly one variant per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    LocalFile {
        path: PathBuf,
    },
    LocalFolder {
        path: PathBuf,
    },
    ObjectStorage {
        bucket: String,
        key: String,
    },
    CloudBlob {
        account_url: String,
        container: String,
        blob: String,
        sas_key: Option<String>,
    },
    Community {
        source: CommunityScanSource,
        location: String,
        version: String,
    },
}

impl ModelSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::LocalFile { .. } => "local file",
            Self::LocalFolder { .. } => "local folder",
            Self::ObjectStorage { .. } => "s3",
            Self::CloudBlob { .. } => "azure blob",
            Self::Community { .. } => "community",
        }
    }
}

/// Result of looking at a model path as a URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlKind {
    ObjectStorage,
    CloudBlob(Url),
    Other,
    NotUrl,
}

pub fn is_valid_url(s: &str) -> bool {
    Url::parse(s).is_ok()
}

pub fn classify_url(path: &str) -> UrlKind {
    let Ok(url) = Url::parse(path) else {
        return UrlKind::NotUrl;
    };
    match url.scheme() {
        "s3" => UrlKind::ObjectStorage,
        "https"
            if url
                .host_str()
                .is_some_and(|host| host.ends_with(BLOB_HOST_SUFFIX)) =>
        {
            UrlKind::CloudBlob(url)
        }
        _ => UrlKind::Other,
    }
}

/// Last non-empty `/`-separated segment, ignoring one trailing separator.
pub fn derive_model_name(path: &str) -> String {
    let mut segments: Vec<&str> = path.split('/').collect();
    if segments.last() == Some(&"") {
        segments.pop();
    }
    match segments.pop() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => FALLBACK_MODEL_NAME.to_string(),
    }
}

/// Split `s3://bucket/some/key` into `("bucket", "some/key")`.
pub fn split_bucket_key(path: &str) -> (String, String) {
    let rest = path.get(3..).unwrap_or_default();
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    match rest.split_once('/') {
        Some((bucket, key)) => (bucket.to_string(), key.to_string()),
        None => (rest.to_string(), String::new()),
    }
}

/// Split a blob URL path into container (first segment) and blob (the rest).
pub fn split_container_blob(url: &Url) -> (String, String) {
    let path = url.path().strip_prefix('/').unwrap_or(url.path());
    match path.split_once('/') {
        Some((container, blob)) => (container.to_string(), blob.to_string()),
        None => (path.to_string(), String::new()),
    }
}

/// `scheme://host`, with the SAS token appended as the query when given.
pub fn account_url(url: &Url, sas_key: Option<&str>) -> String {
    let base = format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default());
    match sas_key.map(|sas| sas.trim_start_matches('?')) {
        Some(sas) if !sas.is_empty() => format!("{base}?{sas}"),
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_name_from_file_path() {
        assert_eq!(derive_model_name("/models/safe_model.pkl"), "safe_model.pkl");
        assert_eq!(derive_model_name("org/repo"), "repo");
    }

    #[test]
    fn derive_name_drops_one_trailing_separator() {
        assert_eq!(derive_model_name("a/b/"), "b");
        assert_eq!(derive_model_name("/tmp/models/"), "models");
    }

    #[test]
    fn derive_name_falls_back() {
        assert_eq!(derive_model_name(""), "model");
        assert_eq!(derive_model_name("/"), "model");
        // only one trailing empty segment is dropped
        assert_eq!(derive_model_name("a//"), "model");
    }

    #[test]
    fn derive_name_without_separator() {
        assert_eq!(derive_model_name("model.safetensors"), "model.safetensors");
    }

    #[test]
    fn classify_object_storage() {
        assert_eq!(
            classify_url("s3://bucket/path/to/model.bin"),
            UrlKind::ObjectStorage
        );
    }

    #[test]
    fn classify_cloud_blob() {
        let kind = classify_url("https://acct.blob.core.windows.net/models/m.bin");
        assert!(matches!(kind, UrlKind::CloudBlob(_)));
    }

    #[test]
    fn classify_other_url_and_local_paths() {
        assert_eq!(classify_url("https://example.com/m.bin"), UrlKind::Other);
        assert_eq!(classify_url("http://acct.blob.core.windows.net/c/b"), UrlKind::Other);
        assert_eq!(classify_url("/models/safe_model.pkl"), UrlKind::NotUrl);
        assert_eq!(classify_url("models/safe_model.pkl"), UrlKind::NotUrl);
        assert_eq!(classify_url("org/repo"), UrlKind::NotUrl);
        assert_eq!(classify_url(""), UrlKind::NotUrl);
    }

    #[test]
    fn is_valid_url_never_panics() {
        assert!(is_valid_url("file:///tmp/a"));
        assert!(!is_valid_url("not a url"));
        assert!(!is_valid_url("://"));
    }

    #[test]
    fn split_s3_path() {
        let (bucket, key) = split_bucket_key("s3://bucket/path/to/model.bin");
        assert_eq!(bucket, "bucket");
        assert_eq!(key, "path/to/model.bin");
    }

    #[test]
    fn split_s3_bucket_only() {
        let (bucket, key) = split_bucket_key("s3://bucket");
        assert_eq!(bucket, "bucket");
        assert_eq!(key, "");
    }

    #[test]
    fn split_blob_url() {
        let url = Url::parse("https://acct.blob.core.windows.net/azureml/dir/model.bin").unwrap();
        let (container, blob) = split_container_blob(&url);
        assert_eq!(container, "azureml");
        assert_eq!(blob, "dir/model.bin");
    }

    #[test]
    fn account_url_with_and_without_sas() {
        let url = Url::parse("https://acct.blob.core.windows.net/azureml/model.bin").unwrap();
        assert_eq!(account_url(&url, None), "https://acct.blob.core.windows.net");
        assert_eq!(account_url(&url, Some("")), "https://acct.blob.core.windows.net");
        assert_eq!(
            account_url(&url, Some("sv=2022&sig=abc")),
            "https://acct.blob.core.windows.net?sv=2022&sig=abc"
        );
        assert_eq!(
            account_url(&url, Some("?sv=2022")),
            "https://acct.blob.core.windows.net?sv=2022"
        );
    }

    #[test]
    fn community_source_parses_known_tags() {
        for source in CommunityScanSource::ALL {
            assert_eq!(source.as_str().parse::<CommunityScanSource>().unwrap(), source);
        }
    }

    #[test]
    fn community_source_rejects_unknown_tag() {
        let err = "hugging_face".parse::<CommunityScanSource>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported community scan type: hugging_face");
    }

    #[test]
    fn only_hugging_face_has_default_version() {
        for source in CommunityScanSource::ALL {
            let expected = (source == CommunityScanSource::HuggingFace).then_some("main");
            assert_eq!(source.default_version(), expected);
        }
    }
}
