#[cfg(test)]
pub use fake::{Call, FakeScanner};

#[cfg(test)]
mod fake {
    use std::path::{Path, PathBuf};

    use crate::client::ModelScanner;
    use crate::error::{Result, TaskError};
    use crate::report::{ScanReport, ScanSummary};
    use crate::source::CommunityScanSource;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        File {
            model_name: String,
            path: PathBuf,
        },
        Folder {
            model_name: String,
            path: PathBuf,
        },
        S3 {
            model_name: String,
            bucket: String,
            key: String,
        },
        AzureBlob {
            model_name: String,
            account_url: String,
            container: String,
            blob: String,
            sas_key: Option<String>,
        },
        Community {
            model_name: String,
            model_path: String,
            source: CommunityScanSource,
            version: String,
        },
        Sarif {
            scan_id: String,
        },
    }

    /// Records every call and answers with a canned report.
    #[derive(Debug, Default)]
    pub struct FakeScanner {
        pub calls: Vec<Call>,
        pub report: ScanReport,
        pub sarif: String,
        pub fail_with_status: Option<u16>,
    }

    impl FakeScanner {
        pub fn with_detections(count: u64) -> Self {
            Self {
                report: ScanReport {
                    scan_id: "scan-0001".into(),
                    status: "done".into(),
                    summary: Some(ScanSummary {
                        detection_count: Some(count),
                        ..Default::default()
                    }),
                },
                sarif: r#"{"version":"2.1.0","runs":[{"results":[]}]}"#.into(),
                ..Default::default()
            }
        }

        pub fn with_sarif(mut self, sarif: impl Into<String>) -> Self {
            self.sarif = sarif.into();
            self
        }

        pub fn failing(status: u16) -> Self {
            Self {
                fail_with_status: Some(status),
                ..Self::with_detections(0)
            }
        }

        fn answer(&mut self, call: Call) -> Result<ScanReport> {
            self.calls.push(call);
            match self.fail_with_status {
                Some(status) => Err(TaskError::Api {
                    message: "Request failed".into(),
                    status,
                    body: r#"{"detail":"boom"}"#.into(),
                }),
                None => Ok(self.report.clone()),
            }
        }
    }

    impl ModelScanner for FakeScanner {
        fn scan_file(&mut self, model_name: &str, path: &Path) -> Result<ScanReport> {
            self.answer(Call::File {
                model_name: model_name.into(),
                path: path.into(),
            })
        }

        fn scan_folder(&mut self, model_name: &str, path: &Path) -> Result<ScanReport> {
            self.answer(Call::Folder {
                model_name: model_name.into(),
                path: path.into(),
            })
        }

        fn scan_s3_model(&mut self, model_name: &str, bucket: &str, key: &str) -> Result<ScanReport> {
            self.answer(Call::S3 {
                model_name: model_name.into(),
                bucket: bucket.into(),
                key: key.into(),
            })
        }

        fn scan_azure_blob_model(
            &mut self,
            model_name: &str,
            account_url: &str,
            container: &str,
            blob: &str,
            sas_key: Option<&str>,
        ) -> Result<ScanReport> {
            self.answer(Call::AzureBlob {
                model_name: model_name.into(),
                account_url: account_url.into(),
                container: container.into(),
                blob: blob.into(),
                sas_key: sas_key.map(str::to_string),
            })
        }

        fn community_scan(
            &mut self,
            model_name: &str,
            model_path: &str,
            source: CommunityScanSource,
            version: &str,
        ) -> Result<ScanReport> {
            self.answer(Call::Community {
                model_name: model_name.into(),
                model_path: model_path.into(),
                source,
                version: version.into(),
            })
        }

        fn sarif(&mut self, scan_id: &str) -> Result<String> {
            self.calls.push(Call::Sarif {
                scan_id: scan_id.into(),
            });
            Ok(self.sarif.clone())
        }
    }
}
