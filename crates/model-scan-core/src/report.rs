//! Scan reports returned by the service and their console summary.

use serde::{Deserialize, Serialize};

use crate::router::ScanPlan;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<ScanSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_scanned: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_with_detections: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_severity: Option<String>,
}

impl ScanReport {
    /// Detections reported for the scan; a missing summary counts as none.
    pub fn detection_count(&self) -> u64 {
        self.summary
            .as_ref()
            .and_then(|s| s.detection_count)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {s}. Use 'text' or 'json'.")),
        }
    }
}

pub fn print_summary(plan: &ScanPlan, report: &ScanReport, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", render_text(plan, report)),
        OutputFormat::Json => println!("{}", render_json(plan, report)),
    }
}

fn render_text(plan: &ScanPlan, report: &ScanReport) -> String {
    let mut out = String::new();
    out.push_str(&"=".repeat(70));
    out.push_str("\nMODEL SCAN RESULTS\n");
    out.push_str(&"=".repeat(70));
    out.push('\n');
    out.push_str(&format!("  Model:       {}\n", plan.model_name));
    out.push_str(&format!("  Source:      {}\n", plan.source.label()));
    out.push_str(&format!("  Scan ID:     {}\n", report.scan_id));
    out.push_str(&format!("  Status:      {}\n", report.status));
    out.push_str(&format!("  Detections:  {}\n", report.detection_count()));
    if let Some(summary) = &report.summary {
        if let Some(files) = summary.files_scanned {
            out.push_str(&format!("  Files:       {files}\n"));
        }
        if let Some(severity) = &summary.highest_severity {
            out.push_str(&format!("  Severity:    {severity}\n"));
        }
    }
    out.push_str(&"=".repeat(70));
    out
}

fn render_json(plan: &ScanPlan, report: &ScanReport) -> String {
    let output = serde_json::json!({
        "model_name": plan.model_name,
        "source": plan.source.label(),
        "scan_id": report.scan_id,
        "status": report.status,
        "detection_count": report.detection_count(),
        "summary": report.summary,
    });
    serde_json::to_string_pretty(&output).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ModelSource;
    use std::path::PathBuf;

    fn plan() -> ScanPlan {
        ScanPlan {
            model_name: "safe_model.pkl".into(),
            source: ModelSource::LocalFile {
                path: PathBuf::from("/models/safe_model.pkl"),
            },
        }
    }

    #[test]
    fn parse_report_with_summary() {
        let report: ScanReport = serde_json::from_value(serde_json::json!({
            "scan_id": "0f1e",
            "status": "done",
            "start_time": "2024-01-01T00:00:00Z",
            "summary": {
                "detection_count": 3,
                "files_scanned": 2,
                "files_with_detections": 1,
                "highest_severity": "critical",
                "severity": "critical"
            }
        }))
        .unwrap();
        assert_eq!(report.scan_id, "0f1e");
        assert_eq!(report.detection_count(), 3);
        assert_eq!(
            report.summary.unwrap().highest_severity.as_deref(),
            Some("critical")
        );
    }

    #[test]
    fn missing_summary_means_zero_detections() {
        let report: ScanReport =
            serde_json::from_value(serde_json::json!({ "scan_id": "x", "status": "done" }))
                .unwrap();
        assert_eq!(report.detection_count(), 0);

        let report: ScanReport = serde_json::from_value(
            serde_json::json!({ "scan_id": "x", "status": "done", "summary": {} }),
        )
        .unwrap();
        assert_eq!(report.detection_count(), 0);
    }

    #[test]
    fn output_format_parses() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("sarif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn text_summary_lists_detections() {
        let report = ScanReport {
            scan_id: "abc".into(),
            status: "done".into(),
            summary: Some(ScanSummary {
                detection_count: Some(2),
                files_scanned: Some(4),
                ..Default::default()
            }),
        };
        let text = render_text(&plan(), &report);
        assert!(text.contains("Model:       safe_model.pkl"));
        assert!(text.contains("Source:      local file"));
        assert!(text.contains("Detections:  2"));
        assert!(text.contains("Files:       4"));
    }

    #[test]
    fn json_summary_fields() {
        let report = ScanReport {
            scan_id: "abc".into(),
            status: "done".into(),
            summary: None,
        };
        let json: serde_json::Value = serde_json::from_str(&render_json(&plan(), &report)).unwrap();
        assert_eq!(json["model_name"], "safe_model.pkl");
        assert_eq!(json["detection_count"], 0);
        assert_eq!(json["summary"], serde_json::Value::Null);
    }
}
