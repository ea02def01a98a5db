use reqwest::multipart::{Form, Part};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::core::config::MonitorConfig;
use crate::core::models::report::UsageReport;
use crate::core::process;

/// Bound for one upload request, connect included.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

const REPORT_FILE_NAME: &str = "usage.json";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Failed to serialize usage report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Upload request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Upload failed: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The report was empty, so no request was sent.
    NothingToUpload,
    Uploaded { status: u16, days: usize },
}

impl fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NothingToUpload => write!(f, "No data to upload"),
            Self::Uploaded { days, .. } => write!(f, "Uploaded {} days of data", days),
        }
    }
}

/// Descriptive fields sent next to the report.
#[derive(Debug, Clone)]
pub struct UploadMetadata {
    pub hostname: String,
    /// Submission time, Unix seconds.
    pub timestamp: i64,
    pub email: String,
}

impl UploadMetadata {
    pub async fn for_config(config: &MonitorConfig) -> Self {
        Self {
            hostname: resolve_hostname().await,
            timestamp: chrono::Utc::now().timestamp(),
            email: config.email.clone(),
        }
    }
}

pub fn build_client() -> Result<reqwest::Client, UploadError> {
    reqwest::Client::builder()
        .timeout(UPLOAD_TIMEOUT)
        .build()
        .map_err(UploadError::Client)
}

/// Machine name reported to the collector.
pub async fn resolve_hostname() -> String {
    if let Ok(name) = process::run_command("hostname", &[], Duration::from_secs(5)).await {
        if !name.is_empty() {
            return name;
        }
    }
    ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn build_form(report: &UsageReport, meta: &UploadMetadata) -> Result<Form, UploadError> {
    let json = serde_json::to_vec(report)?;
    let file = Part::bytes(json).file_name(REPORT_FILE_NAME);
    Ok(Form::new()
        .part("file", file)
        .text("hostname", meta.hostname.clone())
        .text("timestamp", meta.timestamp.to_string())
        .text("userEmail", meta.email.clone()))
}

/// POST the report as multipart form data. Only 200 and 201 count as accepted.
pub async fn upload(
    client: &reqwest::Client,
    url: &str,
    report: &UsageReport,
    meta: &UploadMetadata,
) -> Result<UploadOutcome, UploadError> {
    if report.is_empty() {
        return Ok(UploadOutcome::NothingToUpload);
    }

    let form = build_form(report, meta)?;
    let response = client
        .post(url)
        .multipart(form)
        .send()
        .await
        .map_err(UploadError::Transport)?;

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    match status {
        200 | 201 => Ok(UploadOutcome::Uploaded {
            status,
            days: report.days(),
        }),
        _ => Err(UploadError::Rejected { status, body }),
    }
}
