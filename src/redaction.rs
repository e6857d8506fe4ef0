use std::path::{Path, PathBuf};

use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{classifier::protocol::service_url, domain::Settings};

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "pdf"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Aadhar,
    Pan,
}

impl DocumentKind {
    fn upload_path(&self) -> &'static str {
        match self {
            DocumentKind::Aadhar => "/mask-document",
            DocumentKind::Pan => "/mask-pan",
        }
    }
}

#[derive(Debug, Error)]
pub enum RedactionError {
    #[error("unsupported file {0}; expected png, jpg, jpeg or pdf")]
    UnsupportedFile(String),
    #[error("cannot derive service address from {0}")]
    InvalidEndpoint(String),
    #[error("redaction rejected: {0}")]
    Rejected(String),
    #[error("redaction service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("file access failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Deserialize)]
struct MaskResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detections: u64,
    #[serde(default)]
    output_file: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactionOutput {
    pub output_path: PathBuf,
    pub detections: u64,
    pub message: String,
}

/// Upload → process → download against the masking endpoints that sit
/// next to the classification endpoint.
pub struct DocumentRedactor {
    http: Client,
    downloads_dir: PathBuf,
}

impl DocumentRedactor {
    pub fn new(http: Client, downloads_dir: PathBuf) -> Self {
        Self {
            http,
            downloads_dir,
        }
    }

    pub async fn redact(
        &self,
        settings: &Settings,
        path: &Path,
        kind: DocumentKind,
    ) -> Result<RedactionOutput, RedactionError> {
        let file_name = accepted_file_name(path)?;
        let upload_url = service_url(&settings.api_endpoint, kind.upload_path())
            .ok_or_else(|| RedactionError::InvalidEndpoint(settings.api_endpoint.clone()))?;

        let bytes = tokio::fs::read(path).await?;
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name.clone()));
        let mut request = self.http.post(&upload_url).multipart(form);
        if let Some(api_key) = settings.api_key() {
            request = request.bearer_auth(api_key);
        }

        tracing::info!(target: "redaction", file = %file_name, kind = ?kind, "uploading document");
        let response = request.send().await?;
        let status = response.status();
        let body: MaskResponse = response.json().await.map_err(|err| {
            RedactionError::Rejected(format!("unreadable reply ({status}): {err}"))
        })?;

        if let Some(error) = body.error {
            return Err(RedactionError::Rejected(error));
        }
        if !status.is_success() || !body.success {
            return Err(RedactionError::Rejected(format!("service answered {status}")));
        }

        let output_name = body
            .output_file
            .as_deref()
            .and_then(|name| Path::new(name).file_name())
            .map(PathBuf::from)
            .ok_or_else(|| RedactionError::Rejected("reply names no output file".into()))?;
        let download_path = body
            .download_url
            .ok_or_else(|| RedactionError::Rejected("reply has no download link".into()))?;
        let download_url = service_url(&settings.api_endpoint, &download_path)
            .ok_or_else(|| RedactionError::InvalidEndpoint(settings.api_endpoint.clone()))?;

        let mut download = self.http.get(&download_url);
        if let Some(api_key) = settings.api_key() {
            download = download.bearer_auth(api_key);
        }
        let processed = download.send().await?.error_for_status()?.bytes().await?;

        tokio::fs::create_dir_all(&self.downloads_dir).await?;
        let output_path = self.downloads_dir.join(output_name);
        tokio::fs::write(&output_path, &processed).await?;

        tracing::info!(
            target: "redaction",
            output = %output_path.display(),
            detections = body.detections,
            "redacted document saved"
        );
        Ok(RedactionOutput {
            output_path,
            detections: body.detections,
            message: body.message.unwrap_or_default(),
        })
    }
}

fn accepted_file_name(path: &Path) -> Result<String, RedactionError> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| RedactionError::UnsupportedFile(path.display().to_string()))?;
    let extension = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(name.to_string()),
        _ => Err(RedactionError::UnsupportedFile(name.to_string())),
    }
}
