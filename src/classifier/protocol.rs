use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::{verdict_time, ClassificationResult};

use super::ClassifyError;

#[derive(Debug, Serialize)]
pub struct AnalyzeRequest<'a> {
    pub url: &'a str,
    pub domain: &'a str,
}

/// Body of a successful `/analyze` reply. Every field except `reason` is
/// required; a reply missing one is rejected rather than defaulted.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub is_government: bool,
    pub confidence: f64,
    pub is_unsafe: bool,
    pub classification: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl AnalyzeResponse {
    pub fn into_result(
        self,
        received_at: DateTime<Utc>,
    ) -> Result<ClassificationResult, ClassifyError> {
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(ClassifyError::MalformedResponse(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }
        let reason = self
            .reason
            .filter(|reason| !reason.trim().is_empty())
            .unwrap_or_else(|| self.classification.clone());
        Ok(ClassificationResult {
            is_government: self.is_government,
            confidence: self.confidence,
            is_unsafe: self.is_unsafe,
            classification: self.classification,
            reason,
            timestamp: verdict_time(received_at),
        })
    }
}

pub fn parse_analyze_body(
    body: &[u8],
    received_at: DateTime<Utc>,
) -> Result<ClassificationResult, ClassifyError> {
    let response: AnalyzeResponse = serde_json::from_slice(body)
        .map_err(|err| ClassifyError::MalformedResponse(err.to_string()))?;
    response.into_result(received_at)
}

/// `GET` target for the readiness check: `/analyze` swapped for `/health`.
pub fn health_url(endpoint: &str) -> String {
    if endpoint.contains("/analyze") {
        return endpoint.replacen("/analyze", "/health", 1);
    }
    service_url(endpoint, "/health")
        .unwrap_or_else(|| format!("{}/health", endpoint.trim_end_matches('/')))
}

/// Resolves an absolute path (e.g. `/mask-pan`) against the endpoint origin.
pub fn service_url(endpoint: &str, path: &str) -> Option<String> {
    let base = Url::parse(endpoint).ok()?;
    base.join(path).ok().map(String::from)
}
