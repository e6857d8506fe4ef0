use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::domain::{ClassificationResult, Settings};

use super::{
    heuristic,
    protocol::{health_url, parse_analyze_body, AnalyzeRequest},
    ClassifyError,
};

#[derive(Clone)]
pub struct RemoteClassifier {
    http: Client,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub healthy: bool,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl RemoteClassifier {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// One outbound request per call. When the service cannot produce a
    /// verdict and fallback is enabled, the offline heuristic answers.
    /// `now` stamps whichever verdict is returned.
    pub async fn classify(
        &self,
        settings: &Settings,
        host: &str,
        address: &str,
        now: DateTime<Utc>,
    ) -> Result<ClassificationResult, ClassifyError> {
        match self.classify_remote(settings, host, address, now).await {
            Ok(result) => Ok(result),
            Err(err) if settings.enable_fallback => {
                tracing::warn!(
                    target: "remote",
                    error = %err,
                    host,
                    "classification service failed; using offline heuristic"
                );
                Ok(heuristic::classify_with_keywords(
                    host,
                    &settings.custom_keywords,
                    now,
                ))
            }
            Err(err) => Err(err),
        }
    }

    pub async fn classify_remote(
        &self,
        settings: &Settings,
        host: &str,
        address: &str,
        now: DateTime<Utc>,
    ) -> Result<ClassificationResult, ClassifyError> {
        let mut request = self
            .http
            .post(&settings.api_endpoint)
            .json(&AnalyzeRequest {
                url: address,
                domain: host,
            });
        if let Some(api_key) = settings.api_key() {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| ClassifyError::RemoteUnavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifyError::RemoteUnavailable(format!(
                "{} answered {status}",
                settings.api_endpoint
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| ClassifyError::RemoteUnavailable(err.to_string()))?;
        let result = parse_analyze_body(&body, now)?;

        tracing::debug!(
            target: "remote",
            host,
            classification = %result.classification,
            confidence = result.confidence,
            "classification service verdict"
        );
        Ok(result)
    }

    pub async fn health(&self, settings: &Settings) -> Result<HealthStatus, ClassifyError> {
        let mut request = self.http.get(health_url(&settings.api_endpoint));
        if let Some(api_key) = settings.api_key() {
            request = request.bearer_auth(api_key);
        }
        let response = request
            .send()
            .await
            .map_err(|err| ClassifyError::RemoteUnavailable(err.to_string()))?;

        let status = response.status();
        let details = response.json::<Value>().await.ok();
        Ok(HealthStatus {
            healthy: status.is_success(),
            status_code: status.as_u16(),
            details,
        })
    }
}
