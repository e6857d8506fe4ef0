use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::{
    bridge::messages::Command,
    classifier::{ClassifyError, HealthStatus},
    context::AppContext,
    domain::{
        extract_host, is_excluded_address, CacheEntry, CheckRequest, DailyStats, Settings, TabId,
        Trigger,
    },
    redaction::{RedactionError, RedactionOutput},
};

use super::orchestrator::{CheckError, CheckOutcome, SiteCheckOrchestrator};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Reply {
    Ack,
    /// The trigger did not qualify for a check (excluded address, sub-frame,
    /// page still loading).
    Skipped,
    Checked(CheckOutcome),
    Settings(Settings),
    SiteStatus(SiteStatus),
    #[serde(rename_all = "camelCase")]
    CacheCleared { removed: u64 },
    Stats(DailyStats),
    Health(HealthStatus),
    Redacted(RedactionOutput),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteStatus {
    pub host: String,
    pub entry: Option<CacheEntry>,
    pub fresh: bool,
    pub age_ms: Option<i64>,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Check(#[from] CheckError),
    #[error(transparent)]
    Redaction(#[from] RedactionError),
    #[error("health check failed: {0}")]
    Health(ClassifyError),
    #[error("invalid settings: {}", .0.join(", "))]
    InvalidSettings(Vec<String>),
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for DispatchError {
    fn from(err: anyhow::Error) -> Self {
        DispatchError::Storage(format!("{err:#}"))
    }
}

/// Single entry point for every message the extension sends.
pub struct Dispatcher {
    ctx: Arc<AppContext>,
    orchestrator: Arc<SiteCheckOrchestrator>,
}

impl Dispatcher {
    pub fn new(ctx: Arc<AppContext>, orchestrator: Arc<SiteCheckOrchestrator>) -> Self {
        Self { ctx, orchestrator }
    }

    pub async fn dispatch(&self, command: Command) -> Result<Reply, DispatchError> {
        match command {
            Command::CheckWebsite { url, tab_id } => {
                self.check(url, tab_id, Trigger::Message).await
            }
            Command::TabUpdated {
                tab_id,
                url,
                status,
            } => {
                if status.as_deref() != Some("complete") {
                    return Ok(Reply::Skipped);
                }
                self.check(url, Some(tab_id), Trigger::TabUpdated).await
            }
            Command::NavigationCompleted {
                tab_id,
                url,
                frame_id,
            } => {
                if frame_id != 0 {
                    return Ok(Reply::Skipped);
                }
                self.check(url, Some(tab_id), Trigger::NavigationCompleted)
                    .await
            }
            Command::TabActivated { tab_id, url } => match url {
                Some(url) => self.check(url, Some(tab_id), Trigger::TabActivated).await,
                None => Ok(Reply::Skipped),
            },
            Command::TabRemoved { tab_id } => {
                self.ctx.warning.forget_tab(tab_id);
                Ok(Reply::Ack)
            }
            Command::DismissWarning { tab_id } => {
                self.ctx.warning.dismiss(tab_id);
                Ok(Reply::Ack)
            }
            Command::SettingsUpdated { settings: notice } => {
                tracing::debug!(
                    target: "dispatch",
                    with_payload = notice.is_some(),
                    "settings changed elsewhere, reloading from store"
                );
                let settings = self.ctx.reload_settings().await?;
                Ok(Reply::Settings((*settings).clone()))
            }
            Command::SaveSettings { settings } => {
                let current = self.ctx.settings.snapshot();
                let (merged, rejected) = Settings::from_stored(&current, settings);
                if !rejected.is_empty() {
                    return Err(DispatchError::InvalidSettings(rejected));
                }
                let saved = self.ctx.save_settings(&merged).await?;
                Ok(Reply::Settings((*saved).clone()))
            }
            Command::GetSettings => Ok(Reply::Settings((*self.ctx.settings.snapshot()).clone())),
            Command::GetSiteStatus { url } => self.site_status(&url).await,
            Command::ClearCache => {
                let removed = self.ctx.cache.clear_results().await?;
                Ok(Reply::CacheCleared { removed })
            }
            Command::GetStats => Ok(Reply::Stats(self.ctx.stats.today(self.ctx.now()).await?)),
            Command::HealthCheck => {
                let settings = self.ctx.settings.snapshot();
                let status = self
                    .ctx
                    .remote
                    .health(&settings)
                    .await
                    .map_err(DispatchError::Health)?;
                Ok(Reply::Health(status))
            }
            Command::RedactDocument { path, kind } => {
                let settings = self.ctx.settings.snapshot();
                let output = self.ctx.redactor.redact(&settings, &path, kind).await?;
                Ok(Reply::Redacted(output))
            }
        }
    }

    async fn check(
        &self,
        url: String,
        tab_id: Option<TabId>,
        trigger: Trigger,
    ) -> Result<Reply, DispatchError> {
        let outcome = self
            .orchestrator
            .check(CheckRequest::new(url, tab_id, trigger))
            .await?;
        Ok(outcome.map_or(Reply::Skipped, Reply::Checked))
    }

    async fn site_status(&self, url: &str) -> Result<Reply, DispatchError> {
        if is_excluded_address(url) {
            return Ok(Reply::Skipped);
        }
        let host = extract_host(url);
        let entry = self.ctx.cache.get(&host).await?;
        let now = self.ctx.now();
        let fresh = entry
            .as_ref()
            .is_some_and(|entry| entry.is_fresh(now, self.ctx.cache_ttl()));
        let age_ms = entry
            .as_ref()
            .map(|entry| entry.age(now).num_milliseconds());
        Ok(Reply::SiteStatus(SiteStatus {
            host,
            entry,
            fresh,
            age_ms,
        }))
    }
}
