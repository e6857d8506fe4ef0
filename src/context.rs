use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::{
    classifier::RemoteClassifier,
    config::AppConfig,
    db::{cache::ResultCache, settings::SettingsRepository, stats::DailyStatsRepository},
    domain::Settings,
    presenter::{BadgePresenter, WarningPresenter},
    redaction::DocumentRedactor,
};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Current settings snapshot. Readers clone an `Arc`; a reload swaps in a
/// whole new value so nobody observes a half-applied change.
#[derive(Clone)]
pub struct SettingsHandle {
    sender: Arc<watch::Sender<Arc<Settings>>>,
}

impl SettingsHandle {
    pub fn new(initial: Settings) -> Self {
        let (sender, _) = watch::channel(Arc::new(initial));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn snapshot(&self) -> Arc<Settings> {
        self.sender.borrow().clone()
    }

    pub fn replace(&self, settings: Settings) -> Arc<Settings> {
        let settings = Arc::new(settings);
        self.sender.send_replace(settings.clone());
        settings
    }
}

/// Everything an operation needs, built once at startup and shared.
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub settings: SettingsHandle,
    pub settings_repo: SettingsRepository,
    pub cache: ResultCache,
    pub stats: DailyStatsRepository,
    pub remote: RemoteClassifier,
    pub redactor: DocumentRedactor,
    pub badge: BadgePresenter,
    pub warning: WarningPresenter,
    pub clock: Clock,
}

impl AppContext {
    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub fn cache_ttl(&self) -> Duration {
        self.config.classifier.cache_ttl
    }

    pub fn default_settings(&self) -> Settings {
        Settings::with_endpoint(self.config.classifier.default_endpoint.clone())
    }

    /// Re-reads the synced scope and swaps the snapshot. On a storage
    /// failure the previous snapshot stays in place.
    pub async fn reload_settings(&self) -> Result<Arc<Settings>> {
        let settings = self.settings_repo.load(&self.default_settings()).await?;
        tracing::info!(
            target: "settings",
            endpoint = %settings.api_endpoint,
            show_warnings = settings.show_warnings,
            enable_fallback = settings.enable_fallback,
            "settings loaded"
        );
        Ok(self.settings.replace(settings))
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<Arc<Settings>> {
        self.settings_repo.save(settings).await?;
        self.reload_settings().await
    }
}
