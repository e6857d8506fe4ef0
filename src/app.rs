use std::{sync::Arc, time::Duration};

use anyhow::Result;
use reqwest::Client;
use tokio::{sync::mpsc, time::timeout};

use crate::{
    bridge::{messages::Outbound, BridgeHost, Outbox},
    classifier::RemoteClassifier,
    config::AppConfig,
    context::{system_clock, AppContext, SettingsHandle},
    db::{
        self, cache::ResultCache, settings::SettingsRepository, stats::DailyStatsRepository,
        store::KeyValueStore,
    },
    domain::Settings,
    infrastructure::{directories::ResolvedPaths, shutdown::Shutdown},
    presenter::{BadgePresenter, WarningPresenter},
    redaction::DocumentRedactor,
    tasks::{dispatch::Dispatcher, orchestrator::SiteCheckOrchestrator},
};

pub struct SiteGuardApp {
    _paths: ResolvedPaths,
    bridge: BridgeHost,
    outbound: mpsc::UnboundedReceiver<Outbound>,
    store: KeyValueStore,
    shutdown: Shutdown,
}

impl SiteGuardApp {
    pub async fn initialize(
        config: AppConfig,
        paths: ResolvedPaths,
        shutdown: Shutdown,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let pool = db::init_pool(&paths.db_path).await?;
        let store = KeyValueStore::new(pool);

        let http_client = Client::builder()
            .user_agent(format!("siteguard/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let (outbox, outbound) = Outbox::channel();
        let defaults = Settings::with_endpoint(config.classifier.default_endpoint.clone());
        let ctx = Arc::new(AppContext {
            config: config.clone(),
            settings: SettingsHandle::new(defaults),
            settings_repo: SettingsRepository::new(store.clone()),
            cache: ResultCache::new(store.clone()),
            stats: DailyStatsRepository::new(store.clone(), config.timezone),
            remote: RemoteClassifier::new(http_client.clone()),
            redactor: DocumentRedactor::new(http_client, paths.downloads_dir.clone()),
            badge: BadgePresenter::new(Arc::new(outbox.clone())),
            warning: WarningPresenter::new(Arc::new(outbox.clone())),
            clock: system_clock(),
        });

        if let Err(err) = ctx.reload_settings().await {
            tracing::warn!(
                target: "settings",
                error = %err,
                "could not load stored settings; using defaults"
            );
        }

        let orchestrator = Arc::new(SiteCheckOrchestrator::new(ctx.clone()));
        let dispatcher = Arc::new(Dispatcher::new(ctx, orchestrator));
        let bridge = BridgeHost::new(dispatcher, outbox, config.bridge.max_inbound_bytes);

        Ok(Self {
            _paths: paths,
            bridge,
            outbound,
            store,
            shutdown,
        })
    }

    pub async fn run(self) -> Result<()> {
        let SiteGuardApp {
            _paths: _,
            bridge,
            outbound,
            store,
            shutdown,
        } = self;

        tracing::info!(version = env!("CARGO_PKG_VERSION"), "siteguard native host started");

        let result = bridge
            .serve(
                tokio::io::stdin(),
                tokio::io::stdout(),
                outbound,
                shutdown.subscribe(),
            )
            .await;
        shutdown.trigger();

        let close_timeout = Duration::from_secs(5);
        if timeout(close_timeout, store.close()).await.is_err() {
            tracing::warn!(
                target: "db",
                "store did not close within {:?}",
                close_timeout
            );
        }

        match result {
            Ok(()) => {
                tracing::info!("siteguard native host stopped");
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "bridge stopped with an error");
                Err(err.into())
            }
        }
    }
}
