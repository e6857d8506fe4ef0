use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{TimeDelta, Utc};
use parking_lot::Mutex;
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::{net::TcpListener, sync::mpsc};

use crate::{
    bridge::{codec::MAX_INBOUND_FRAME, messages::Outbound, Outbox},
    classifier::RemoteClassifier,
    config::{
        env::{BridgeConfig, LoggingConfig},
        AppConfig, ClassifierConfig, DirectoryConfig,
    },
    context::{AppContext, Clock, SettingsHandle},
    db::{
        cache::ResultCache, init_pool, settings::SettingsRepository, stats::DailyStatsRepository,
        store::KeyValueStore,
    },
    domain::{Settings, TabId, CACHE_TTL},
    presenter::{
        Badge, BadgePresenter, BadgeSurface, Banner, BannerSurface, WarningPresenter,
    },
    redaction::DocumentRedactor,
    tasks::{dispatch::Dispatcher, orchestrator::SiteCheckOrchestrator},
};

pub async fn temp_store() -> (TempDir, KeyValueStore) {
    let dir = tempfile::tempdir().expect("temp dir");
    let pool = init_pool(&dir.path().join("siteguard-test.db"))
        .await
        .expect("sqlite pool");
    (dir, KeyValueStore::new(pool))
}

/// An `/analyze` address nothing listens on.
pub async fn unreachable_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}/analyze")
}

#[derive(Default)]
pub struct RecordingSurface {
    badges: Mutex<Vec<(TabId, Badge)>>,
    banners: Mutex<Vec<Banner>>,
    removals: Mutex<Vec<(TabId, u64)>>,
}

impl RecordingSurface {
    pub fn badge(&self, tab_id: TabId) -> Option<Badge> {
        self.badges
            .lock()
            .iter()
            .rev()
            .find(|(tab, _)| *tab == tab_id)
            .map(|(_, badge)| badge.clone())
    }

    pub fn badge_updates(&self, tab_id: TabId) -> usize {
        self.badges.lock().iter().filter(|(tab, _)| *tab == tab_id).count()
    }

    pub fn banners(&self) -> Vec<Banner> {
        self.banners.lock().clone()
    }

    pub fn removals(&self) -> Vec<(TabId, u64)> {
        self.removals.lock().clone()
    }
}

impl BadgeSurface for RecordingSurface {
    fn set_badge(&self, tab_id: TabId, badge: &Badge) {
        self.badges.lock().push((tab_id, badge.clone()));
    }
}

impl BannerSurface for RecordingSurface {
    fn show_banner(&self, banner: &Banner) {
        self.banners.lock().push(banner.clone());
    }

    fn remove_banner(&self, tab_id: TabId, banner_id: u64) {
        self.removals.lock().push((tab_id, banner_id));
    }
}

pub struct TestContext {
    _dir: TempDir,
    pub ctx: Arc<AppContext>,
    pub store: KeyValueStore,
    pub surface: Arc<RecordingSurface>,
    offset: Arc<Mutex<TimeDelta>>,
    outbox: Mutex<Option<(Outbox, mpsc::UnboundedReceiver<Outbound>)>>,
}

impl TestContext {
    pub async fn new(endpoint: &str) -> Self {
        let surface = Arc::new(RecordingSurface::default());
        Self::build(endpoint, surface.clone(), surface.clone(), surface, None).await
    }

    /// Presenters write to a bridge outbox instead of a recorder.
    pub async fn with_outbox(endpoint: &str) -> Self {
        let (outbox, receiver) = Outbox::channel();
        let badges = Arc::new(outbox.clone());
        let banners = Arc::new(outbox.clone());
        Self::build(
            endpoint,
            badges,
            banners,
            Arc::new(RecordingSurface::default()),
            Some((outbox, receiver)),
        )
        .await
    }

    async fn build(
        endpoint: &str,
        badges: Arc<dyn BadgeSurface>,
        banners: Arc<dyn BannerSurface>,
        surface: Arc<RecordingSurface>,
        outbox: Option<(Outbox, mpsc::UnboundedReceiver<Outbound>)>,
    ) -> Self {
        let (dir, store) = temp_store().await;
        let config = AppConfig {
            directories: DirectoryConfig {
                logs_dir: dir.path().join("logs").display().to_string(),
                data_dir: dir.path().display().to_string(),
                downloads_dir: dir.path().join("downloads").display().to_string(),
                db_filename: "siteguard-test.db".into(),
            },
            logging: LoggingConfig {
                level: "debug".into(),
            },
            timezone: chrono_tz::UTC,
            classifier: ClassifierConfig {
                default_endpoint: endpoint.to_string(),
                cache_ttl: CACHE_TTL,
            },
            bridge: BridgeConfig {
                max_inbound_bytes: MAX_INBOUND_FRAME,
            },
        };

        let offset = Arc::new(Mutex::new(TimeDelta::zero()));
        let clock: Clock = {
            let offset = offset.clone();
            Arc::new(move || Utc::now() + *offset.lock())
        };

        let http = Client::new();
        let ctx = Arc::new(AppContext {
            config: Arc::new(config),
            settings: SettingsHandle::new(Settings::with_endpoint(endpoint)),
            settings_repo: SettingsRepository::new(store.clone()),
            cache: ResultCache::new(store.clone()),
            stats: DailyStatsRepository::new(store.clone(), chrono_tz::UTC),
            remote: RemoteClassifier::new(http.clone()),
            redactor: DocumentRedactor::new(http, dir.path().join("downloads")),
            badge: BadgePresenter::new(badges),
            warning: WarningPresenter::new(banners),
            clock,
        });

        Self {
            _dir: dir,
            ctx,
            store,
            surface,
            offset,
            outbox: Mutex::new(outbox),
        }
    }

    pub fn advance_clock(&self, by: TimeDelta) {
        *self.offset.lock() += by;
    }

    pub fn orchestrator(&self) -> Arc<SiteCheckOrchestrator> {
        Arc::new(SiteCheckOrchestrator::new(self.ctx.clone()))
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.ctx.clone(), self.orchestrator())
    }

    pub fn take_outbox(&self) -> (Outbox, mpsc::UnboundedReceiver<Outbound>) {
        self.outbox
            .lock()
            .take()
            .expect("context was built with an outbox")
    }
}

/// Stand-in for the classification and masking service.
pub struct MockService {
    addr: SocketAddr,
    state: Arc<MockState>,
}

struct MockState {
    reply: Mutex<(StatusCode, Value)>,
    delay: Mutex<Duration>,
    analyze_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    last_body: Mutex<Option<Value>>,
    last_authorization: Mutex<Option<String>>,
    uploads: Mutex<Vec<Vec<u8>>>,
}

impl MockService {
    pub async fn start() -> Self {
        let state = Arc::new(MockState {
            reply: Mutex::new((
                StatusCode::OK,
                json!({
                    "isGovernment": false,
                    "confidence": 0.5,
                    "isUnsafe": false,
                    "classification": "commercial",
                }),
            )),
            delay: Mutex::new(Duration::ZERO),
            analyze_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            last_body: Mutex::new(None),
            last_authorization: Mutex::new(None),
            uploads: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/analyze", post(analyze))
            .route("/health", get(health))
            .route("/mask-document", post(mask_document))
            .route("/mask-pan", post(mask_pan))
            .route("/download/:name", get(download))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock");
        let addr = listener.local_addr().expect("mock addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self { addr, state }
    }

    pub fn analyze_endpoint(&self) -> String {
        format!("http://{}/analyze", self.addr)
    }

    pub fn reply_with(&self, status: StatusCode, body: Value) {
        *self.state.reply.lock() = (status, body);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.state.delay.lock() = delay;
    }

    pub fn analyze_calls(&self) -> usize {
        self.state.analyze_calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_analyze(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn last_analyze_body(&self) -> Option<Value> {
        self.state.last_body.lock().clone()
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.state.last_authorization.lock().clone()
    }

    pub fn uploads_contain(&self, needle: &str) -> bool {
        self.state
            .uploads
            .lock()
            .iter()
            .any(|body| String::from_utf8_lossy(body).contains(needle))
    }
}

async fn analyze(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.analyze_calls.fetch_add(1, Ordering::SeqCst);
    let current = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(current, Ordering::SeqCst);
    *state.last_body.lock() = Some(body);
    *state.last_authorization.lock() = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(String::from);

    let delay = *state.delay.lock();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    state.in_flight.fetch_sub(1, Ordering::SeqCst);

    let (status, body) = state.reply.lock().clone();
    (status, Json(body))
}

async fn health() -> Json<Value> {
    Json(json!({"status": "running", "services": {"ml_model_loaded": true}}))
}

async fn mask_document(
    State(state): State<Arc<MockState>>,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    mask(state, body, "aadhar")
}

async fn mask_pan(
    State(state): State<Arc<MockState>>,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    mask(state, body, "pan")
}

fn mask(state: Arc<MockState>, body: Bytes, kind: &str) -> (StatusCode, Json<Value>) {
    state.uploads.lock().push(body.to_vec());
    let text = String::from_utf8_lossy(&body);
    let Some(file_name) = text
        .split("filename=\"")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .map(String::from)
    else {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "No file uploaded"})));
    };
    if file_name.starts_with("unreadable") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Could not read image file"})),
        );
    }

    let (stem, is_pdf) = match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem.to_string(), ext.eq_ignore_ascii_case("pdf")),
        None => (file_name.clone(), false),
    };
    let output = format!("{stem}_{kind}_masked.{}", if is_pdf { "pdf" } else { "jpg" });
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "masked successfully! 2 PII regions detected and masked.",
            "detections": 2,
            "output_file": output,
            "download_url": format!("/download/{output}"),
        })),
    )
}

async fn download(Path(name): Path<String>) -> Vec<u8> {
    format!("masked:{name}").into_bytes()
}
