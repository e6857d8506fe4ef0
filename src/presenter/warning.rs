use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::Mutex;
use serde::Serialize;

use crate::domain::{ClassificationResult, Settings, TabId};

use super::BannerSurface;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub tab_id: TabId,
    pub banner_id: u64,
    pub host: String,
    pub classification: String,
    pub confidence_percent: u8,
    pub reason: String,
    /// 0 means the banner stays until dismissed.
    pub auto_dismiss_ms: u64,
}

/// At most one banner per tab. The dismiss control and the auto-dismiss
/// timer both end in [`WarningPresenter::remove_banner`], which ignores
/// banners that are already gone.
#[derive(Clone)]
pub struct WarningPresenter {
    inner: Arc<Inner>,
}

struct Inner {
    surface: Arc<dyn BannerSurface>,
    active: Mutex<HashMap<TabId, u64>>,
    next_id: AtomicU64,
}

impl WarningPresenter {
    pub fn new(surface: Arc<dyn BannerSurface>) -> Self {
        Self {
            inner: Arc::new(Inner {
                surface,
                active: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn present(
        &self,
        tab_id: TabId,
        host: &str,
        result: &ClassificationResult,
        settings: &Settings,
    ) -> u64 {
        let banner_id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let previous = self.inner.active.lock().insert(tab_id, banner_id);
        if let Some(previous) = previous {
            self.inner.surface.remove_banner(tab_id, previous);
        }

        let auto_dismiss = settings.auto_dismiss();
        let banner = Banner {
            tab_id,
            banner_id,
            host: host.to_string(),
            classification: result.classification.clone(),
            confidence_percent: result.confidence_percent(),
            reason: result.reason.clone(),
            auto_dismiss_ms: auto_dismiss.map_or(0, |delay| delay.as_millis() as u64),
        };
        self.inner.surface.show_banner(&banner);
        tracing::debug!(target: "warning", tab_id, banner_id, host, "banner shown");

        if let Some(delay) = auto_dismiss {
            self.schedule_removal(tab_id, banner_id, delay);
        }
        banner_id
    }

    /// Dismiss control: removes whatever banner the tab currently shows.
    pub fn dismiss(&self, tab_id: TabId) -> bool {
        let current = self.inner.active.lock().get(&tab_id).copied();
        match current {
            Some(banner_id) => self.remove_banner(tab_id, banner_id),
            None => false,
        }
    }

    /// Removes `banner_id` if it is still the tab's banner.
    pub fn remove_banner(&self, tab_id: TabId, banner_id: u64) -> bool {
        let removed = {
            let mut active = self.inner.active.lock();
            if active.get(&tab_id) == Some(&banner_id) {
                active.remove(&tab_id);
                true
            } else {
                false
            }
        };
        if removed {
            self.inner.surface.remove_banner(tab_id, banner_id);
            tracing::debug!(target: "warning", tab_id, banner_id, "banner removed");
        }
        removed
    }

    /// The tab is gone; drop its state without touching the page.
    pub fn forget_tab(&self, tab_id: TabId) {
        self.inner.active.lock().remove(&tab_id);
    }

    pub fn active_banner(&self, tab_id: TabId) -> Option<u64> {
        self.inner.active.lock().get(&tab_id).copied()
    }

    fn schedule_removal(&self, tab_id: TabId, banner_id: u64, delay: Duration) {
        let presenter = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            presenter.remove_banner(tab_id, banner_id);
        });
    }
}
