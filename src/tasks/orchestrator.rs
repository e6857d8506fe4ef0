use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use thiserror::Error;

use crate::{
    classifier::ClassifyError,
    context::AppContext,
    domain::{
        extract_host, is_excluded_address, CheckRequest, ClassificationResult, Settings, TabId,
    },
};

use super::inflight::{Admission, InFlightChecks};

/// `Ok(None)` means the address was filtered out before any work.
pub type CheckResult = Result<Option<CheckOutcome>, CheckError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum VerdictSource {
    Cache,
    Classified,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub host: String,
    pub result: ClassificationResult,
    pub source: VerdictSource,
    pub low_confidence: bool,
    pub warned: bool,
}

#[derive(Debug, Clone, Error)]
pub enum CheckError {
    #[error(transparent)]
    Classify(#[from] ClassifyError),
}

pub struct SiteCheckOrchestrator {
    ctx: Arc<AppContext>,
    in_flight: InFlightChecks,
}

impl SiteCheckOrchestrator {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self {
            ctx,
            in_flight: InFlightChecks::default(),
        }
    }

    pub async fn check(self: &Arc<Self>, request: CheckRequest) -> CheckResult {
        if is_excluded_address(&request.address) {
            tracing::trace!(
                target: "orchestrator",
                address = %request.address,
                trigger = request.trigger.label(),
                "address excluded from checks"
            );
            return Ok(None);
        }

        let host = extract_host(&request.address);
        let Some(tab_id) = request.tab_id else {
            return self.run_check(request, host).await;
        };

        let admission = self.in_flight.admit(tab_id, &host, |previous, generation| {
            let this = self.clone();
            let host = host.clone();
            async move {
                if let Some(previous) = previous {
                    let _ = previous.await;
                }
                let outcome = this.run_check(request, host).await;
                this.in_flight.release(tab_id, generation);
                outcome
            }
            .boxed()
            .shared()
        });

        match admission {
            Admission::Join(pending) => {
                tracing::debug!(
                    target: "orchestrator",
                    tab_id,
                    host = %host,
                    "joined pending check"
                );
                pending.await
            }
            Admission::Start(check) => check.await,
        }
    }

    pub fn pending_host(&self, tab_id: TabId) -> Option<String> {
        self.in_flight.pending_host(tab_id)
    }

    async fn run_check(&self, request: CheckRequest, host: String) -> CheckResult {
        let settings = self.ctx.settings.snapshot();

        if settings.cache_results {
            match self.ctx.cache.get(&host).await {
                Ok(Some(entry)) if entry.is_fresh(self.ctx.now(), self.ctx.cache_ttl()) => {
                    let outcome = self.present(
                        request.tab_id,
                        host,
                        entry.result,
                        VerdictSource::Cache,
                        &settings,
                    );
                    return Ok(Some(outcome));
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(
                        target: "cache",
                        error = %err,
                        host = %host,
                        "cache read failed; treating as miss"
                    );
                }
            }
        }

        let result = match self
            .ctx
            .remote
            .classify(&settings, &host, &request.address, self.ctx.now())
            .await
        {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(
                    target: "orchestrator",
                    error = %err,
                    host = %host,
                    trigger = request.trigger.label(),
                    "site check failed"
                );
                if let Some(tab_id) = request.tab_id {
                    self.ctx.badge.present_error(tab_id);
                }
                return Err(err.into());
            }
        };

        let outcome = self.present(
            request.tab_id,
            host.clone(),
            result.clone(),
            VerdictSource::Classified,
            &settings,
        );

        if settings.cache_results {
            if let Err(err) = self.ctx.cache.put(&host, &result).await {
                tracing::warn!(target: "cache", error = %err, host = %host, "cache write failed");
            }
        }
        if let Err(err) = self.ctx.stats.increment(self.ctx.now()).await {
            tracing::warn!(target: "storage", error = %err, "daily stats update failed");
        }

        Ok(Some(outcome))
    }

    fn present(
        &self,
        tab_id: Option<TabId>,
        host: String,
        result: ClassificationResult,
        source: VerdictSource,
        settings: &Settings,
    ) -> CheckOutcome {
        let mut warned = false;
        if let Some(tab_id) = tab_id {
            self.ctx.badge.present(tab_id, &result);
            if result.is_unsafe && settings.show_warnings {
                self.ctx.warning.present(tab_id, &host, &result, settings);
                warned = true;
            }
        }

        let low_confidence = result.confidence < settings.confidence_threshold;
        if settings.enable_logging {
            tracing::info!(
                target: "orchestrator",
                host = %host,
                tab_id,
                source = ?source,
                classification = %result.classification,
                confidence = result.confidence,
                low_confidence,
                "site checked"
            );
        } else {
            tracing::debug!(
                target: "orchestrator",
                host = %host,
                tab_id,
                source = ?source,
                classification = %result.classification,
                "site checked"
            );
        }

        CheckOutcome {
            host,
            result,
            source,
            low_confidence,
            warned,
        }
    }
}
