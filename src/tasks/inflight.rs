use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;

use crate::domain::TabId;

use super::orchestrator::CheckResult;

pub type SharedCheck = Shared<BoxFuture<'static, CheckResult>>;

struct Slot {
    generation: u64,
    host: String,
    check: SharedCheck,
}

pub enum Admission {
    /// A check for the same host is already running on this tab.
    Join(SharedCheck),
    Start(SharedCheck),
}

/// One pending check per tab. Later checks for the same host share its
/// result; checks for another host queue behind it.
#[derive(Default)]
pub struct InFlightChecks {
    slots: Mutex<HashMap<TabId, Slot>>,
    next_generation: AtomicU64,
}

impl InFlightChecks {
    /// `start` receives the check currently pending on the tab (if any) so
    /// the new check can wait for it to settle first, plus the generation
    /// the new check must pass to [`InFlightChecks::release`] when done.
    pub fn admit<F>(&self, tab_id: TabId, host: &str, start: F) -> Admission
    where
        F: FnOnce(Option<SharedCheck>, u64) -> SharedCheck,
    {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get(&tab_id) {
            if slot.host == host {
                return Admission::Join(slot.check.clone());
            }
        }

        let previous = slots.get(&tab_id).map(|slot| slot.check.clone());
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let check = start(previous, generation);
        slots.insert(
            tab_id,
            Slot {
                generation,
                host: host.to_string(),
                check: check.clone(),
            },
        );
        Admission::Start(check)
    }

    pub fn release(&self, tab_id: TabId, generation: u64) {
        let mut slots = self.slots.lock();
        if slots.get(&tab_id).map(|slot| slot.generation) == Some(generation) {
            slots.remove(&tab_id);
        }
    }

    pub fn pending_host(&self, tab_id: TabId) -> Option<String> {
        self.slots.lock().get(&tab_id).map(|slot| slot.host.clone())
    }
}
