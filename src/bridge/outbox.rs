use tokio::sync::mpsc;

use crate::{
    domain::TabId,
    presenter::{Badge, BadgeSurface, Banner, BannerSurface},
};

use super::messages::Outbound;

/// Queue of messages bound for the extension. Presenters and reply tasks
/// push here; the bridge host owns the single writer.
#[derive(Clone)]
pub struct Outbox {
    sender: mpsc::UnboundedSender<Outbound>,
}

impl Outbox {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn send(&self, message: Outbound) {
        if self.sender.send(message).is_err() {
            tracing::debug!(target: "bridge", "outbox closed; dropping message");
        }
    }
}

impl BadgeSurface for Outbox {
    fn set_badge(&self, tab_id: TabId, badge: &Badge) {
        self.send(Outbound::badge(tab_id, badge));
    }
}

impl BannerSurface for Outbox {
    fn show_banner(&self, banner: &Banner) {
        self.send(Outbound::ShowWarning(banner.clone()));
    }

    fn remove_banner(&self, tab_id: TabId, banner_id: u64) {
        self.send(Outbound::RemoveWarning { tab_id, banner_id });
    }
}
