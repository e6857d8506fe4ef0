use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    domain::TabId,
    presenter::{Badge, Banner},
    redaction::DocumentKind,
};

/// One message from the extension. `id` is echoed on the reply so the
/// extension can match it to its pending callback.
#[derive(Debug, Clone, Deserialize)]
pub struct Inbound {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub command: Command,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    #[serde(rename_all = "camelCase")]
    CheckWebsite {
        url: String,
        #[serde(default)]
        tab_id: Option<TabId>,
    },
    #[serde(rename_all = "camelCase")]
    TabUpdated {
        tab_id: TabId,
        url: String,
        #[serde(default)]
        status: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    NavigationCompleted {
        tab_id: TabId,
        url: String,
        #[serde(default)]
        frame_id: i64,
    },
    #[serde(rename_all = "camelCase")]
    TabActivated {
        tab_id: TabId,
        #[serde(default)]
        url: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    TabRemoved { tab_id: TabId },
    #[serde(rename_all = "camelCase")]
    DismissWarning { tab_id: TabId },
    SettingsUpdated {
        #[serde(default)]
        settings: Option<Value>,
    },
    SaveSettings { settings: Map<String, Value> },
    GetSettings,
    GetSiteStatus { url: String },
    ClearCache,
    GetStats,
    HealthCheck,
    RedactDocument { path: PathBuf, kind: DocumentKind },
}

impl Command {
    pub fn action(&self) -> &'static str {
        match self {
            Command::CheckWebsite { .. } => "checkWebsite",
            Command::TabUpdated { .. } => "tabUpdated",
            Command::NavigationCompleted { .. } => "navigationCompleted",
            Command::TabActivated { .. } => "tabActivated",
            Command::TabRemoved { .. } => "tabRemoved",
            Command::DismissWarning { .. } => "dismissWarning",
            Command::SettingsUpdated { .. } => "settingsUpdated",
            Command::SaveSettings { .. } => "saveSettings",
            Command::GetSettings => "getSettings",
            Command::GetSiteStatus { .. } => "getSiteStatus",
            Command::ClearCache => "clearCache",
            Command::GetStats => "getStats",
            Command::HealthCheck => "healthCheck",
            Command::RedactDocument { .. } => "redactDocument",
        }
    }
}

/// Everything the host writes to the extension.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Outbound {
    Reply(ReplyMessage),
    #[serde(rename_all = "camelCase")]
    SetBadge {
        tab_id: TabId,
        text: String,
        color: String,
    },
    ShowWarning(Banner),
    #[serde(rename_all = "camelCase")]
    RemoveWarning { tab_id: TabId, banner_id: u64 },
}

impl Outbound {
    pub fn badge(tab_id: TabId, badge: &Badge) -> Self {
        Outbound::SetBadge {
            tab_id,
            text: badge.text.to_string(),
            color: badge.color.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ReplyMessage {
    pub fn ok(id: Option<u64>, data: Option<Value>) -> Self {
        Self {
            id,
            success: true,
            error: None,
            data,
        }
    }

    pub fn failed(id: Option<u64>, error: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            error: Some(error.into()),
            data: None,
        }
    }
}
