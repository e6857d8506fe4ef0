use std::sync::Arc;

use serde::Serialize;

use crate::domain::{ClassificationResult, TabId};

use super::BadgeSurface;

pub const GOVERNMENT_COLOR: &str = "#1E88E5";
pub const UNSAFE_COLOR: &str = "#FF5722";
pub const SAFE_COLOR: &str = "#4CAF50";
pub const ERROR_COLOR: &str = "#FF9800";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub text: &'static str,
    pub color: &'static str,
}

impl Badge {
    pub fn for_result(result: &ClassificationResult) -> Self {
        if result.is_government {
            Self {
                text: "GOV",
                color: GOVERNMENT_COLOR,
            }
        } else if result.is_unsafe {
            Self {
                text: "⚠",
                color: UNSAFE_COLOR,
            }
        } else {
            Self {
                text: "",
                color: SAFE_COLOR,
            }
        }
    }

    pub fn error() -> Self {
        Self {
            text: "!!",
            color: ERROR_COLOR,
        }
    }
}

#[derive(Clone)]
pub struct BadgePresenter {
    surface: Arc<dyn BadgeSurface>,
}

impl BadgePresenter {
    pub fn new(surface: Arc<dyn BadgeSurface>) -> Self {
        Self { surface }
    }

    pub fn present(&self, tab_id: TabId, result: &ClassificationResult) {
        self.surface.set_badge(tab_id, &Badge::for_result(result));
    }

    pub fn present_error(&self, tab_id: TabId) {
        self.surface.set_badge(tab_id, &Badge::error());
    }
}
