pub mod badge;
pub mod warning;

use crate::domain::TabId;

pub use badge::{Badge, BadgePresenter};
pub use warning::{Banner, WarningPresenter};

/// Where badge updates end up (the extension icon of one tab).
pub trait BadgeSurface: Send + Sync {
    fn set_badge(&self, tab_id: TabId, badge: &Badge);
}

/// Where banners are inserted into and removed from pages.
pub trait BannerSurface: Send + Sync {
    fn show_banner(&self, banner: &Banner);
    fn remove_banner(&self, tab_id: TabId, banner_id: u64);
}
