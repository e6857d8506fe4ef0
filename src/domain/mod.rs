pub mod host;
pub mod settings;
pub mod types;

pub use host::{extract_host, is_excluded_address};
pub use settings::Settings;
pub use types::{
    verdict_time, CacheEntry, CheckRequest, ClassificationResult, DailyStats, TabId, Trigger,
    CACHE_TTL,
};
