use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;

use crate::domain::DailyStats;

use super::store::{KeyValueStore, Scope};

const STATS_KEY: &str = "dailyStats";

/// Counter of sites classified today, reset when the stored date is not
/// today's date in the configured timezone.
pub struct DailyStatsRepository {
    store: KeyValueStore,
    timezone: Tz,
    write_lock: Mutex<()>,
}

impl DailyStatsRepository {
    pub fn new(store: KeyValueStore, timezone: Tz) -> Self {
        Self {
            store,
            timezone,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn today(&self, now: DateTime<Utc>) -> Result<DailyStats> {
        let today = self.date_of(now);
        let stored: Option<DailyStats> = self.store.get(Scope::Local, STATS_KEY).await?;
        Ok(match stored {
            Some(stats) if stats.date == today => stats,
            _ => DailyStats {
                sites_checked: 0,
                date: today,
            },
        })
    }

    pub async fn increment(&self, now: DateTime<Utc>) -> Result<DailyStats> {
        let _guard = self.write_lock.lock().await;
        let mut stats = self.today(now).await?;
        stats.sites_checked = stats.sites_checked.saturating_add(1);
        self.store.set(Scope::Local, STATS_KEY, &stats).await?;
        Ok(stats)
    }

    fn date_of(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.timezone)
            .format("%Y-%m-%d")
            .to_string()
    }
}
