use anyhow::Result;

use crate::domain::Settings;

use super::store::{KeyValueStore, Scope};

#[derive(Clone)]
pub struct SettingsRepository {
    store: KeyValueStore,
}

impl SettingsRepository {
    pub fn new(store: KeyValueStore) -> Self {
        Self { store }
    }

    /// Stored settings over `defaults`.
    pub async fn load(&self, defaults: &Settings) -> Result<Settings> {
        let stored = self.store.get_all(Scope::Synced).await?;
        let (settings, rejected) = Settings::from_stored(defaults, stored);
        for key in rejected {
            tracing::warn!(target: "storage", key = %key, "ignoring invalid stored setting");
        }
        Ok(settings)
    }

    pub async fn save(&self, settings: &Settings) -> Result<()> {
        for (key, value) in settings.to_stored() {
            self.store.set(Scope::Synced, &key, &value).await?;
        }
        Ok(())
    }
}
