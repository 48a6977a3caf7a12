use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::SortOrder;
use crate::storage::{KeyValueStore, StorageError};

/// Runtime configuration for the CLI, loadable from a toml file. Missing
/// file or fields fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON file backing the shared key-value store.
    pub state_file: PathBuf,
    /// JSON snapshot of open tabs to gather from.
    pub tabs_file: PathBuf,
    /// Base URL of the embedded playlist page.
    pub player_page: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("gathertube_state.json"),
            tabs_file: PathBuf::from("tabs.json"),
            player_page: "gathertube://player".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}

/// Persisted user settings, mirrored between the gather UI and the store.
/// Keys predate window scoping and stay unscoped.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Settings {
    pub embed_mode: bool,
    pub close_tabs: bool,
    pub sort_order: SortOrder,
}

const EMBED_MODE_KEY: &str = "embedMode";
const CLOSE_TABS_KEY: &str = "closeTabs";
const SORT_ORDER_KEY: &str = "sortOrder";

impl Settings {
    /// Load settings, filling in defaults for keys never written.
    pub async fn load<S: KeyValueStore>(store: &S) -> Self {
        let defaults = Self::default();
        Self {
            embed_mode: store
                .get_json(EMBED_MODE_KEY)
                .await
                .ok()
                .flatten()
                .unwrap_or(defaults.embed_mode),
            close_tabs: store
                .get_json(CLOSE_TABS_KEY)
                .await
                .ok()
                .flatten()
                .unwrap_or(defaults.close_tabs),
            sort_order: store
                .get_json(SORT_ORDER_KEY)
                .await
                .ok()
                .flatten()
                .unwrap_or(defaults.sort_order),
        }
    }

    pub async fn save<S: KeyValueStore>(&self, store: &S) -> Result<(), StorageError> {
        store.set_json(EMBED_MODE_KEY, &self.embed_mode).await?;
        store.set_json(CLOSE_TABS_KEY, &self.close_tabs).await?;
        store.set_json(SORT_ORDER_KEY, &self.sort_order).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn missing_settings_fall_back_to_defaults() {
        let store = MemoryStore::new();
        let settings = Settings::load(&store).await;
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.sort_order, SortOrder::Newest);
    }

    #[tokio::test]
    async fn settings_round_trip() {
        let store = MemoryStore::new();
        let settings = Settings {
            embed_mode: true,
            close_tabs: true,
            sort_order: SortOrder::RightLeft,
        };
        settings.save(&store).await.unwrap();
        assert_eq!(Settings::load(&store).await, settings);
    }

    #[test]
    fn config_defaults_when_no_file_given() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.player_page, "gathertube://player");
    }

    #[test]
    fn config_parses_partial_toml() {
        let config: Config = toml::from_str("player_page = \"ext://queue\"").unwrap();
        assert_eq!(config.player_page, "ext://queue");
        assert_eq!(config.state_file, PathBuf::from("gathertube_state.json"));
    }
}
