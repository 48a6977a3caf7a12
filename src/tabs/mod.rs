use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub type TabId = u32;
pub type WindowId = u32;

/// Snapshot of one open tab as reported by the host browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    /// Position within the window's tab strip.
    pub index: u32,
    /// Last-accessed time in milliseconds since the epoch.
    #[serde(default)]
    pub last_accessed: u64,
    #[serde(default)]
    pub window_id: WindowId,
}

/// Host-provided tab operations. Enumeration and lifecycle are thin
/// wrappers over browser APIs; this trait is the seam that keeps the
/// gather logic testable without a browser.
#[async_trait]
pub trait TabProvider: Send + Sync {
    async fn current_window(&self) -> Result<WindowId>;
    async fn query_current_window(&self) -> Result<Vec<TabInfo>>;
    /// Returns tabs in the current window whose URL starts with the prefix.
    async fn find_in_current_window(&self, url_prefix: &str) -> Result<Vec<TabInfo>>;
    async fn create_tab(&self, url: &str) -> Result<TabId>;
    async fn update_tab(&self, id: TabId, url: &str) -> Result<()>;
    async fn remove_tabs(&self, ids: &[TabId]) -> Result<()>;
}

/// In-memory tab set, loadable from a JSON snapshot. Backs the CLI and the
/// integration tests.
pub struct MemoryTabs {
    window_id: WindowId,
    state: Mutex<TabState>,
}

struct TabState {
    tabs: Vec<TabInfo>,
    next_id: TabId,
}

impl MemoryTabs {
    pub fn new(window_id: WindowId, tabs: Vec<TabInfo>) -> Self {
        let next_id = tabs.iter().map(|t| t.id + 1).max().unwrap_or(1);
        Self {
            window_id,
            state: Mutex::new(TabState { tabs, next_id }),
        }
    }

    /// Load a tab snapshot from a JSON array of [`TabInfo`] records. Tabs
    /// carrying no window id are assigned to the given window.
    pub fn from_json_file(path: impl AsRef<Path>, window_id: WindowId) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let mut tabs: Vec<TabInfo> = serde_json::from_str(&contents)?;
        for tab in &mut tabs {
            if tab.window_id == 0 {
                tab.window_id = window_id;
            }
        }
        Ok(Self::new(window_id, tabs))
    }

    pub fn snapshot(&self) -> Vec<TabInfo> {
        self.state.lock().unwrap().tabs.clone()
    }
}

#[async_trait]
impl TabProvider for MemoryTabs {
    async fn current_window(&self) -> Result<WindowId> {
        Ok(self.window_id)
    }

    async fn query_current_window(&self) -> Result<Vec<TabInfo>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tabs
            .iter()
            .filter(|t| t.window_id == self.window_id)
            .cloned()
            .collect())
    }

    async fn find_in_current_window(&self, url_prefix: &str) -> Result<Vec<TabInfo>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tabs
            .iter()
            .filter(|t| t.window_id == self.window_id && t.url.starts_with(url_prefix))
            .cloned()
            .collect())
    }

    async fn create_tab(&self, url: &str) -> Result<TabId> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        let index = state.tabs.len() as u32;
        state.tabs.push(TabInfo {
            id,
            url: url.to_string(),
            title: String::new(),
            index,
            last_accessed: crate::utils::now_millis(),
            window_id: self.window_id,
        });
        Ok(id)
    }

    async fn update_tab(&self, id: TabId, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let tab = state
            .tabs
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| anyhow::anyhow!("no tab with id {id}"))?;
        tab.url = url.to_string();
        Ok(())
    }

    async fn remove_tabs(&self, ids: &[TabId]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.tabs.retain(|t| !ids.contains(&t.id));
        Ok(())
    }
}
