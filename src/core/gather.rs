use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::candidate::{sort_candidates, Candidate, SortOrder};
use crate::core::collector::{collect_video_ids, filter_candidates};
use crate::core::queue::{self, QueuePlan};
use crate::extractors::VideoId;
use crate::storage::{keys, KeyValueStore};
use crate::tabs::{TabId, TabProvider};
use crate::utils::now_millis;

/// One user-triggered gather action, as sent by the UI collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatherRequest {
    #[serde(default)]
    pub embed_mode: bool,
    #[serde(default)]
    pub close_tabs: bool,
    #[serde(default)]
    pub sort_order: SortOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatherResponse {
    pub success: bool,
    pub message: String,
    pub video_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_url: Option<String>,
}

impl GatherResponse {
    fn no_videos() -> Self {
        Self {
            success: false,
            message: "No YouTube video tabs found.".to_string(),
            video_count: 0,
            queue_url: None,
        }
    }

    fn failure(message: String) -> Self {
        Self {
            success: false,
            message,
            video_count: 0,
            queue_url: None,
        }
    }
}

/// Scans the current window's tabs, builds the deduplicated ordered queue
/// and launches the chosen playback surface. Every failure is converted to
/// a `GatherResponse`; this service never panics the caller.
pub struct GatherService<T: TabProvider, S: KeyValueStore> {
    tabs: T,
    store: S,
    player_page: String,
}

impl<T: TabProvider, S: KeyValueStore> GatherService<T, S> {
    pub fn new(tabs: T, store: S, player_page: impl Into<String>) -> Self {
        Self {
            tabs,
            store,
            player_page: player_page.into(),
        }
    }

    pub fn tabs(&self) -> &T {
        &self.tabs
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Hand the store off, e.g. to a player booting from persisted state.
    pub fn into_store(self) -> S {
        self.store
    }

    pub async fn handle(&self, request: &GatherRequest) -> GatherResponse {
        let tabs = match self.tabs.query_current_window().await {
            Ok(tabs) => tabs,
            Err(e) => return GatherResponse::failure(format!("Failed to gather videos: {e}")),
        };

        let candidates = sort_candidates(filter_candidates(&tabs), request.sort_order);
        let video_ids = collect_video_ids(&candidates);
        if video_ids.is_empty() {
            return GatherResponse::no_videos();
        }

        let plan = match queue::plan_queue(&video_ids, request.embed_mode) {
            Some(plan) => plan,
            None => return GatherResponse::no_videos(),
        };

        let launch = match plan {
            QueuePlan::Native { url } => self.open_native_queue(&video_ids, url).await,
            QueuePlan::Embedded => self.open_embedded_queue(&video_ids).await,
        };

        let (queue_url, new_tab) = match launch {
            Ok(launched) => launched,
            Err(e) => return GatherResponse::failure(e.to_string()),
        };

        if request.close_tabs {
            self.close_source_tabs(&candidates, new_tab).await;
        }

        GatherResponse {
            success: true,
            message: format!("Successfully gathered {} video(s)!", video_ids.len()),
            video_count: video_ids.len(),
            queue_url: Some(queue_url),
        }
    }

    /// Open the native multi-video URL in a new tab, recording the set for
    /// the window so a later gather can inspect what it replaced.
    async fn open_native_queue(
        &self,
        ids: &[VideoId],
        url: String,
    ) -> Result<(String, TabId)> {
        let result: Result<(String, TabId)> = async {
            let window_id = self.tabs.current_window().await?.to_string();

            self.store.set_json(&keys::native_queue(&window_id), &ids).await?;
            self.store
                .set_json(&keys::native_queue_timestamp(&window_id), &now_millis())
                .await?;
            self.store
                .set_json(&keys::last_native_url(&window_id), &url)
                .await?;

            tracing::info!(
                "Creating native queue with {} videos in window {}",
                ids.len(),
                window_id
            );
            let tab_id = self.tabs.create_tab(&url).await?;
            Ok((url, tab_id))
        }
        .await;

        result.map_err(|e| anyhow::anyhow!("Failed to create watch_videos queue: {e}"))
    }

    /// Open or reuse the single embedded playlist page for this window and
    /// persist the queue for it, window-scoped plus the legacy slots.
    async fn open_embedded_queue(&self, ids: &[VideoId]) -> Result<(String, TabId)> {
        let result: Result<(String, TabId)> = async {
            let window_id = self.tabs.current_window().await?.to_string();
            let embed_url = queue::embed_url(&self.player_page, ids, &window_id);

            let existing = self.tabs.find_in_current_window(&self.player_page).await?;
            let tab_id = match existing.first() {
                Some(tab) => {
                    self.tabs.update_tab(tab.id, &embed_url).await?;
                    tab.id
                }
                None => self.tabs.create_tab(&embed_url).await?,
            };

            self.store.set_json(&keys::queue(&window_id), &ids).await?;
            self.store
                .set_json(&keys::queue_timestamp(&window_id), &now_millis())
                .await?;
            // Legacy unscoped slots, kept for backward compatibility.
            self.store.set_json(keys::LEGACY_QUEUE, &ids).await?;
            self.store
                .set_json(keys::LEGACY_QUEUE_TIMESTAMP, &now_millis())
                .await?;

            Ok((embed_url, tab_id))
        }
        .await;

        result.map_err(|e| anyhow::anyhow!("Failed to create embedded queue: {e}"))
    }

    /// Close every originating tab except the one hosting the queue.
    /// Failures are swallowed: closing tabs must never invalidate an
    /// otherwise-successful gather.
    async fn close_source_tabs(&self, candidates: &[Candidate], keep: TabId) {
        let to_close: Vec<TabId> = candidates
            .iter()
            .map(|c| c.id)
            .filter(|id| *id != keep)
            .collect();
        if to_close.is_empty() {
            return;
        }
        if let Err(e) = self.tabs.remove_tabs(&to_close).await {
            tracing::warn!("Failed to close source tabs: {e}");
        }
    }
}
