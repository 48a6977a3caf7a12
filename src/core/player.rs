use rand::seq::SliceRandom;
use serde_json::Value;

use crate::core::signal::{self, EndSignal, EndWatch};
use crate::extractors::VideoId;
use crate::storage::{keys, KeyValueStore};
use crate::utils::{now_millis, split_ids};

/// Player state: `Empty` exposes the "nothing to play" condition, which
/// downstream logic treats as a normal result, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Empty,
    Loaded,
}

/// Sequential playlist player owning the queue for the lifetime of its
/// page. Every structural mutation persists the whole queue (replace
/// semantics) with a save timestamp, scoped to the owning window.
pub struct PlaylistPlayer<S: KeyValueStore> {
    store: S,
    window_id: String,
    ids: Vec<VideoId>,
    cursor: usize,
    playing: bool,
    watch: EndWatch,
}

impl<S: KeyValueStore> PlaylistPlayer<S> {
    /// Build the player from launch parameters if present, else from the
    /// window-scoped persisted queue, else from the legacy unscoped slot.
    pub async fn initialize(store: S, window_id: &str, ids_param: Option<&str>) -> Self {
        let mut ids = ids_param.map(split_ids).unwrap_or_default();

        if ids.is_empty() {
            ids = Self::load_stored(&store, window_id).await;
        }

        let mut player = Self {
            store,
            window_id: window_id.to_string(),
            playing: !ids.is_empty(),
            ids,
            cursor: 0,
            watch: EndWatch::new(),
        };
        if player.playing {
            player.watch.arm();
        }
        player
    }

    async fn load_stored(store: &S, window_id: &str) -> Vec<VideoId> {
        for key in [keys::queue(window_id), keys::LEGACY_QUEUE.to_string()] {
            match store.get_json::<Vec<String>>(&key).await {
                Ok(Some(raw)) => {
                    let ids: Vec<VideoId> =
                        raw.iter().filter_map(|s| VideoId::parse(s)).collect();
                    if !ids.is_empty() {
                        return ids;
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Failed to load stored queue {key}: {e}"),
            }
        }
        Vec::new()
    }

    pub fn state(&self) -> PlayerState {
        if self.ids.is_empty() {
            PlayerState::Empty
        } else {
            PlayerState::Loaded
        }
    }

    pub fn ids(&self) -> &[VideoId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&VideoId> {
        self.ids.get(self.cursor)
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Whether the redundant end-detection polling should keep checking
    /// the playback surface for the current item.
    pub fn poll_active(&self) -> bool {
        self.playing && self.watch.poll_active()
    }

    /// Jump to an index and (re)start playback there. Out-of-range indices
    /// are ignored.
    pub fn play(&mut self, index: usize) {
        if index >= self.ids.len() {
            return;
        }
        self.cursor = index;
        self.playing = true;
        self.watch.arm();
    }

    /// Manual advance; wraps circularly.
    pub fn next(&mut self) {
        if self.ids.is_empty() {
            return;
        }
        let next = (self.cursor + 1) % self.ids.len();
        self.play(next);
    }

    /// Manual step back; wraps circularly.
    pub fn previous(&mut self) {
        if self.ids.is_empty() {
            return;
        }
        let prev = (self.cursor + self.ids.len() - 1) % self.ids.len();
        self.play(prev);
    }

    /// Remove the item at `index`. Removing the last remaining item clears
    /// the queue; removing the current item resumes playback at the
    /// clamped cursor.
    pub async fn remove(&mut self, index: usize) {
        if index >= self.ids.len() {
            return;
        }
        if self.ids.len() == 1 {
            self.clear().await;
            return;
        }

        self.ids.remove(index);

        if index == self.cursor {
            if self.cursor >= self.ids.len() {
                self.cursor = self.ids.len() - 1;
            }
            let resume = self.cursor;
            self.play(resume);
        } else if index < self.cursor {
            // Track the same logical item.
            self.cursor -= 1;
        }

        self.save().await;
    }

    /// Drag-reorder: move the item at `from` in front of the position
    /// `to` had before the removal.
    pub async fn move_item(&mut self, from: usize, to: usize) {
        let len = self.ids.len();
        if from >= len || to >= len || from == to {
            return;
        }

        let id = self.ids.remove(from);
        let dest = if from < to { to - 1 } else { to };
        self.ids.insert(dest, id);

        if from == self.cursor {
            self.cursor = dest;
        } else if from < self.cursor && dest >= self.cursor {
            self.cursor -= 1;
        } else if from > self.cursor && dest <= self.cursor {
            self.cursor += 1;
        }

        self.save().await;
    }

    /// Fisher–Yates shuffle of the whole queue; the identity of the item
    /// under the cursor is pinned across the permutation.
    pub async fn shuffle(&mut self) {
        if self.ids.len() <= 1 {
            return;
        }

        let current = self.ids[self.cursor].clone();
        self.ids.shuffle(&mut rand::thread_rng());
        // The queue is deduplicated, so the position is unambiguous.
        self.cursor = self
            .ids
            .iter()
            .position(|id| *id == current)
            .unwrap_or(0);

        self.save().await;
    }

    /// Empty the queue and stop playback. Confirmation of this destructive
    /// operation is the surface's responsibility.
    pub async fn clear(&mut self) {
        self.ids.clear();
        self.cursor = 0;
        self.playing = false;
        self.save().await;
    }

    /// Feed one raw message from the playback surface through the
    /// normalizer; an accepted end auto-advances without wrapping.
    pub async fn on_player_message(&mut self, message: &Value) {
        if signal::classify(message) == EndSignal::Ended {
            self.handle_end_signal();
        }
    }

    /// Redundant end-detection path: check the playback surface at a low
    /// frequency, feeding positive checks through the same debounced end
    /// handling as surface messages. An advance re-arms the per-item
    /// budget; the loop returns once playback stops or the budget for the
    /// current item runs out.
    pub async fn run_end_poll<F>(&mut self, mut check_ended: F)
    where
        F: FnMut() -> bool,
    {
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + signal::POLL_INTERVAL,
            signal::POLL_INTERVAL,
        );
        while self.poll_active() {
            ticker.tick().await;
            if check_ended() {
                self.handle_end_signal();
            }
        }
    }

    /// An end-of-item detection from either path (message or poll).
    /// Debounced; auto-advance stops at the last index instead of
    /// wrapping — only manual `next` loops back to the start.
    pub fn handle_end_signal(&mut self) {
        if self.ids.is_empty() || !self.watch.accept_end() {
            return;
        }
        if self.cursor + 1 < self.ids.len() {
            let next = self.cursor + 1;
            self.play(next);
        } else {
            self.playing = false;
        }
    }

    /// Persist the full queue plus freshness timestamp, window-scoped.
    /// Storage failures are logged and swallowed; playback continues.
    async fn save(&self) {
        let result = async {
            self.store
                .set_json(&keys::queue(&self.window_id), &self.ids)
                .await?;
            self.store
                .set_json(&keys::queue_timestamp(&self.window_id), &now_millis())
                .await
        }
        .await;

        if let Err(e) = result {
            tracing::warn!("Failed to save queue: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn id(s: &str) -> VideoId {
        VideoId::parse(s).unwrap()
    }

    async fn player_with(ids: &str) -> PlaylistPlayer<MemoryStore> {
        PlaylistPlayer::initialize(MemoryStore::new(), "1", Some(ids)).await
    }

    const A: &str = "aaaaaaaaaaa";
    const B: &str = "bbbbbbbbbbb";
    const C: &str = "ccccccccccc";

    #[tokio::test]
    async fn initialize_from_launch_parameters() {
        let player = player_with("aaaaaaaaaaa,bbbbbbbbbbb").await;
        assert_eq!(player.state(), PlayerState::Loaded);
        assert_eq!(player.len(), 2);
        assert_eq!(player.cursor(), 0);
        assert!(player.is_playing());
    }

    #[tokio::test]
    async fn initialize_falls_back_to_stored_queue() {
        let store = MemoryStore::new();
        store
            .set_json(&keys::queue("1"), &vec![A, B])
            .await
            .unwrap();
        let player = PlaylistPlayer::initialize(store, "1", None).await;
        assert_eq!(player.len(), 2);
        assert_eq!(player.current(), Some(&id(A)));
    }

    #[tokio::test]
    async fn initialize_falls_back_to_legacy_slot() {
        let store = MemoryStore::new();
        store.set_json(keys::LEGACY_QUEUE, &vec![C]).await.unwrap();
        let player = PlaylistPlayer::initialize(store, "1", None).await;
        assert_eq!(player.len(), 1);
        assert_eq!(player.current(), Some(&id(C)));
    }

    #[tokio::test]
    async fn empty_everywhere_is_nothing_to_play() {
        let player = PlaylistPlayer::initialize(MemoryStore::new(), "1", None).await;
        assert_eq!(player.state(), PlayerState::Empty);
        assert!(!player.is_playing());
    }

    #[tokio::test]
    async fn remove_current_clamps_cursor_to_new_last() {
        // [A, B, C], cursor at B: Remove(1) -> [A, C], cursor at C.
        let mut player = player_with("aaaaaaaaaaa,bbbbbbbbbbb,ccccccccccc").await;
        player.play(1);
        player.remove(1).await;
        assert_eq!(player.ids(), &[id(A), id(C)]);
        assert_eq!(player.current(), Some(&id(C)));
        assert_eq!(player.cursor(), 1);
    }

    #[tokio::test]
    async fn remove_before_cursor_decrements_it() {
        // [A, C], cursor at C: Remove(0) keeps cursor on C (now index 0).
        let mut player = player_with("aaaaaaaaaaa,ccccccccccc").await;
        player.play(1);
        player.remove(0).await;
        assert_eq!(player.current(), Some(&id(C)));
        assert_eq!(player.cursor(), 0);
    }

    #[tokio::test]
    async fn remove_last_remaining_item_clears() {
        let mut player = player_with("aaaaaaaaaaa").await;
        player.remove(0).await;
        assert_eq!(player.state(), PlayerState::Empty);
        assert!(!player.is_playing());
        assert_eq!(player.cursor(), 0);
    }

    #[tokio::test]
    async fn remove_tail_past_cursor_leaves_cursor_alone() {
        let mut player = player_with("aaaaaaaaaaa,bbbbbbbbbbb,ccccccccccc").await;
        player.play(0);
        player.remove(2).await;
        assert_eq!(player.current(), Some(&id(A)));
        assert_eq!(player.cursor(), 0);
    }

    #[tokio::test]
    async fn manual_next_wraps_and_auto_advance_does_not() {
        let mut player = player_with("aaaaaaaaaaa,bbbbbbbbbbb").await;
        player.play(1);
        player.next();
        assert_eq!(player.cursor(), 0);

        // Back to the last index; auto-advance stops there.
        player.play(1);
        player.handle_end_signal();
        assert_eq!(player.cursor(), 1);
        assert!(!player.is_playing());
    }

    #[tokio::test]
    async fn previous_wraps_to_the_end() {
        let mut player = player_with("aaaaaaaaaaa,bbbbbbbbbbb,ccccccccccc").await;
        player.play(0);
        player.previous();
        assert_eq!(player.cursor(), 2);
    }

    #[tokio::test]
    async fn auto_advance_moves_off_non_final_items() {
        let mut player = player_with("aaaaaaaaaaa,bbbbbbbbbbb").await;
        player.play(0);
        player.handle_end_signal();
        assert_eq!(player.current(), Some(&id(B)));
        assert!(player.is_playing());
    }

    #[tokio::test]
    async fn duplicate_end_messages_advance_only_once() {
        let mut player = player_with("aaaaaaaaaaa,bbbbbbbbbbb,ccccccccccc").await;
        player.play(0);
        let ended = serde_json::json!({"event": "video-state-change", "info": 0});
        player.on_player_message(&ended).await;
        player.on_player_message(&ended).await;
        player.on_player_message(&ended).await;
        assert_eq!(player.cursor(), 1);
    }

    #[tokio::test]
    async fn non_end_messages_are_ignored() {
        let mut player = player_with("aaaaaaaaaaa,bbbbbbbbbbb").await;
        player.play(0);
        player
            .on_player_message(&serde_json::json!({"playerState": 1}))
            .await;
        player
            .on_player_message(&serde_json::json!({"foo": "bar"}))
            .await;
        assert_eq!(player.cursor(), 0);
    }

    #[tokio::test]
    async fn move_item_tracks_the_moved_cursor_item() {
        let mut player = player_with("aaaaaaaaaaa,bbbbbbbbbbb,ccccccccccc").await;
        player.play(0);
        player.move_item(0, 2).await;
        assert_eq!(player.ids(), &[id(B), id(A), id(C)]);
        assert_eq!(player.current(), Some(&id(A)));
    }

    #[tokio::test]
    async fn move_item_crossing_cursor_shifts_it() {
        // Moving C in front of A crosses cursor at B.
        let mut player = player_with("aaaaaaaaaaa,bbbbbbbbbbb,ccccccccccc").await;
        player.play(1);
        player.move_item(2, 0).await;
        assert_eq!(player.ids(), &[id(C), id(A), id(B)]);
        assert_eq!(player.current(), Some(&id(B)));
        assert_eq!(player.cursor(), 2);
    }

    #[tokio::test]
    async fn shuffle_pins_the_current_identifier() {
        let joined = (0..20)
            .map(|i| format!("vid{i:08}"))
            .collect::<Vec<_>>()
            .join(",");
        let mut player = player_with(&joined).await;
        player.play(7);
        let before = player.current().cloned().unwrap();
        let mut before_ids: Vec<_> = player.ids().to_vec();

        player.shuffle().await;

        assert_eq!(player.current(), Some(&before));
        let mut after_ids: Vec<_> = player.ids().to_vec();
        before_ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        after_ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        assert_eq!(before_ids, after_ids);
    }

    #[tokio::test(start_paused = true)]
    async fn end_poll_advances_on_positive_checks() {
        let mut player = player_with("aaaaaaaaaaa,bbbbbbbbbbb").await;
        player.play(0);

        // Ends on the first and fourth checks, 30 s apart, well past the
        // debounce window. The second end lands on the last item and stops
        // playback, which terminates the loop.
        let mut count = 0u32;
        player
            .run_end_poll(|| {
                count += 1;
                count == 1 || count == 4
            })
            .await;

        assert_eq!(count, 4);
        assert_eq!(player.cursor(), 1);
        assert!(!player.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn end_poll_gives_up_when_the_item_budget_expires() {
        use crate::core::signal::{MAX_POLL_PER_ITEM, POLL_INTERVAL};

        let mut player = player_with("aaaaaaaaaaa").await;
        player.play(0);

        let mut count = 0u64;
        player
            .run_end_poll(|| {
                count += 1;
                false
            })
            .await;

        let budget_ticks = MAX_POLL_PER_ITEM.as_secs() / POLL_INTERVAL.as_secs();
        assert!(count > 0);
        assert!(count <= budget_ticks + 1, "polled {count} times");
        assert!(!player.poll_active());
        // The item never ended; only the polling gave up.
        assert_eq!(player.cursor(), 0);
        assert!(player.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn end_poll_budget_rearms_when_the_item_changes() {
        use crate::core::signal::{MAX_POLL_PER_ITEM, POLL_INTERVAL};

        let mut player = player_with("aaaaaaaaaaa,bbbbbbbbbbb").await;
        player.play(0);

        // One end early on; the advance re-arms the budget, so polling
        // outlives the budget armed for the first item.
        let mut count = 0u64;
        player
            .run_end_poll(|| {
                count += 1;
                count == 2
            })
            .await;

        let budget_ticks = MAX_POLL_PER_ITEM.as_secs() / POLL_INTERVAL.as_secs();
        assert!(count > budget_ticks, "polled only {count} times");
        assert_eq!(player.cursor(), 1);
        assert!(player.is_playing());
    }

    #[tokio::test]
    async fn clear_empties_and_stops() {
        let mut player = player_with("aaaaaaaaaaa,bbbbbbbbbbb").await;
        player.clear().await;
        assert_eq!(player.state(), PlayerState::Empty);
        assert!(!player.is_playing());
    }

    #[tokio::test]
    async fn mutations_persist_window_scoped() {
        let mut player = player_with("aaaaaaaaaaa,bbbbbbbbbbb,ccccccccccc").await;
        player.remove(2).await;

        let stored: Option<Vec<String>> =
            player.store.get_json(&keys::queue("1")).await.unwrap();
        assert_eq!(stored, Some(vec![A.to_string(), B.to_string()]));
        let ts: Option<u64> = player
            .store
            .get_json(&keys::queue_timestamp("1"))
            .await
            .unwrap();
        assert!(ts.is_some());
    }
}
