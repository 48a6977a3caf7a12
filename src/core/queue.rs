use crate::extractors::VideoId;
use crate::utils::join_ids;

/// Safe limit for the watch_videos URL, conservatively below typical
/// browser and server URL-length caps.
pub const MAX_URL_LENGTH: usize = 8000;

/// The watch_videos endpoint tends to silently drop or mishandle sets
/// larger than this.
pub const MAX_NATIVE_VIDEOS: usize = 50;

/// Which playback surface carries the gathered queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueuePlan {
    /// One native multi-video URL carrying every identifier.
    Native { url: String },
    /// The extension's own playlist page, launched with the id list.
    Embedded,
}

/// Decide the playback surface. `None` means nothing to queue — an
/// expected empty result, not an error.
pub fn plan_queue(ids: &[VideoId], embed_requested: bool) -> Option<QueuePlan> {
    if ids.is_empty() {
        return None;
    }
    if embed_requested {
        return Some(QueuePlan::Embedded);
    }

    if ids.len() > MAX_NATIVE_VIDEOS {
        tracing::info!(
            "Too many videos ({}) for native mode, falling back to embedded",
            ids.len()
        );
        return Some(QueuePlan::Embedded);
    }

    let url = native_queue_url(ids);
    if url.len() > MAX_URL_LENGTH {
        tracing::info!(
            "Native queue URL too long ({} chars), falling back to embedded",
            url.len()
        );
        return Some(QueuePlan::Embedded);
    }

    Some(QueuePlan::Native { url })
}

/// Multi-video queue URL; a single id degrades to a plain watch URL.
pub fn native_queue_url(ids: &[VideoId]) -> String {
    if ids.len() == 1 {
        return ids[0].watch_url();
    }
    format!(
        "https://www.youtube.com/watch_videos?video_ids={}",
        join_ids(ids)
    )
}

/// Launch URL for the embedded playlist page.
pub fn embed_url(player_page: &str, ids: &[VideoId], window_id: &str) -> String {
    format!(
        "{}?ids={}&windowId={}",
        player_page,
        urlencoding::encode(&join_ids(ids)),
        window_id
    )
}
