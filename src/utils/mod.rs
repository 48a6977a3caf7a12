use std::time::{SystemTime, UNIX_EPOCH};

use crate::extractors::VideoId;

/// Milliseconds since the epoch, the timestamp unit used for persisted
/// save times and tab last-accessed values.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Comma-join ids for URL parameters and persisted payloads.
pub fn join_ids(ids: &[VideoId]) -> String {
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse a comma-joined id list, silently dropping tokens that fail
/// validation.
pub fn split_ids(joined: &str) -> Vec<VideoId> {
    joined
        .split(',')
        .filter_map(|token| VideoId::parse(token.trim()))
        .collect()
}
