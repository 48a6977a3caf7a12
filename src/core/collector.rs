use std::collections::HashSet;

use crate::core::candidate::Candidate;
use crate::extractors::{youtube, VideoId};
use crate::tabs::TabInfo;

/// Keep only tabs that resolve to a single playable video. Tabs that fail
/// extraction are dropped silently; the caller reports only the aggregate
/// empty condition.
pub fn filter_candidates(tabs: &[TabInfo]) -> Vec<Candidate> {
    tabs.iter()
        .filter(|tab| youtube::extract_from_tab(&tab.url, &tab.title).is_some())
        .map(Candidate::from)
        .collect()
}

/// Extract ids from an already-ordered candidate list, dropping later
/// duplicates. First occurrence wins, so the dedup order reflects the
/// sort policy applied upstream.
pub fn collect_video_ids(candidates: &[Candidate]) -> Vec<VideoId> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for candidate in candidates {
        if let Some(id) = youtube::extract_from_tab(&candidate.url, &candidate.title) {
            if seen.insert(id.clone()) {
                ids.push(id);
            }
        }
    }
    ids
}
