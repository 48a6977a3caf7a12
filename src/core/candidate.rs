use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::tabs::{TabId, TabInfo};

/// A source tab inspected for video content. Created per gather
/// invocation, never persisted.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: TabId,
    pub url: String,
    pub title: String,
    /// Position within the window's tab strip.
    pub index: u32,
    /// Last-accessed time in milliseconds since the epoch.
    pub last_accessed: u64,
}

impl From<&TabInfo> for Candidate {
    fn from(tab: &TabInfo) -> Self {
        Self {
            id: tab.id,
            url: tab.url.clone(),
            title: if tab.title.is_empty() {
                "YouTube Video".to_string()
            } else {
                tab.title.clone()
            },
            index: tab.index,
            last_accessed: tab.last_accessed,
        }
    }
}

/// Ordering policy applied to candidates before dedup, so the first-seen
/// order of duplicates reflects the user's choice. Unrecognized policy
/// names deserialize to `Unordered`, which leaves the input untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    English,
    NonEnglish,
    LeftRight,
    RightLeft,
    #[serde(other)]
    Unordered,
}

/// Apply the ordering policy. All sorts are stable, so ties keep their
/// relative input order.
pub fn sort_candidates(mut candidates: Vec<Candidate>, order: SortOrder) -> Vec<Candidate> {
    match order {
        SortOrder::Newest => {
            candidates.sort_by(|a, b| b.last_accessed.cmp(&a.last_accessed));
        }
        SortOrder::Oldest => {
            candidates.sort_by(|a, b| a.last_accessed.cmp(&b.last_accessed));
        }
        SortOrder::English => {
            candidates.sort_by_key(|c| !is_likely_english(&c.title));
        }
        SortOrder::NonEnglish => {
            candidates.sort_by_key(|c| is_likely_english(&c.title));
        }
        SortOrder::LeftRight => {
            candidates.sort_by_key(|c| c.index);
        }
        SortOrder::RightLeft => {
            candidates.sort_by(|a, b| b.index.cmp(&a.index));
        }
        SortOrder::Unordered => {}
    }
    candidates
}

const COMMON_ENGLISH_WORDS: &[&str] = &[
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with",
    "by", "from", "up", "about", "into", "through", "during", "before", "after",
    "above", "below", "between", "among", "is", "are", "was", "were", "be", "been",
    "have", "has", "had", "do", "does", "did", "will", "would", "could", "should",
    "may", "might", "must", "can", "shall", "this", "that", "these", "those",
];

/// Heuristic language check: at least two stopword hits, or Latin letters
/// making up more than 70% of the non-whitespace characters.
pub fn is_likely_english(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }

    let lower = text.to_lowercase();
    let english_word_count = COMMON_ENGLISH_WORDS
        .iter()
        .filter(|word| lower.contains(*word))
        .count();
    if english_word_count >= 2 {
        return true;
    }

    let latin_chars = text.chars().filter(|c| c.is_ascii_alphabetic()).count();
    let total_chars = text.chars().filter(|c| !c.is_whitespace()).count();
    let latin_ratio = latin_chars as f64 / total_chars.max(1) as f64;
    latin_ratio > 0.7
}
