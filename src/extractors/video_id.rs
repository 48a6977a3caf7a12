use std::fmt;

use serde::{Deserialize, Serialize};

/// Length of every YouTube video identifier.
pub const VIDEO_ID_LEN: usize = 11;

/// Two-letter prefixes used by collection identifiers (playlists, channels,
/// uploads, mixes, liked-video lists, courses, favourites). An 11-character
/// token starting with one of these is a collection id, never a video.
pub const RESERVED_PREFIXES: &[&str] = &["PL", "UC", "UU", "RD", "LL", "OL", "FL"];

/// A validated 11-character YouTube video identifier.
///
/// Guaranteed by construction: exactly 11 characters from `[A-Za-z0-9_-]`,
/// not starting with a reserved collection prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoId(String);

impl VideoId {
    /// Validate a candidate token and wrap it. Invalid tokens are dropped
    /// silently by callers; there is nothing to report per-candidate.
    pub fn parse(candidate: &str) -> Option<Self> {
        if candidate.len() != VIDEO_ID_LEN {
            return None;
        }
        if !candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            return None;
        }
        if RESERVED_PREFIXES.iter().any(|p| candidate.starts_with(p)) {
            return None;
        }
        Some(Self(candidate.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Standard single-video watch URL for this id.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }

    /// Default thumbnail served for every public video.
    pub fn thumbnail_url(&self) -> String {
        format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for VideoId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        VideoId::parse(&value).ok_or_else(|| format!("invalid video id: {value:?}"))
    }
}

impl From<VideoId> for String {
    fn from(id: VideoId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_ids() {
        for id in ["dQw4w9WgXcQ", "abc_def-123", "___________", "00000000000"] {
            assert!(VideoId::parse(id).is_some(), "{id} should validate");
        }
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(VideoId::parse("").is_none());
        assert!(VideoId::parse("dQw4w9WgXc").is_none());
        assert!(VideoId::parse("dQw4w9WgXcQQ").is_none());
    }

    #[test]
    fn rejects_bad_characters() {
        assert!(VideoId::parse("dQw4w9WgXc!").is_none());
        assert!(VideoId::parse("dQw4w9 gXcQ").is_none());
        assert!(VideoId::parse("dQw4w9WgXc=").is_none());
    }

    #[test]
    fn rejects_reserved_collection_prefixes() {
        // Well-formed except for the prefix.
        for id in [
            "PLabcdefghi", "UCabcdefghi", "UUabcdefghi", "RDabcdefghi",
            "LLabcdefghi", "OLabcdefghi", "FLabcdefghi",
        ] {
            assert!(VideoId::parse(id).is_none(), "{id} should be rejected");
        }
        // Lowercase variants are ordinary video ids.
        assert!(VideoId::parse("plabcdefghi").is_some());
    }

    #[test]
    fn serde_round_trip_enforces_validation() {
        let id: VideoId = serde_json::from_str("\"dQw4w9WgXcQ\"").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");
        assert!(serde_json::from_str::<VideoId>("\"PLabcdefghi\"").is_err());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"dQw4w9WgXcQ\"");
    }
}
