use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

/// Repeated end notifications inside this window are duplicates of one
/// event and must not double-advance the queue.
pub const END_DEBOUNCE: Duration = Duration::from_secs(3);

/// Cadence of the redundant end-detection check.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Safety valve: give up polling for an item after this long.
pub const MAX_POLL_PER_ITEM: Duration = Duration::from_secs(30 * 60);

/// Player state code the embedded surface reports when an item finishes.
const ENDED_STATE: i64 = 0;

/// Normalized verdict for one message from the playback surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndSignal {
    Ended,
    NotEnded,
    Unrecognized,
}

/// Normalize the message-shape zoo the embedded surface emits: a bare
/// state code, `{event, info}`, `{data}`, `{state}`, `{playerState}`,
/// nested `{info: {playerState}}`, `{args: {...}}`, or any of those as a
/// stringified-JSON payload.
pub fn classify(message: &Value) -> EndSignal {
    match message {
        Value::Number(n) => match n.as_i64() {
            Some(ENDED_STATE) => EndSignal::Ended,
            Some(_) => EndSignal::NotEnded,
            None => EndSignal::Unrecognized,
        },
        Value::String(s) => classify_raw(s),
        Value::Object(obj) => {
            if obj.get("event").and_then(Value::as_str) == Some("video-ended") {
                return EndSignal::Ended;
            }

            let states = [
                obj.get("info").and_then(Value::as_i64),
                obj.get("data").and_then(Value::as_i64),
                obj.get("state").and_then(Value::as_i64),
                obj.get("playerState").and_then(Value::as_i64),
                obj.get("info")
                    .and_then(|v| v.get("playerState"))
                    .and_then(Value::as_i64),
                obj.get("args")
                    .and_then(|v| v.get("state"))
                    .and_then(Value::as_i64),
                obj.get("args")
                    .and_then(|v| v.get("playerState"))
                    .and_then(Value::as_i64),
            ];

            if states.iter().any(|s| *s == Some(ENDED_STATE)) {
                EndSignal::Ended
            } else if states.iter().any(|s| s.is_some()) {
                EndSignal::NotEnded
            } else {
                EndSignal::Unrecognized
            }
        }
        _ => EndSignal::Unrecognized,
    }
}

/// Classify a raw string payload: parse as JSON when possible, otherwise
/// fall back to the substring markers seen in the wild.
pub fn classify_raw(raw: &str) -> EndSignal {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        // Guard against infinite recursion on a JSON string literal.
        if !matches!(value, Value::String(_)) {
            return classify(&value);
        }
    }

    if raw.contains(r#""event":"video-state-change""#) && raw.contains(r#""info":0"#) {
        return EndSignal::Ended;
    }
    if raw.contains(r#""playerState":0"#) || raw.contains(r#""state":0"#) {
        return EndSignal::Ended;
    }
    if raw.contains("onStateChange") && raw.contains(":0") {
        return EndSignal::Ended;
    }

    EndSignal::Unrecognized
}

/// Debounce and poll bookkeeping for end-of-item detection.
///
/// The surface delivers the end signal unreliably, so the player pairs the
/// message listener with low-frequency polling; both paths converge here
/// and a duplicate detection within [`END_DEBOUNCE`] is a no-op.
#[derive(Debug)]
pub struct EndWatch {
    last_end: Option<Instant>,
    poll_deadline: Option<Instant>,
}

impl EndWatch {
    pub fn new() -> Self {
        Self {
            last_end: None,
            poll_deadline: None,
        }
    }

    /// Re-arm the poll budget for a newly started item.
    pub fn arm(&mut self) {
        self.arm_at(Instant::now());
    }

    fn arm_at(&mut self, now: Instant) {
        self.poll_deadline = Some(now + MAX_POLL_PER_ITEM);
    }

    /// Record an end detection. Returns false for duplicates arriving
    /// within the debounce window.
    pub fn accept_end(&mut self) -> bool {
        self.accept_end_at(Instant::now())
    }

    fn accept_end_at(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_end {
            if now.duration_since(last) < END_DEBOUNCE {
                return false;
            }
        }
        self.last_end = Some(now);
        true
    }

    /// Whether the redundant polling path should keep checking.
    pub fn poll_active(&self) -> bool {
        self.poll_active_at(Instant::now())
    }

    fn poll_active_at(&self, now: Instant) -> bool {
        match self.poll_deadline {
            Some(deadline) => now < deadline,
            None => false,
        }
    }
}

impl Default for EndWatch {
    fn default() -> Self {
        Self::new()
    }
}
