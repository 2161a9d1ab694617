use serde::Deserialize;

/// Marker that prefixes every significant line of the stream.
pub const DATA_PREFIX: &str = "data: ";

/// Sentinel payload sent after the last event.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One event payload. Every field is optional and applied independently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StreamEvent {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StreamEvent {
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.title.is_none() && self.error.is_none()
    }
}

/// Classification of a single decoded line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Not a `data: ` line (blank separators included).
    Ignored,
    /// The `[DONE]` sentinel. Completion is detected by stream exhaustion instead.
    Done,
    Event(StreamEvent),
    /// A `data: ` line whose payload is not a JSON object.
    Malformed(String),
}

impl Frame {
    pub fn parse(line: &str) -> Frame {
        let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
            return Frame::Ignored;
        };
        let payload = rest.trim();
        if payload == DONE_SENTINEL {
            return Frame::Done;
        }
        match serde_json::from_str::<StreamEvent>(payload) {
            Ok(event) => Frame::Event(event),
            Err(_) => Frame::Malformed(payload.to_string()),
        }
    }
}
