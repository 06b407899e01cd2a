use serde_json::Value;

/// One decoded inbound frame
///
/// `raw` keeps the frame text (after the binary marker is stripped) so the
/// router can run substring checks on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub raw: String,
    pub kind: FrameKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameKind {
    /// `2`
    Ping,
    /// `3`
    Pong,
    /// `40`
    Connected,
    /// `41`
    Disconnect,
    /// `0{...}` Engine.IO open packet
    Handshake(Value),
    /// `451-["tag", {...placeholder}]`, announces the next JSON frame
    Tag(String),
    /// `42["action", payload]`
    Event {
        action: String,
        payload: Option<Value>,
    },
    /// Binary attachment or other JSON body
    Json(Value),
    /// Anything that could not be parsed
    Raw,
}

impl Frame {
    pub fn new(raw: impl Into<String>, kind: FrameKind) -> Self {
        Self {
            raw: raw.into(),
            kind,
        }
    }
}

/// Correlation tags announced by `451-` frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrelationTag {
    SettingsList,
    HistoryListV2,
    InstrumentsList,
    Other(String),
}

impl CorrelationTag {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "settings/list" => CorrelationTag::SettingsList,
            "history/list/v2" => CorrelationTag::HistoryListV2,
            "instruments/list" => CorrelationTag::InstrumentsList,
            other => CorrelationTag::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CorrelationTag::SettingsList => "settings/list",
            CorrelationTag::HistoryListV2 => "history/list/v2",
            CorrelationTag::InstrumentsList => "instruments/list",
            CorrelationTag::Other(tag) => tag,
        }
    }
}

/// Remembers the last announced tag until the next JSON frame takes it
#[derive(Debug, Default, Clone)]
pub struct TagTracker {
    pub awaiting: Option<CorrelationTag>,
}

impl TagTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A newer tag replaces one that was never consumed
    pub fn remember(&mut self, tag: CorrelationTag) {
        self.awaiting = Some(tag);
    }

    pub fn take(&mut self) -> Option<CorrelationTag> {
        self.awaiting.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_parse_known_and_unknown() {
        assert_eq!(CorrelationTag::parse("settings/list"), CorrelationTag::SettingsList);
        assert_eq!(CorrelationTag::parse("history/list/v2"), CorrelationTag::HistoryListV2);
        assert_eq!(
            CorrelationTag::parse("indicator/list"),
            CorrelationTag::Other("indicator/list".to_string())
        );
        assert_eq!(CorrelationTag::parse("indicator/list").as_str(), "indicator/list");
    }

    #[test]
    fn test_tag_tracker_single_use() {
        let mut tracker = TagTracker::new();
        tracker.remember(CorrelationTag::SettingsList);
        tracker.remember(CorrelationTag::InstrumentsList);

        assert_eq!(tracker.take(), Some(CorrelationTag::InstrumentsList));
        assert_eq!(tracker.take(), None);
    }
}
