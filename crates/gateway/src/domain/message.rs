use serde_json::Value;

use super::frame::CorrelationTag;

/// Closed set of inbound messages the router understands
///
/// Variants are listed in classification priority order.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Ping,
    Disconnect,
    AuthRejected,
    Authorized,
    Tag(CorrelationTag),
    Signals {
        entries: Vec<Value>,
        time: Option<i64>,
    },
    Balance(Value),
    Candles(Value),
    OrderOpened(Value),
    OptionSold(Value),
    Deals(Vec<Value>),
    DemoRefilled(Value),
    Error(String),
    Tagged {
        tag: CorrelationTag,
        payload: Value,
    },
    Ticks(Vec<Value>),
    Sentiment(Vec<Value>),
    /// Recognised frame with nothing to apply (pong, handshake, events)
    Ignored,
    /// Nothing matched
    Unknown,
}

/// What the reader loop must do after a frame was applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteSignal {
    ReplyPong,
    Disconnected,
    Authorized,
    Rejected,
    Errored(String),
}
