use std::fmt;

/// Lifecycle of the broker connection
///
/// `Disconnected → Connecting → Open → Authenticating → Ready`, with
/// `Rejected` and `Errored` as terminal states until the caller reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    Authenticating,
    Ready,
    Rejected,
    Errored,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Authenticating => "authenticating",
            ConnectionState::Ready => "ready",
            ConnectionState::Rejected => "rejected",
            ConnectionState::Errored => "errored",
        };
        write!(f, "{}", name)
    }
}
