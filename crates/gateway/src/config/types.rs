use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the broker client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Broker host, e.g. `qxbroker.com`
    pub host: String,
    /// Full WebSocket URL, overriding the one derived from `host`
    #[serde(default)]
    pub ws_url: Option<String>,
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Asset the warm-up burst subscribes to
    #[serde(default = "default_asset")]
    pub asset: String,
    /// Candle period in seconds
    #[serde(default = "default_period")]
    pub period: u32,
    #[serde(default = "default_true")]
    pub is_demo: bool,
    #[serde(default = "default_ping_interval")]
    pub ping_interval_ms: u64,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_ms: u64,
    #[serde(default = "default_auth_timeout")]
    pub auth_timeout_ms: u64,
    /// Cadence of the `tick` keepalive, aligned to wall-clock multiples
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Ticks kept per asset, 0 for unbounded
    #[serde(default = "default_tick_capacity")]
    pub tick_capacity: usize,
    /// Settled deals kept, 0 for unbounded
    #[serde(default = "default_trade_history_capacity")]
    pub trade_history_capacity: usize,
    /// Orders kept in the ledger, 0 for unbounded
    #[serde(default = "default_order_capacity")]
    pub order_capacity: usize,
    #[serde(default = "default_session_file")]
    pub session_file: String,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>) -> Self {
        ClientConfig {
            host: host.into(),
            ws_url: None,
            lang: default_lang(),
            asset: default_asset(),
            period: default_period(),
            is_demo: default_true(),
            ping_interval_ms: default_ping_interval(),
            ping_timeout_ms: default_ping_timeout(),
            auth_timeout_ms: default_auth_timeout(),
            tick_interval_ms: default_tick_interval(),
            tick_capacity: default_tick_capacity(),
            trade_history_capacity: default_trade_history_capacity(),
            order_capacity: default_order_capacity(),
            session_file: default_session_file(),
        }
    }

    pub fn with_ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = Some(url.into());
        self
    }

    pub fn with_asset(mut self, asset: impl Into<String>, period: u32) -> Self {
        self.asset = asset.into();
        self.period = period;
        self
    }

    pub fn with_ping(mut self, interval_ms: u64, timeout_ms: u64) -> Self {
        self.ping_interval_ms = interval_ms;
        self.ping_timeout_ms = timeout_ms;
        self
    }

    pub fn with_auth_timeout(mut self, timeout_ms: u64) -> Self {
        self.auth_timeout_ms = timeout_ms;
        self
    }

    pub fn with_tick_interval(mut self, interval_ms: u64) -> Self {
        self.tick_interval_ms = interval_ms;
        self
    }

    /// WebSocket endpoint: the override if set, else derived from the host
    pub fn ws_url(&self) -> String {
        match &self.ws_url {
            Some(url) => url.clone(),
            None => format!("wss://ws2.{}/socket.io/?EIO=3&transport=websocket", self.host),
        }
    }

    /// Origin sent with the WebSocket handshake and base of REST calls
    pub fn https_url(&self) -> String {
        format!("https://{}", self.host)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    /// Silence on the socket longer than this is treated as a dead connection
    pub fn read_timeout(&self) -> Duration {
        self.ping_interval() + self.ping_timeout()
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

fn default_true() -> bool {
    true
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_asset() -> String {
    "EURUSD_otc".to_string()
}

fn default_period() -> u32 {
    60
}

fn default_ping_interval() -> u64 {
    24_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

fn default_auth_timeout() -> u64 {
    10_000
}

fn default_tick_interval() -> u64 {
    20_000
}

fn default_tick_capacity() -> usize {
    1000
}

fn default_trade_history_capacity() -> usize {
    500
}

fn default_order_capacity() -> usize {
    10_000
}

fn default_session_file() -> String {
    "session.json".to_string()
}
