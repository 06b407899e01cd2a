//! qxlink Gateway
//!
//! WebSocket session protocol layer for the broker. Provides:
//! - Frame codec for the socket.io / Engine.IO v3 wire format
//! - Event router that turns pushed frames into typed session state
//! - Connection lifecycle with authorization and rejection handling
//! - Request gateway for outbound commands over a single writer
//!
//! ## Architecture
//!
//! ```text
//!        Broker (wss://ws2.<host>/socket.io/)
//!                 │            ▲
//!          frames │            │ 42["action",payload]
//!        ┌────────▼───┐   ┌────┴───────────┐
//!        │ reader task│   │ RequestGateway │◀── callers (buy, tick, ...)
//!        │ EventRouter│   │ (single writer)│
//!        └────────┬───┘   └────────────────┘
//!                 │ write lock
//!        ┌────────▼────────┐
//!        │   SharedState   │──▶ callers (balance, ticks, orders, ...)
//!        └─────────────────┘
//! ```
//!
//! `ConnectionManager` owns the reader and heartbeat tasks and publishes the
//! connection state; `BrokerClient` composes it with the login, settings and
//! session-store ports.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

// Re-export commonly used types
pub use application::{
    BrokerClient, BrokerClientBuilder, BuyRequest, ConnectionManager, EventRouter, OrderLedger,
    PendingRequest, RequestGateway, SessionState, SharedState, StateCapacity,
};
pub use config::{ClientConfig, ConfigError, load_config, load_config_from_str, load_default_config};
pub use domain::{
    ConnectionState, Connector, CorrelationTag, Frame, FrameKind, FrameSink, FrameSource,
    HandshakeHeaders, InboundMessage, RouteSignal, TagTracker,
};
pub use error::{GatewayError, GatewayResult, RouteError, TransportError};
pub use infrastructure::{
    ChannelConnector, ChannelPeer, JsonFileSessionStore, RestError, RestSettingsClient, SystemClock,
    WsConnector, codec,
};
