//! Error types for the gateway crate

use qxlink_core::RequestId;
use qxlink_ports::{AuthError, HttpError, StoreError};
use thiserror::Error;

use crate::config::ConfigError;

/// Transport-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Receive failed: {0}")]
    Receive(String),

    #[error("Connection closed")]
    Closed,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Gateway-level errors returned to callers
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Session token rejected by broker")]
    AuthRejected,

    #[error("Timed out waiting for broker")]
    Timeout,

    #[error("Not connected")]
    NotConnected,

    #[error("Connection errored: {0}")]
    Errored(String),

    #[error("Unknown order: {0}")]
    UnknownOrder(RequestId),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Login failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Settings request failed: {0}")]
    Http(#[from] HttpError),

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),
}

/// Problems met while routing an inbound frame
///
/// These never reach callers; the router logs them and drops the frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("No order for {0}")]
    CorrelationMiss(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;
