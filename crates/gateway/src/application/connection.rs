//! Connection lifecycle
//!
//! ```text
//! Disconnected ─connect─▶ Connecting ─open─▶ Open ─authorize─▶ Authenticating
//!                              │                                    │
//!                              ▼                       s_authorization / reject
//!                           Errored                                 ▼
//!                                                           Ready / Rejected
//! ```
//!
//! One reader task per connection is the only consumer of inbound frames.
//! A heartbeat task sends `2` every ping interval and a `tick` event on each
//! tick-interval boundary of the wall clock. `close` stops both and joins
//! the reader before returning.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::Mutex as SyncMutex;
use qxlink_core::Session;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::gateway::RequestGateway;
use super::router::EventRouter;
use crate::config::ClientConfig;
use crate::domain::{ConnectionState, Connector, FrameSource, HandshakeHeaders, RouteSignal};
use crate::error::{GatewayError, GatewayResult, TransportError};

struct ConnectionTasks {
    shutdown: watch::Sender<bool>,
    reader: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
}

/// Handles shared between the manager and its reader task
#[derive(Clone)]
struct Lifecycle {
    status: watch::Sender<ConnectionState>,
    session: Arc<ArcSwap<Session>>,
    last_error: Arc<SyncMutex<Option<String>>>,
}

impl Lifecycle {
    fn set(&self, state: ConnectionState) {
        let previous = self.status.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Connection state");
        }
    }

    fn current(&self) -> ConnectionState {
        *self.status.borrow()
    }

    fn fail(&self, reason: String) {
        error!(reason = %reason, "Connection errored");
        *self.last_error.lock() = Some(reason);
        self.set(ConnectionState::Errored);
    }

    fn reject(&self) {
        let session = self.session.load();
        self.session.store(Arc::new(session.without_token()));
        *self.last_error.lock() = Some("authorization rejected".to_string());
        self.set(ConnectionState::Rejected);
    }
}

/// Owns the single live connection to the broker
pub struct ConnectionManager {
    config: Arc<ClientConfig>,
    connector: Arc<dyn Connector>,
    gateway: RequestGateway,
    lifecycle: Lifecycle,
    tasks: Mutex<Option<ConnectionTasks>>,
}

impl ConnectionManager {
    pub fn new(
        config: Arc<ClientConfig>,
        connector: Arc<dyn Connector>,
        gateway: RequestGateway,
        session: Session,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            connector,
            gateway,
            lifecycle: Lifecycle {
                status,
                session: Arc::new(ArcSwap::from_pointee(session)),
                last_error: Arc::new(SyncMutex::new(None)),
            },
            tasks: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.lifecycle.current()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.lifecycle.status.subscribe()
    }

    pub fn last_error(&self) -> Option<String> {
        self.lifecycle.last_error.lock().clone()
    }

    pub fn session(&self) -> Arc<Session> {
        self.lifecycle.session.load_full()
    }

    /// Replace the session, e.g. after a fresh login
    pub fn set_session(&self, session: Session) {
        self.lifecycle.session.store(Arc::new(session));
    }

    pub fn gateway(&self) -> &RequestGateway {
        &self.gateway
    }

    /// Open a new connection, replacing any live one, and send the warm-up
    /// burst. Returns once the socket is open; authorization is separate.
    pub async fn connect(&self) -> GatewayResult<ConnectionState> {
        let mut tasks = self.tasks.lock().await;
        self.shutdown(&mut tasks).await;

        *self.lifecycle.last_error.lock() = None;
        self.lifecycle.set(ConnectionState::Connecting);

        let session = self.lifecycle.session.load_full();
        let headers = HandshakeHeaders {
            user_agent: session.user_agent.clone(),
            origin: self.config.https_url(),
            cookies: session.cookies.clone(),
        };
        let url = self.config.ws_url();
        info!(url = %url, "Connecting");

        let (sink, source) = match self.connector.open(&url, &headers).await {
            Ok(halves) => halves,
            Err(e) => {
                self.lifecycle.fail(e.to_string());
                return Err(e.into());
            }
        };
        self.gateway.attach(sink).await;
        self.lifecycle.set(ConnectionState::Open);
        info!("WebSocket client connected");

        let (shutdown, shutdown_rx) = watch::channel(false);
        let reader = tokio::spawn(read_loop(
            source,
            EventRouter::new(self.gateway.state().clone()),
            self.gateway.clone(),
            self.lifecycle.clone(),
            self.config.read_timeout(),
            shutdown_rx,
        ));

        if let Err(e) = self
            .gateway
            .warm_up(&self.config.asset, self.config.period)
            .await
        {
            let _ = shutdown.send(true);
            self.gateway.close().await;
            let _ = reader.await;
            self.lifecycle.fail(format!("warm-up failed: {}", e));
            return Err(e);
        }

        let heartbeat = tokio::spawn(heartbeat_loop(
            self.gateway.clone(),
            self.config.ping_interval(),
            self.config.tick_interval(),
        ));
        *tasks = Some(ConnectionTasks {
            shutdown,
            reader,
            heartbeat,
        });
        Ok(ConnectionState::Open)
    }

    /// Send the session token and wait for the broker's verdict
    pub async fn send_authorization(&self, timeout: Duration) -> GatewayResult<()> {
        let session = self.lifecycle.session.load_full();
        let Some(token) = session.token() else {
            return Err(GatewayError::AuthRejected);
        };

        let mut status = self.lifecycle.status.subscribe();
        status.borrow_and_update();
        self.lifecycle.set(ConnectionState::Authenticating);
        if let Err(e) = self.gateway.authorize(token, self.config.is_demo).await {
            self.lifecycle.fail(e.to_string());
            return Err(e);
        }
        self.gateway.state().set_demo(self.config.is_demo);

        let verdict = tokio::time::timeout(timeout, async {
            loop {
                if status.changed().await.is_err() {
                    return Err(GatewayError::Transport(TransportError::Closed));
                }
                let state = *status.borrow_and_update();
                match state {
                    ConnectionState::Ready => return Ok(()),
                    ConnectionState::Rejected => return Err(GatewayError::AuthRejected),
                    ConnectionState::Errored => {
                        return Err(GatewayError::Errored(
                            self.last_error().unwrap_or_else(|| "unknown error".to_string()),
                        ));
                    }
                    ConnectionState::Disconnected => {
                        return Err(GatewayError::Transport(TransportError::Closed));
                    }
                    _ => {}
                }
            }
        })
        .await;

        match verdict {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "No authorization verdict");
                Err(GatewayError::Timeout)
            }
        }
    }

    /// Stop the heartbeat, send a close frame and join the reader.
    /// Safe to call in any state and more than once.
    pub async fn close(&self) {
        let mut tasks = self.tasks.lock().await;
        self.shutdown(&mut tasks).await;
        self.lifecycle.set(ConnectionState::Disconnected);
    }

    async fn shutdown(&self, tasks: &mut Option<ConnectionTasks>) {
        let Some(ConnectionTasks {
            shutdown,
            reader,
            heartbeat,
        }) = tasks.take()
        else {
            self.gateway.close().await;
            return;
        };

        info!("Closing websocket connection");
        heartbeat.abort();
        let _ = shutdown.send(true);
        self.gateway.close().await;
        if let Err(e) = reader.await {
            warn!(error = %e, "Reader task ended abnormally");
        }
        let _ = heartbeat.await;
    }
}

/// Engine.IO pings every `ping_every`, plus a `tick` event on wall-clock
/// multiples of `tick_every` the way the web terminal keeps its session warm
async fn heartbeat_loop(gateway: RequestGateway, ping_every: Duration, tick_every: Duration) {
    let start = tokio::time::Instant::now();
    let mut ping = tokio::time::interval_at(start + ping_every, ping_every);
    let first_tick = gateway.clock().until_next_multiple(tick_every);
    let mut tick = tokio::time::interval_at(start + first_tick, tick_every);
    loop {
        let sent = tokio::select! {
            _ = ping.tick() => gateway.send_raw("2").await,
            _ = tick.tick() => gateway.tick().await,
        };
        if let Err(e) = sent {
            debug!(error = %e, "Heartbeat stopped");
            break;
        }
    }
}

async fn read_loop(
    mut source: Box<dyn FrameSource>,
    mut router: EventRouter,
    gateway: RequestGateway,
    lifecycle: Lifecycle,
    read_timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            next = tokio::time::timeout(read_timeout, source.next_frame()) => next,
        };

        let raw = match next {
            Err(_) => {
                lifecycle.fail(
                    TransportError::Receive(format!("no frames for {:?}", read_timeout)).to_string(),
                );
                break;
            }
            Ok(None) => {
                info!("Websocket connection closed");
                lifecycle.set(ConnectionState::Disconnected);
                break;
            }
            Ok(Some(Err(e))) => {
                lifecycle.fail(e.to_string());
                break;
            }
            Ok(Some(Ok(raw))) => raw,
        };

        let Some(signal) = router.route(&raw) else {
            continue;
        };
        match signal {
            RouteSignal::ReplyPong => {
                if let Err(e) = gateway.send_raw("3").await {
                    debug!(error = %e, "Pong not sent");
                }
            }
            RouteSignal::Authorized => {
                lifecycle.set(ConnectionState::Ready);
            }
            RouteSignal::Rejected => {
                lifecycle.reject();
            }
            RouteSignal::Errored(reason) => {
                *lifecycle.last_error.lock() = Some(reason.clone());
                if matches!(
                    lifecycle.current(),
                    ConnectionState::Open | ConnectionState::Authenticating
                ) {
                    lifecycle.set(ConnectionState::Errored);
                }
            }
            RouteSignal::Disconnected => {
                lifecycle.set(ConnectionState::Disconnected);
                break;
            }
        }
    }

    // Only a shutdown leaves the sink for `close` to handle
    if !*shutdown.borrow() {
        gateway.close().await;
    }
    debug!("Reader task finished");
}
