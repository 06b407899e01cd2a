//! Broker client facade
//!
//! Wires the ports to the connection manager and runs the login flow the
//! way a browser session would: reuse the stored token, log in when there is
//! none, and log in again once if the broker rejects the token.

use std::sync::Arc;

use qxlink_core::{Profile, Session};
use qxlink_ports::{AuthError, Clock, Credentials, HttpClient, HttpError, SessionProvider, SessionStore};
use tokio::sync::watch;
use tracing::{info, warn};

use super::connection::ConnectionManager;
use super::gateway::RequestGateway;
use super::state::{SharedState, StateCapacity};
use crate::config::ClientConfig;
use crate::domain::{ConnectionState, Connector};
use crate::error::{GatewayError, GatewayResult};
use crate::infrastructure::{JsonFileSessionStore, RestSettingsClient, SystemClock, WsConnector};

/// Builder for [`BrokerClient`]; every port has a production default except
/// the session provider
pub struct BrokerClientBuilder {
    config: ClientConfig,
    connector: Option<Arc<dyn Connector>>,
    clock: Option<Arc<dyn Clock>>,
    store: Option<Arc<dyn SessionStore>>,
    http: Option<Arc<dyn HttpClient>>,
    provider: Option<(Arc<dyn SessionProvider>, Credentials)>,
}

impl BrokerClientBuilder {
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_session_provider(
        mut self,
        provider: Arc<dyn SessionProvider>,
        credentials: Credentials,
    ) -> Self {
        self.provider = Some((provider, credentials));
        self
    }

    pub fn build(self) -> GatewayResult<BrokerClient> {
        self.config.validate()?;
        let config = Arc::new(self.config);

        let state = SharedState::new(StateCapacity::from(config.as_ref()));
        state.set_demo(config.is_demo);
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let gateway = RequestGateway::new(state, clock);

        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WsConnector::new()));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(JsonFileSessionStore::new(&config.session_file)));
        let http = self
            .http
            .unwrap_or_else(|| Arc::new(RestSettingsClient::new(config.https_url(), &config.lang)));

        let connection =
            ConnectionManager::new(config.clone(), connector, gateway, Session::default());

        Ok(BrokerClient {
            config,
            connection,
            store,
            http,
            provider: self.provider,
        })
    }
}

/// Entry point for callers: connect, trade through the gateway, read state
pub struct BrokerClient {
    config: Arc<ClientConfig>,
    connection: ConnectionManager,
    store: Arc<dyn SessionStore>,
    http: Arc<dyn HttpClient>,
    provider: Option<(Arc<dyn SessionProvider>, Credentials)>,
}

impl BrokerClient {
    pub fn builder(config: ClientConfig) -> BrokerClientBuilder {
        BrokerClientBuilder {
            config,
            connector: None,
            clock: None,
            store: None,
            http: None,
            provider: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn gateway(&self) -> &RequestGateway {
        self.connection.gateway()
    }

    pub fn state(&self) -> &SharedState {
        self.connection.gateway().state()
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe_state()
    }

    pub fn last_error(&self) -> Option<String> {
        self.connection.last_error()
    }

    /// Connect and authorize. Resolves once the session is ready, or with
    /// the failure that stopped it.
    pub async fn connect(&self) -> GatewayResult<()> {
        let session = match self.store.load()? {
            Some(session) if session.has_token() => session,
            _ => self.login().await?,
        };
        self.connection.set_session(session);

        match self.open_and_authorize().await {
            Err(err @ (GatewayError::AuthRejected | GatewayError::Timeout)) => {
                warn!(error = %err, "Authorization failed, logging in again");
                self.store.save(&self.connection.session())?;
                let session = self.login().await?;
                self.connection.set_session(session);
                let retried = self.open_and_authorize().await;
                if matches!(retried, Err(GatewayError::AuthRejected)) {
                    self.store.save(&self.connection.session())?;
                }
                retried
            }
            other => other,
        }
    }

    async fn open_and_authorize(&self) -> GatewayResult<()> {
        self.connection.connect().await?;
        self.connection
            .send_authorization(self.config.auth_timeout())
            .await?;
        info!("Broker session ready");
        Ok(())
    }

    async fn login(&self) -> GatewayResult<Session> {
        let (provider, credentials) = self
            .provider
            .as_ref()
            .ok_or(GatewayError::Auth(AuthError::MissingToken))?;

        info!(email = %credentials.email, "Authenticating user");
        let session = provider.authenticate(credentials).await?;
        if !session.has_token() {
            return Err(AuthError::MissingToken.into());
        }
        self.store.save(&session)?;
        Ok(session)
    }

    /// Fetch account settings and store the resulting profile
    pub async fn refresh_profile(&self) -> GatewayResult<Profile> {
        let settings = self.http.get_settings(&self.connection.session()).await?;
        let profile = Profile::from_settings(&settings)
            .ok_or_else(|| HttpError::Parse("settings without profile data".to_string()))?;
        self.state().set_profile(profile.clone());
        Ok(profile)
    }

    pub async fn close(&self) {
        self.connection.close().await;
    }
}
