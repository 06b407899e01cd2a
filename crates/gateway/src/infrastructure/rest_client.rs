use async_trait::async_trait;
use qxlink_core::Session;
use qxlink_ports::{HttpClient, HttpError};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

const SETTINGS_PATH: &str = "/api/v1/cabinets/digest";

#[derive(Error, Debug)]
pub enum RestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convert infrastructure RestError to the port's HttpError
impl From<RestError> for HttpError {
    fn from(err: RestError) -> Self {
        match err {
            RestError::Http(e) => HttpError::Network(e.to_string()),
            RestError::Status { status, body } => HttpError::Status { status, body },
            RestError::Parse(msg) => HttpError::Parse(msg),
        }
    }
}

/// Account settings over the broker's REST API
#[derive(Clone)]
pub struct RestSettingsClient {
    client: Client,
    base_url: String,
    lang: String,
}

impl RestSettingsClient {
    pub fn new(base_url: impl Into<String>, lang: impl Into<String>) -> Self {
        RestSettingsClient {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            lang: lang.into(),
        }
    }

    async fn get(&self, path: &str, session: &Session) -> Result<Value, RestError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET");

        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("Referer", format!("{}/{}/trade", self.base_url, self.lang));
        if !session.cookies.is_empty() {
            request = request.header("Cookie", &session.cookies);
        }
        if !session.user_agent.is_empty() {
            request = request.header("User-Agent", &session.user_agent);
        }

        let resp = request.send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response(&self, resp: reqwest::Response) -> Result<Value, RestError> {
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(RestError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| RestError::Parse(e.to_string()))
    }
}

#[async_trait]
impl HttpClient for RestSettingsClient {
    async fn get_settings(&self, session: &Session) -> Result<Value, HttpError> {
        Ok(self.get(SETTINGS_PATH, session).await?)
    }
}
