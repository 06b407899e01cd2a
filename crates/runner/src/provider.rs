use async_trait::async_trait;
use qxlink_core::Session;
use qxlink_ports::{AuthError, Credentials, SessionProvider};

pub const TOKEN_VAR: &str = "QXLINK_TOKEN";
pub const COOKIES_VAR: &str = "QXLINK_COOKIES";
pub const USER_AGENT_VAR: &str = "QXLINK_USER_AGENT";
pub const EMAIL_VAR: &str = "QXLINK_EMAIL";
pub const PASSWORD_VAR: &str = "QXLINK_PASSWORD";

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Session provider that hands out a session captured elsewhere, e.g. from a
/// logged-in browser, instead of running the login flow itself
#[derive(Debug, Clone)]
pub struct StaticSessionProvider {
    session: Session,
}

impl StaticSessionProvider {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Read the session from `QXLINK_TOKEN`, `QXLINK_COOKIES` and
    /// `QXLINK_USER_AGENT`
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let token = lookup(TOKEN_VAR).filter(|t| !t.trim().is_empty());
        let cookies = lookup(COOKIES_VAR).unwrap_or_default();
        let user_agent = lookup(USER_AGENT_VAR).unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        Self::new(Session::new(cookies, token, user_agent))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        if !self.session.has_token() {
            return Err(AuthError::Flow(format!(
                "no token for {}; set {}",
                credentials.email, TOKEN_VAR
            )));
        }
        Ok(self.session.clone())
    }
}

/// Credentials from `QXLINK_EMAIL` / `QXLINK_PASSWORD`, empty when unset
pub fn credentials_from_env() -> Credentials {
    Credentials::new(
        std::env::var(EMAIL_VAR).unwrap_or_default(),
        std::env::var(PASSWORD_VAR).unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[tokio::test]
    async fn test_session_from_lookup() {
        let provider = StaticSessionProvider::from_lookup(lookup(&[
            (TOKEN_VAR, "abc"),
            (COOKIES_VAR, "sid=1"),
            (USER_AGENT_VAR, "agent/2"),
        ]));

        let session = provider
            .authenticate(&Credentials::new("me@example.com", "pw"))
            .await
            .unwrap();
        assert_eq!(session.token(), Some("abc"));
        assert_eq!(session.cookies, "sid=1");
        assert_eq!(session.user_agent, "agent/2");
    }

    #[tokio::test]
    async fn test_missing_token_fails_login() {
        let provider = StaticSessionProvider::from_lookup(lookup(&[(TOKEN_VAR, "  ")]));

        assert!(!provider.session().has_token());
        assert_eq!(provider.session().user_agent, DEFAULT_USER_AGENT);
        let err = provider
            .authenticate(&Credentials::new("me@example.com", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Flow(_)));
    }
}
