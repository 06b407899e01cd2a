use serde::{Deserialize, Serialize};

/// Authenticated browser session captured by the login flow
///
/// Cookies and user agent are fixed once captured. The token is the only
/// mutable part: it is dropped when the broker rejects it, which forces a
/// fresh login before the next connection attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub cookies: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user_agent: String,
}

impl Session {
    pub fn new(
        cookies: impl Into<String>,
        token: Option<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            cookies: cookies.into(),
            token,
            user_agent: user_agent.into(),
        }
    }

    /// The token, treating an empty string the same as no token
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    /// Copy of this session with the token invalidated
    pub fn without_token(&self) -> Self {
        Self {
            cookies: self.cookies.clone(),
            token: None,
            user_agent: self.user_agent.clone(),
        }
    }
}
