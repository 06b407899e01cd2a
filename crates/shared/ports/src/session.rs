use std::fmt;

use async_trait::async_trait;
use qxlink_core::Session;

use crate::{AuthError, StoreError};

/// Login credentials handed to the session provider
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Port for the login flow that yields a session
///
/// Real implementations drive a browser; the core only needs the resulting
/// cookies, token and user agent.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, AuthError>;
}

/// Port for session persistence between runs
pub trait SessionStore: Send + Sync {
    /// Load the saved session. A store with nothing saved yields `None`.
    fn load(&self) -> Result<Option<Session>, StoreError>;

    fn save(&self, session: &Session) -> Result<(), StoreError>;
}
