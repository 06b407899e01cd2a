//! qxlink Ports
//!
//! Port definitions (traits) for the collaborators the protocol core relies
//! on but does not implement: login, settings retrieval, session persistence
//! and time.

mod clock;
mod error;
mod http;
mod session;

pub use clock::Clock;
pub use error::{AuthError, HttpError, StoreError};
pub use http::HttpClient;
pub use session::{Credentials, SessionProvider, SessionStore};
