//! qxlink Runner
//!
//! Small command-line host for the broker client: builds the client from a
//! config file and a session taken from the environment.

pub mod provider;

pub use provider::StaticSessionProvider;
