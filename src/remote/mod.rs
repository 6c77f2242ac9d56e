//! Client side of a running instance's admin interface.
//!
//! The provisioning core only talks to [`StashClient`]; the HTTP transport in
//! [`HttpStashClient`] is one implementation of it.

mod code;
#[cfg(feature = "remote")]
mod http;

pub use code::ResultCode;
#[cfg(feature = "remote")]
pub use http::{HttpSessionFactory, HttpStashClient};

use crate::types::{RemoteSettings, UserId};

/// Operations a session with a running instance must support.
///
/// Every request other than `connect` returns [`ResultCode::NOT_CONNECTED`]
/// until `connect` has succeeded.
pub trait StashClient {
    /// Identity used to authorize every subsequent request.
    fn set_authority(&mut self, username: &str, password: &str);

    /// Add a candidate server. Lower priorities are tried first.
    fn add_server(&mut self, host: &str, priority: u32) -> Result<(), ResultCode>;

    /// Establish the session within the configured connect budget.
    fn connect(&mut self) -> Result<(), ResultCode>;

    /// Create `username` and return the raw id the server assigned.
    fn create_username(&mut self, username: &str) -> Result<u64, ResultCode>;

    fn set_password(&mut self, user_id: UserId, password: &str) -> Result<(), ResultCode>;

    /// Tear the session down. Safe to call more than once.
    fn close(&mut self);
}

/// Produces a fresh, unconnected client for each provisioning run.
pub trait SessionFactory: Send + Sync {
    fn open_session(&self, settings: &RemoteSettings) -> Box<dyn StashClient>;
}
