//! Tunables for a provisioning run: verbosity, lock waiting and remote budgets.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_LOCK_POLL_MS, DEFAULT_LOCK_TIMEOUT_MS,
    DEFAULT_MAX_CONNECT_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SERVER_PRIORITY,
};

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

fn default_lock_poll_ms() -> u64 {
    DEFAULT_LOCK_POLL_MS
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_server_priority() -> u32 {
    DEFAULT_SERVER_PRIORITY
}

fn default_max_connect_attempts() -> u32 {
    DEFAULT_MAX_CONNECT_ATTEMPTS
}

/// How long to wait for the master lock of a local store.
///
/// The lock is attempted without blocking and retried every
/// `poll_interval_ms` until `timeout_ms` has elapsed. A timeout of zero
/// means a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSettings {
    #[serde(default = "default_lock_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_lock_poll_ms")]
    pub poll_interval_ms: u64,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_LOCK_POLL_MS,
        }
    }
}

impl LockSettings {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Budgets for talking to a running instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Bound on establishing a connection to one candidate server.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Priority assigned to the host named in the request.
    #[serde(default = "default_server_priority")]
    pub server_priority: u32,
    #[serde(default = "default_max_connect_attempts")]
    pub max_connect_attempts: u32,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            server_priority: DEFAULT_SERVER_PRIORITY,
            max_connect_attempts: DEFAULT_MAX_CONNECT_ATTEMPTS,
        }
    }
}

impl RemoteSettings {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Configuration handed to the [`crate::Coordinator`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionOptions {
    /// Report successful creations at info level instead of debug.
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub lock: LockSettings,
    #[serde(default)]
    pub remote: RemoteSettings,
}

impl ProvisionOptions {
    /// Start a fluent builder for `ProvisionOptions`.
    #[must_use]
    pub fn builder() -> ProvisionOptionsBuilder {
        ProvisionOptionsBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProvisionOptionsBuilder {
    inner: ProvisionOptions,
}

impl ProvisionOptionsBuilder {
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.inner.verbose = verbose;
        self
    }

    #[must_use]
    pub fn lock_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.inner.lock.timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub fn lock_poll_interval_ms(mut self, poll_interval_ms: u64) -> Self {
        self.inner.lock.poll_interval_ms = poll_interval_ms;
        self
    }

    #[must_use]
    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.inner.remote.connect_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.inner.remote.request_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn server_priority(mut self, priority: u32) -> Self {
        self.inner.remote.server_priority = priority;
        self
    }

    #[must_use]
    pub fn max_connect_attempts(mut self, attempts: u32) -> Self {
        self.inner.remote.max_connect_attempts = attempts;
        self
    }

    #[must_use]
    pub fn build(self) -> ProvisionOptions {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let options: ProvisionOptions =
            serde_json::from_str(r#"{"verbose":true,"lock":{"timeout_ms":50}}"#).unwrap();
        assert!(options.verbose);
        assert_eq!(options.lock.timeout_ms, 50);
        assert_eq!(options.lock.poll_interval_ms, DEFAULT_LOCK_POLL_MS);
        assert_eq!(
            options.remote.connect_timeout(),
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)
        );
    }

    #[test]
    fn builder_overrides_budgets() {
        let options = ProvisionOptions::builder()
            .lock_timeout_ms(0)
            .connect_timeout_secs(3)
            .max_connect_attempts(1)
            .build();
        assert_eq!(options.lock.timeout(), Duration::ZERO);
        assert_eq!(options.remote.connect_timeout_secs, 3);
        assert_eq!(options.remote.max_connect_attempts, 1);
        assert!(!options.verbose);
    }
}
