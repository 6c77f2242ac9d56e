//! Shared constants for the stash directory layout and provisioning defaults.

/// Metadata document holding the namespace index.
pub const META_FILE_NAME: &str = "stash.meta";
/// Lock file guarding metadata read-modify-write sequences.
pub const MASTER_LOCK_FILE_NAME: &str = "master.lock";
/// Directory holding payload segments.
pub const DATA_DIR_NAME: &str = "data";

/// Current metadata format version.
pub const META_FORMAT_VERSION: u32 = 1;

/// First user id handed out by a fresh store. Zero is never a valid user id.
pub const FIRST_USER_ID: u64 = 1;

/// Upper bound on username length in bytes.
pub const MAX_USERNAME_BYTES: usize = 64;

/// How long a local provisioning run waits for the master lock.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 2_000;
/// Sleep between non-blocking lock attempts.
pub const DEFAULT_LOCK_POLL_MS: u64 = 25;

/// Connection budget for a running instance, in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Per-request budget once connected, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Priority given to servers added from the command line.
pub const DEFAULT_SERVER_PRIORITY: u32 = 10;
/// How many candidate servers `connect` tries before giving up.
pub const DEFAULT_MAX_CONNECT_ATTEMPTS: u32 = 3;

/// Admin API paths on a running instance.
pub const ADMIN_SESSION_PATH: &str = "/admin/v1/session";
pub const ADMIN_USERS_PATH: &str = "/admin/v1/users";
