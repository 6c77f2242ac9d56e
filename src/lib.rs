#![deny(clippy::all, clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![cfg_attr(test, allow(clippy::uninlined_format_args))]
#![allow(clippy::module_name_repetitions)]
//
// Documentation lints: internal helpers are self-describing; public APIs carry docs.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
//
// Durations in milliseconds are far below the u64 range.
#![allow(clippy::cast_possible_truncation)]
//
// Builders take owned values and return Self without must_use on every method.
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Provision users into a stash, either directly in a stash directory under
//! its master lock or through the admin interface of a running instance.
//!
//! ```no_run
//! use stash_provision::{Coordinator, Outcome, ProvisionOptions, ProvisionRequest};
//!
//! let coordinator = Coordinator::new(ProvisionOptions::default());
//! let request = ProvisionRequest::local("/var/lib/stash", "alice").with_password("s3cret");
//! match coordinator.provision(&request) {
//!     Outcome::Created { user_id } => println!("created {user_id}"),
//!     other => eprintln!("{other}"),
//! }
//! ```

/// The stash-provision crate version (matches `Cargo.toml`).
pub const STASH_PROVISION_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod constants;
pub mod error;
pub mod lock;
pub mod provision;
pub mod remote;
pub mod storage;
pub mod types;

pub use error::{Result, StashError};
pub use lock::MasterLock;
pub use provision::{
    Coordinator, Creation, LocalProvisioner, Provisioner, RemoteProvisioner, StepError, run,
};
#[cfg(feature = "remote")]
pub use remote::{HttpSessionFactory, HttpStashClient};
pub use remote::{ResultCode, SessionFactory, StashClient};
pub use storage::{ProcessOptions, Storage};
pub use types::{
    Backend, FailureKind, LockSettings, Outcome, ProvisionOptions, ProvisionOptionsBuilder,
    ProvisionRequest, RemoteSettings, RemoteTarget, UserId, UserRecord,
};
