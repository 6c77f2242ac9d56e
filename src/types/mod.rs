//! Public types exposed by the `stash-provision` crate.

pub mod options;
pub mod outcome;
pub mod request;
pub mod user;

pub use options::{LockSettings, ProvisionOptions, ProvisionOptionsBuilder, RemoteSettings};
pub use outcome::{FailureKind, Outcome};
pub(crate) use request::Target;
pub use request::{Backend, ProvisionRequest, RemoteTarget};
pub use user::{UserId, UserRecord};
