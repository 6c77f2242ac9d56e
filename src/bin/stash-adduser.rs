//! stash-adduser: add a user to a stash.
//!
//! Writes directly to the stash files when given `-d`, or goes through the
//! admin interface of a running instance when given `-H` with admin
//! credentials.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, ArgGroup, Parser};
use stash_provision::constants::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_LOCK_TIMEOUT_MS};
use stash_provision::{
    Coordinator, FailureKind, Outcome, ProvisionOptions, ProvisionRequest, RemoteTarget,
    StashError, Storage,
};
use tracing_subscriber::EnvFilter;

const EXIT_FAILED: u8 = 1;
const EXIT_PARTIAL: u8 = 2;
const EXIT_USAGE: u8 = 64;
const EXIT_SOFTWARE: u8 = 70;

#[derive(Parser, Debug)]
#[command(
    name = "stash-adduser",
    version,
    about = "Add a user to a stash, directly on disk or through a running instance."
)]
#[command(group(ArgGroup::new("method").required(true).args(["directory", "host"])))]
struct Cli {
    /// New username.
    #[arg(short = 'u', value_name = "USERNAME")]
    username: String,

    /// New password.
    #[arg(short = 'p', value_name = "PASSWORD")]
    password: Option<String>,

    /// Storage path (direct file method).
    #[arg(short = 'd', value_name = "PATH")]
    directory: Option<PathBuf>,

    /// Create an empty stash at the storage path first if none exists.
    #[arg(long, requires = "directory")]
    init: bool,

    /// Hostname of the running instance (`host:port`).
    #[arg(short = 'H', value_name = "HOST:PORT", requires_all = ["admin_username", "admin_password"])]
    host: Option<String>,

    /// Admin username.
    #[arg(short = 'U', value_name = "USERNAME", requires = "host")]
    admin_username: Option<String>,

    /// Admin password.
    #[arg(short = 'P', value_name = "PASSWORD", env = "STASH_ADMIN_PASSWORD", hide_env_values = true, requires = "host")]
    admin_password: Option<String>,

    /// How long to wait for the master lock, in milliseconds.
    #[arg(long, env = "STASH_LOCK_TIMEOUT_MS", default_value_t = DEFAULT_LOCK_TIMEOUT_MS)]
    lock_timeout_ms: u64,

    /// Connection budget for the running instance, in seconds.
    #[arg(long, env = "STASH_CONNECT_TIMEOUT_SECS", default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS)]
    connect_timeout_secs: u64,

    /// Verbose output; repeat for debug logging.
    #[arg(short = 'v', action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn options(&self) -> ProvisionOptions {
        ProvisionOptions::builder()
            .verbose(self.verbose > 0)
            .lock_timeout_ms(self.lock_timeout_ms)
            .connect_timeout_secs(self.connect_timeout_secs)
            .build()
    }

    fn request(&self) -> Result<ProvisionRequest> {
        let request = match (&self.directory, &self.host) {
            (Some(directory), None) => ProvisionRequest::local(directory, &self.username),
            (None, Some(host)) => {
                let admin_username = self
                    .admin_username
                    .as_deref()
                    .ok_or_else(|| anyhow!("missing required option: -U"))?;
                let admin_password = self
                    .admin_password
                    .as_deref()
                    .ok_or_else(|| anyhow!("missing required option: -P"))?;
                ProvisionRequest::remote(
                    RemoteTarget::new(host, admin_username, admin_password),
                    &self.username,
                )
            }
            _ => return Err(anyhow!("specify exactly one of -d or -H")),
        };
        Ok(match &self.password {
            Some(password) => request.with_password(password),
            None => request,
        })
    }
}

fn init_logging(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => "error",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("installing log subscriber: {err}"))
}

fn init_store(cli: &Cli, options: &ProvisionOptions) -> Result<()> {
    let Some(directory) = cli.directory.as_ref().filter(|_| cli.init) else {
        return Ok(());
    };
    match Storage::initialize(directory, &options.lock) {
        Ok(()) | Err(StashError::AlreadyInitialized { .. }) => Ok(()),
        Err(err) => Err(err)
            .with_context(|| format!("initializing stash at {}", directory.display())),
    }
}

/// The created message is logged by the provisioner itself at `-v`.
fn report(outcome: &Outcome) -> ExitCode {
    match outcome {
        Outcome::Created { .. } => ExitCode::SUCCESS,
        Outcome::Conflict { .. } => {
            eprintln!("{outcome}");
            ExitCode::from(EXIT_FAILED)
        }
        Outcome::Failed { kind, .. } => {
            eprintln!("{outcome}");
            match kind {
                FailureKind::PasswordSetFailed { .. } => ExitCode::from(EXIT_PARTIAL),
                FailureKind::InvalidRequest => ExitCode::from(EXIT_USAGE),
                FailureKind::Internal => ExitCode::from(EXIT_SOFTWARE),
                _ => ExitCode::from(EXIT_FAILED),
            }
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    init_logging(cli.verbose)?;
    let options = cli.options();
    let request = cli.request()?;
    init_store(cli, &options)?;

    let coordinator = Coordinator::new(options);
    let outcome = coordinator.provision(&request);
    Ok(report(&outcome))
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("stash-adduser: {err:#}");
            ExitCode::from(EXIT_FAILED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stash_provision::{ResultCode, UserId};

    #[test]
    fn exit_codes_follow_the_outcome() {
        let user_id = UserId::new(3).unwrap();
        assert_eq!(report(&Outcome::Created { user_id }), ExitCode::SUCCESS);
        assert_eq!(
            report(&Outcome::Conflict {
                username: "alice".into()
            }),
            ExitCode::from(EXIT_FAILED)
        );
        let failed = |kind| report(&Outcome::failed(kind, "x"));
        assert_eq!(
            failed(FailureKind::PasswordSetFailed { user_id }),
            ExitCode::from(EXIT_PARTIAL)
        );
        assert_eq!(failed(FailureKind::InvalidRequest), ExitCode::from(EXIT_USAGE));
        assert_eq!(failed(FailureKind::Internal), ExitCode::from(EXIT_SOFTWARE));
        assert_eq!(
            failed(FailureKind::ConnectionFailed {
                code: ResultCode::TIMEOUT
            }),
            ExitCode::from(EXIT_FAILED)
        );
    }

    #[test]
    fn verbose_flag_reaches_the_provisioner() {
        let cli = Cli::try_parse_from(["stash-adduser", "-u", "alice", "-d", "/tmp/s", "-v"]).unwrap();
        assert!(cli.options().verbose);
        let quiet = Cli::try_parse_from(["stash-adduser", "-u", "alice", "-d", "/tmp/s"]).unwrap();
        assert!(!quiet.options().verbose);
    }
}
