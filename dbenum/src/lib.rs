//! Command-line front end for dbenum.
//!
//! The command tree is built at runtime from the adapter registry: besides
//! `magic` (auto-detect) and `list`, every registered adapter contributes a
//! subcommand named after its key, all sharing the same target flags.
//!
//! # Security
//! - Passwords come from `--password`, `DBENUM_PASSWORD` or an interactive
//!   prompt and are moved straight into a zeroizing container
//! - Diagnostic and error lines identify the target by `host:port` only

pub mod output;

use clap::{Args, Command, CommandFactory, FromArgMatches, Parser};
use dbenum_core::{
    AdapterRegistry, ConnectionParameters, DbEnumError, Detector, DiagnosticLogger, ProbeBudget,
    Result,
};
use std::ffi::OsString;
use std::time::Duration;

/// Subcommand that probes every adapter in turn
pub const MAGIC: &str = "magic";
/// Subcommand that prints the adapter table
pub const LIST: &str = "list";

/// Root command. Subcommands are attached by [`build_command`].
#[derive(Parser)]
#[command(name = "dbenum")]
#[command(about = "Database fingerprinting and enumeration tool")]
#[command(version)]
#[command(long_about = "
dbenum - identify an exposed database service and summarise its contents

Given a host and port, dbenum either tries every supported engine in turn
(magic) or targets one engine explicitly, then prints the server version and
its databases, tables or collections with approximate sizes as JSON.

SECURITY FEATURES:
- Read-only: a handshake to detect, catalog queries to enumerate
- Passwords are never logged; use --password-prompt to keep them out of argv

EXAMPLES:
  dbenum magic --host 10.0.0.5 --port 6379
  dbenum postgres --host db.internal --user auditor --password-prompt
  dbenum -v magic --host 10.0.0.5 --port 9200 --timeout 5 --global-timeout 30
  dbenum list
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Flags accepted at every level of the command tree
#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Print progress and failure reasons to stderr (-v, -vv)"
    )]
    pub verbose: u8,
}

/// Target flags shared by `magic` and the per-engine subcommands.
///
/// Holds the password, so it deliberately has no `Debug` impl.
#[derive(Args)]
pub struct TargetArgs {
    /// Target host
    #[arg(long, env = "DBENUM_HOST", help = "Target host name or address")]
    pub host: String,

    /// Target port
    #[arg(
        long,
        env = "DBENUM_PORT",
        value_parser = clap::value_parser!(u16).range(1..),
        help = "Target port (engine subcommands default to the engine's port)"
    )]
    pub port: Option<u16>,

    /// User name
    #[arg(long, env = "DBENUM_USER", help = "User name to authenticate as")]
    pub user: Option<String>,

    /// Password
    #[arg(
        long,
        env = "DBENUM_PASSWORD",
        hide_env_values = true,
        conflicts_with = "password_prompt",
        help = "Password (prefer --password-prompt or DBENUM_PASSWORD)"
    )]
    pub password: Option<String>,

    /// Prompt for the password
    #[arg(long, help = "Read the password from the terminal without echo")]
    pub password_prompt: bool,

    /// Database, keyspace or index
    #[arg(
        long,
        env = "DBENUM_DATABASE",
        help = "Database, keyspace or numeric index to connect to"
    )]
    pub database: Option<String>,

    /// Per-attempt timeout in seconds
    #[arg(
        long,
        env = "DBENUM_TIMEOUT",
        default_value_t = 15,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Seconds allowed for each connection attempt and enumeration"
    )]
    pub timeout: u64,

    /// Global timeout in seconds
    #[arg(
        long,
        env = "DBENUM_GLOBAL_TIMEOUT",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Seconds allowed for the whole run"
    )]
    pub global_timeout: u64,
}

impl TargetArgs {
    /// Time limits requested on the command line.
    pub const fn budget(&self) -> ProbeBudget {
        ProbeBudget::from_secs(self.timeout, self.global_timeout)
    }

    /// Builds connection parameters, prompting for the password if asked to.
    ///
    /// # Errors
    /// Returns error if no port is available or the prompt cannot be read
    pub fn connection_parameters(
        &self,
        default_port: Option<u16>,
    ) -> Result<ConnectionParameters> {
        let port = self
            .port
            .or(default_port)
            .ok_or_else(|| DbEnumError::configuration("--port is required for auto-detection"))?;

        let mut params = ConnectionParameters::new(self.host.clone(), port)
            .with_connect_timeout(Duration::from_secs(self.timeout));
        if let Some(user) = &self.user {
            params = params.with_user(user.clone());
        }
        if let Some(password) = self.resolve_password()? {
            params = params.with_password(password);
        }
        if let Some(database) = &self.database {
            params = params.with_database(database.clone());
        }
        Ok(params)
    }

    fn resolve_password(&self) -> Result<Option<String>> {
        if self.password_prompt {
            let password =
                rpassword::prompt_password("Password: ").map_err(|e| DbEnumError::Io {
                    context: "Failed to read password".to_string(),
                    source: e,
                })?;
            return Ok(Some(password));
        }
        Ok(self.password.clone())
    }
}

/// What the user asked for.
pub enum Invocation {
    /// Print the adapter table
    List,
    /// Probe every adapter
    Magic(TargetArgs),
    /// Probe one adapter by key
    Target {
        /// Registry key, also the subcommand name
        key: String,
        /// Target flags
        args: TargetArgs,
    },
}

/// Parsed command line.
pub struct ParsedCli {
    /// Number of `-v` flags
    pub verbose: u8,
    /// Subcommand and its arguments
    pub invocation: Invocation,
}

/// Builds the full command tree for `registry`.
pub fn build_command(registry: &AdapterRegistry) -> Command {
    let mut command = Cli::command()
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(TargetArgs::augment_args(
            Command::new(MAGIC).about("Auto-detect the database type and enumerate it"),
        ))
        .subcommand(Command::new(LIST).about("List supported database types"));

    for descriptor in registry.descriptors() {
        command = command.subcommand(TargetArgs::augment_args(Command::new(descriptor.key).about(
            format!(
                "Enumerate a {} server ({}, default port {})",
                descriptor.name, descriptor.kind, descriptor.default_port
            ),
        )));
    }
    command
}

/// Parses `args` against the command tree for `registry`.
///
/// # Errors
/// Returns the clap error (including help and version requests) unchanged
pub fn parse_from<I, T>(
    registry: &AdapterRegistry,
    args: I,
) -> std::result::Result<ParsedCli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut command = build_command(registry);
    let matches = command.try_get_matches_from_mut(args)?;
    let cli = Cli::from_arg_matches(&matches)?;

    let Some((name, sub)) = matches.subcommand() else {
        return Err(command.error(
            clap::error::ErrorKind::MissingSubcommand,
            "a subcommand is required",
        ));
    };
    let verbose = cli.global.verbose.max(sub.get_count("verbose"));

    let invocation = match name {
        LIST => Invocation::List,
        MAGIC => Invocation::Magic(TargetArgs::from_arg_matches(sub)?),
        key => Invocation::Target {
            key: key.to_string(),
            args: TargetArgs::from_arg_matches(sub)?,
        },
    };
    Ok(ParsedCli {
        verbose,
        invocation,
    })
}

/// Executes `invocation` and returns what goes to stdout.
///
/// # Errors
/// Returns the terminal error of the run; the caller prints it and exits 1
pub async fn run(
    registry: &AdapterRegistry,
    invocation: Invocation,
    logger: &DiagnosticLogger,
) -> Result<String> {
    match invocation {
        Invocation::List => Ok(output::render_adapter_list(&registry.descriptors())),
        Invocation::Magic(args) => {
            let params = args.connection_parameters(None)?;
            let detector = Detector::new(registry, args.budget(), logger);
            let detection = detector.detect(&params).await?;
            output::render_result(&detection.result)
        }
        Invocation::Target { key, args } => {
            let default_port = registry.by_name(&key)?.describe().default_port;
            let params = args.connection_parameters(Some(default_port))?;
            let detector = Detector::new(registry, args.budget(), logger);
            let detection = detector.target(&key, &params).await?;
            output::render_result(&detection.result)
        }
    }
}
