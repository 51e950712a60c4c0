use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, ensure};
use clap::{ArgAction, Parser, ValueHint, builder::NonEmptyStringValueParser};

use crate::model::SelectionPolicy;

/// How to reach the control plane, as given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Connection {
    pub config_path: Option<PathBuf>,
    pub api_url: Option<String>,
    pub cluster: Option<String>,
    pub user: Option<String>,
    pub insecure: bool,
}

/// A rolling restart request derived from CLI input.
#[derive(Debug, Clone, PartialEq)]
pub struct RestartSpec {
    pub service: String,
    pub role_type: Option<String>,
    pub policy: SelectionPolicy,
    pub delay: Option<Duration>,
    pub poll_interval: Option<u64>,
    pub max_probe_failures: Option<u32>,
    pub health_timeout: Option<u64>,
    pub connection: Connection,
}

/// The top-level command requested by the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ListServices(Connection),
    ListTypes {
        service: String,
        connection: Connection,
    },
    Restart(RestartSpec),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub command: Command,
    pub verbosity: u8,
}

/// Parse CLI arguments into a high-level command.
pub fn parse() -> Result<Invocation> {
    into_invocation(Cli::parse())
}

pub fn parse_from<I, T>(args: I) -> Result<Invocation>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    into_invocation(Cli::try_parse_from(args)?)
}

fn into_invocation(cli: Cli) -> Result<Invocation> {
    let delay = cli
        .delay
        .map(|secs| {
            Duration::try_from_secs_f64(secs)
                .map_err(|e| anyhow::anyhow!("--delay must be a non-negative number of seconds: {e}"))
        })
        .transpose()?;
    if let Some(interval) = cli.poll_interval {
        ensure!(interval > 0, "--poll-interval must be at least one second");
    }

    let connection = Connection {
        config_path: cli.config,
        api_url: cli.api_url,
        cluster: cli.cluster,
        user: cli.user,
        insecure: cli.insecure,
    };

    let policy = if cli.stale {
        SelectionPolicy::Stale
    } else if cli.force {
        SelectionPolicy::All
    } else {
        SelectionPolicy::Healthy
    };

    let command = match cli.service {
        _ if cli.list_services => Command::ListServices(connection),
        Some(service) if cli.list_types => Command::ListTypes {
            service,
            connection,
        },
        Some(service) => Command::Restart(RestartSpec {
            service,
            role_type: cli.role_type,
            policy,
            delay,
            poll_interval: cli.poll_interval,
            max_probe_failures: cli.max_probe_failures,
            health_timeout: cli.health_timeout,
            connection,
        }),
        None => anyhow::bail!("a SERVICE is required unless --list-services is given"),
    };

    Ok(Invocation {
        command,
        verbosity: cli.verbose,
    })
}

#[derive(Parser, Debug)]
#[command(
    name = "rolling-restart",
    version,
    about = "Restart the role instances of a cluster service one host at a time",
    disable_help_subcommand = true
)]
struct Cli {
    /// Service to restart.
    #[arg(
        value_name = "SERVICE",
        required_unless_present = "list_services",
        value_parser = NonEmptyStringValueParser::new()
    )]
    service: Option<String>,

    /// Instance type to restart for the given service.
    #[arg(
        short = 't',
        long = "type",
        value_name = "TYPE",
        value_parser = NonEmptyStringValueParser::new()
    )]
    role_type: Option<String>,

    /// Seconds to wait between instance restarts.
    #[arg(short, long, value_name = "SECONDS", allow_negative_numbers = true)]
    delay: Option<f64>,

    /// Restart only healthy instances with a stale configuration.
    #[arg(short = 's', long = "stale", visible_alias = "staled", conflicts_with = "force")]
    stale: bool,

    /// Restart all instances even if they are unhealthy.
    #[arg(short, long)]
    force: bool,

    /// List instance types for the given service.
    #[arg(short = 'l', long = "list-types")]
    list_types: bool,

    /// List the services of the cluster.
    #[arg(long = "list-services", conflicts_with = "list_types")]
    list_services: bool,

    /// Seconds between health probes of a restarted instance.
    #[arg(long = "poll-interval", value_name = "SECONDS")]
    poll_interval: Option<u64>,

    /// Consecutive failed health probes tolerated before aborting.
    #[arg(long = "max-probe-failures", value_name = "COUNT")]
    max_probe_failures: Option<u32>,

    /// Abort when a restarted instance is not healthy after this many seconds.
    #[arg(long = "health-timeout", value_name = "SECONDS")]
    health_timeout: Option<u64>,

    /// Cluster manager API base URL (overrides RR_API_URL).
    #[arg(long = "api-url", value_name = "URL", value_hint = ValueHint::Url)]
    api_url: Option<String>,

    /// Cluster name in the cluster manager.
    #[arg(long, value_name = "NAME")]
    cluster: Option<String>,

    /// API user; the password comes from RR_PASSWORD or the config file.
    #[arg(short = 'u', long, value_name = "USER")]
    user: Option<String>,

    /// Configuration file (defaults to the nearest rolling-restart.toml).
    #[arg(short = 'c', long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Do not verify the control plane's TLS certificate.
    #[arg(long)]
    insecure: bool,

    /// More log output on stderr (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}
