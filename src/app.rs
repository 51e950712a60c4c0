use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Command, Connection, RestartSpec};
use crate::config::RestartConfig;
use crate::control_plane::{self, ApiClient, ControlPlane};
use crate::error::Error;
use crate::orchestrator::{Orchestrator, RestartEvent};

/// Installs the stderr log subscriber. `RUST_LOG` wins over `verbosity`.
pub fn init_tracing(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "rolling_restart=info",
        1 => "rolling_restart=debug",
        _ => "rolling_restart=trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Executes `command` and returns the process exit code.
pub async fn run(command: Command) -> Result<i32> {
    let outcome = match command {
        Command::ListServices(connection) => list_services(&connection).await,
        Command::ListTypes {
            service,
            connection,
        } => list_types(&service, &connection).await,
        Command::Restart(spec) => restart(spec).await,
    };

    match outcome {
        Ok(code) => Ok(code),
        Err(err) => {
            tracing::debug!(kind = err.kind(), "command failed");
            eprintln!("Error: {err}");
            if err.is_precondition() {
                eprintln!("No instance was restarted.");
            }
            Ok(err.exit_code())
        }
    }
}

fn load_config(connection: &Connection) -> crate::Result<RestartConfig> {
    let mut config = match &connection.config_path {
        Some(path) => RestartConfig::load(path)?,
        None => RestartConfig::discover()?,
    };
    config.apply_env()?;

    if let Some(url) = &connection.api_url {
        config.api_url = Some(url.clone());
    }
    if let Some(cluster) = &connection.cluster {
        config.cluster = Some(cluster.clone());
    }
    if let Some(user) = &connection.user {
        config.username = Some(user.clone());
    }
    if connection.insecure {
        config.verify_tls = Some(false);
    }

    Ok(config)
}

fn connect(config: &RestartConfig) -> crate::Result<ApiClient> {
    let api = config.api_config()?;
    tracing::debug!(api_url = %api.api_url, cluster = %api.cluster, "connecting to control plane");
    ApiClient::new(api)
}

async fn ensure_service(client: &ApiClient, service: &str) -> crate::Result<()> {
    let services = client.list_services().await?;
    if services.iter().any(|name| name == service) {
        return Ok(());
    }

    Err(Error::UnknownService {
        service: service.to_string(),
        available: services,
    })
}

async fn list_services(connection: &Connection) -> crate::Result<i32> {
    let client = connect(&load_config(connection)?)?;
    for service in client.list_services().await? {
        println!("{service}");
    }
    Ok(0)
}

async fn list_types(service: &str, connection: &Connection) -> crate::Result<i32> {
    let client = connect(&load_config(connection)?)?;
    ensure_service(&client, service).await?;

    let types = control_plane::list_role_types(&client, service).await?;
    println!("{}", types.join("\n"));
    Ok(0)
}

async fn restart(spec: RestartSpec) -> crate::Result<i32> {
    let config = load_config(&spec.connection)?;
    let mut settings = config.restart_settings()?;
    settings.policy = spec.policy;
    if let Some(delay) = spec.delay {
        settings.delay = delay;
    }
    if let Some(secs) = spec.poll_interval {
        settings.poll_interval = std::time::Duration::from_secs(secs);
    }
    if let Some(count) = spec.max_probe_failures {
        settings.max_probe_failures = count;
    }
    if let Some(secs) = spec.health_timeout {
        settings.health_timeout = Some(std::time::Duration::from_secs(secs));
    }

    let client = connect(&config)?;
    ensure_service(&client, &spec.service).await?;
    let roles = client.list_roles(&spec.service).await?;
    let types = control_plane::role_types(&roles);

    let Some(role_type) = spec.role_type else {
        println!("For the given service specify the instance type that you want to restart.");
        println!("{}", types.join("\n"));
        return Ok(0);
    };
    if !types.contains(&role_type) {
        return Err(Error::UnknownRoleType {
            service: spec.service,
            role_type,
            available: types,
        });
    }

    let selected: Vec<_> = roles
        .into_iter()
        .filter(|role| role.role_type == role_type)
        .collect();
    tracing::info!(
        service = %spec.service,
        role_type = %role_type,
        instances = selected.len(),
        "selected role instances"
    );

    let mut orchestrator = Orchestrator::new(&client, settings);
    orchestrator.on_event(Box::new(print_progress));
    orchestrator.run(selected).await?;

    Ok(0)
}

fn print_progress(event: &RestartEvent) {
    match event {
        RestartEvent::RunStarted { policy, .. } => println!("Restarting role {policy} instances"),
        RestartEvent::Skipped { hostname, .. } => println!("Skipping {hostname}"),
        RestartEvent::Restarting { hostname, .. } => println!("Restarting {hostname}"),
        RestartEvent::WaitingForHealth { hostname, .. } => {
            println!("Waiting for {hostname} to be ready")
        }
        RestartEvent::ProbeFailed {
            hostname, reason, ..
        } => eprintln!("Could not read the status of {hostname}: {reason}"),
        RestartEvent::CoolingDown {
            hostname, delay, ..
        } => println!(
            "{hostname} is now ready waiting additional {} seconds",
            delay.as_secs_f64()
        ),
        RestartEvent::Aborted {
            instance: Some(instance),
            ..
        } => eprintln!("Aborting the rolling restart at {instance}"),
        RestartEvent::Completed { restarted, skipped } => {
            println!("Done: {restarted} restarted, {skipped} skipped")
        }
        RestartEvent::Healthy { .. } | RestartEvent::Aborted { instance: None, .. } => {}
    }
}
