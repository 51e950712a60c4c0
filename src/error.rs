//! Error Types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    #[error("Incorrect hostname: {hostname}")]
    InvalidHostname { hostname: String },

    #[error("Host {hostname} carries more than one selected instance: {}", instances.join(", "))]
    DuplicateHost {
        hostname: String,
        instances: Vec<String>,
    },

    #[error("Error restarting instance {instance} on {hostname}: {}", errors.join("; "))]
    RestartCommand {
        instance: String,
        hostname: String,
        errors: Vec<String>,
    },

    #[error("Health probe for {instance} failed {attempts} times in a row: {reason}")]
    Probe {
        instance: String,
        attempts: u32,
        reason: String,
    },

    #[error("Timeout: {instance} not healthy after {waited_secs}s")]
    ProbeTimeout { instance: String, waited_secs: u64 },

    #[error("Control plane unavailable: {url} - {reason}")]
    ControlPlane { url: String, reason: String },

    #[error("Control plane returned {status} for {url}: {body}")]
    Api {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Invalid control plane response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Unknown service '{service}', available: {}", available.join(", "))]
    UnknownService {
        service: String,
        available: Vec<String>,
    },

    #[error("Service {service} has no role type '{role_type}', available: {}", available.join(", "))]
    UnknownRoleType {
        service: String,
        role_type: String,
        available: Vec<String>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Io(_) | Error::Other(_) => 1,
            Error::InvalidHostname { .. } => 10,
            Error::DuplicateHost { .. } => 11,
            Error::RestartCommand { .. } => 20,
            Error::Probe { .. } => 21,
            Error::ProbeTimeout { .. } => 22,
            Error::ControlPlane { .. } => 30,
            Error::Api { .. } => 31,
            Error::InvalidResponse { .. } => 32,
            Error::UnknownService { .. } => 40,
            Error::UnknownRoleType { .. } => 41,
            Error::InvalidConfig { .. } => 60,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidHostname { .. } => "invalid_hostname",
            Error::DuplicateHost { .. } => "duplicate_host",
            Error::RestartCommand { .. } => "restart_command",
            Error::Probe { .. } => "probe",
            Error::ProbeTimeout { .. } => "probe_timeout",
            Error::ControlPlane { .. } => "control_plane",
            Error::Api { .. } => "api",
            Error::InvalidResponse { .. } => "invalid_response",
            Error::InvalidConfig { .. } => "invalid_config",
            Error::UnknownService { .. } => "unknown_service",
            Error::UnknownRoleType { .. } => "unknown_role_type",
            Error::Io(_) => "io_error",
            Error::Other(_) => "other",
        }
    }

    /// Transport-level failures that a read call may retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::ControlPlane { .. })
            || matches!(self, Error::Api { status, .. } if *status >= 500)
    }

    /// True for the failures raised while ordering, before any node is restarted.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::InvalidHostname { .. } | Error::DuplicateHost { .. }
        )
    }

    pub fn instance_name(&self) -> Option<&str> {
        match self {
            Error::RestartCommand { instance, .. }
            | Error::Probe { instance, .. }
            | Error::ProbeTimeout { instance, .. } => Some(instance),
            _ => None,
        }
    }
}
