//! Orchestrator
//!
//! Host-ordered, one-at-a-time restart of role instances.

mod commander;
mod health;
mod rolling;

pub use commander::RestartCommander;
pub use health::{HealthProber, is_settled};
pub use rolling::Orchestrator;

use std::time::Duration;

use crate::control_plane::ControlPlane;
use crate::error::Result;
use crate::model::{RoleInstance, SelectionPolicy};

pub const DEFAULT_DELAY: Duration = Duration::from_secs(30);

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RestartSettings {
    pub policy: SelectionPolicy,

    /// Cooldown after an instance is healthy, before the next one.
    pub delay: Duration,

    pub poll_interval: Duration,

    /// Consecutive failed status reads tolerated while waiting for health.
    pub max_probe_failures: u32,

    /// First backoff after a failed status read; doubles up to `poll_interval`.
    pub probe_backoff: Duration,

    /// Unbounded when `None`.
    pub health_timeout: Option<Duration>,
}

impl Default for RestartSettings {
    fn default() -> Self {
        Self {
            policy: SelectionPolicy::Healthy,
            delay: DEFAULT_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_probe_failures: 5,
            probe_backoff: Duration::from_secs(1),
            health_timeout: None,
        }
    }
}

impl RestartSettings {
    pub fn with_policy(policy: SelectionPolicy, delay: Duration) -> Self {
        Self {
            policy,
            delay,
            ..Default::default()
        }
    }

    /// Backoff to apply after `failures` consecutive failed probes.
    pub fn probe_backoff_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        self.probe_backoff
            .saturating_mul(2u32.pow(exponent))
            .min(self.poll_interval.max(self.probe_backoff))
    }
}

/// Instance names in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub restarted: Vec<String>,

    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartEvent {
    RunStarted {
        policy: SelectionPolicy,
        instances: usize,
    },

    Skipped {
        instance: String,
        hostname: String,
    },

    Restarting {
        instance: String,
        hostname: String,
    },

    WaitingForHealth {
        instance: String,
        hostname: String,
        attempt: u32,
    },

    ProbeFailed {
        instance: String,
        hostname: String,
        failures: u32,
        reason: String,
    },

    Healthy {
        instance: String,
        hostname: String,
    },

    CoolingDown {
        instance: String,
        hostname: String,
        delay: Duration,
    },

    Aborted {
        instance: Option<String>,
        reason: String,
    },

    Completed {
        restarted: usize,
        skipped: usize,
    },
}

impl RestartEvent {
    fn log(&self) {
        match self {
            RestartEvent::RunStarted { policy, instances } => {
                tracing::info!(%policy, instances, "rolling restart started")
            }
            RestartEvent::Skipped { instance, hostname } => {
                tracing::debug!(%instance, %hostname, "skipping instance")
            }
            RestartEvent::Restarting { instance, hostname } => {
                tracing::debug!(%instance, %hostname, "restarting instance")
            }
            RestartEvent::WaitingForHealth {
                instance,
                hostname,
                attempt,
            } => tracing::debug!(%instance, %hostname, attempt, "waiting for instance"),
            RestartEvent::ProbeFailed {
                instance,
                hostname,
                failures,
                reason,
            } => tracing::warn!(%instance, %hostname, failures, %reason, "health probe failed"),
            RestartEvent::Healthy { instance, hostname } => {
                tracing::debug!(%instance, %hostname, "instance healthy")
            }
            RestartEvent::CoolingDown {
                instance,
                hostname,
                delay,
            } => tracing::debug!(%instance, %hostname, delay_secs = delay.as_secs_f64(), "cooling down"),
            RestartEvent::Aborted { instance, reason } => {
                tracing::error!(instance = instance.as_deref().unwrap_or("-"), %reason, "rolling restart aborted")
            }
            RestartEvent::Completed { restarted, skipped } => {
                tracing::info!(restarted, skipped, "rolling restart completed")
            }
        }
    }
}

pub type EventCallback = Box<dyn Fn(&RestartEvent) + Send + Sync>;

/// Restarts `instances` under `policy` with the default poll and probe settings.
pub async fn run<C: ControlPlane>(
    control_plane: &C,
    instances: Vec<RoleInstance>,
    policy: SelectionPolicy,
    delay: Duration,
) -> Result<RunOutcome> {
    Orchestrator::new(control_plane, RestartSettings::with_policy(policy, delay))
        .run(instances)
        .await
}
