//! Rolling restart run

use super::*;
use crate::eligibility::is_eligible;
use crate::error::Error;
use crate::hostname::order_by_host;
use tokio::time::Instant;

pub struct Orchestrator<'a, C> {
    control_plane: &'a C,

    settings: RestartSettings,

    listeners: Vec<EventCallback>,
}

impl<'a, C: ControlPlane> Orchestrator<'a, C> {
    pub fn new(control_plane: &'a C, settings: RestartSettings) -> Self {
        Self {
            control_plane,
            settings,
            listeners: Vec::new(),
        }
    }

    pub fn on_event(&mut self, callback: EventCallback) {
        self.listeners.push(callback);
    }

    fn emit_event(&self, event: RestartEvent) {
        event.log();
        for listener in &self.listeners {
            listener(&event);
        }
    }

    /// Restarts the eligible instances one at a time, in host order.
    ///
    /// Nothing is touched when the instance set fails the ordering
    /// preconditions. The first restart command that reports errors, or an
    /// instance that cannot be confirmed healthy, stops the run.
    pub async fn run(&self, instances: Vec<RoleInstance>) -> Result<RunOutcome> {
        let ordered = order_by_host(instances).inspect_err(|err| self.abort(None, err))?;

        self.emit_event(RestartEvent::RunStarted {
            policy: self.settings.policy,
            instances: ordered.len(),
        });

        let prober = HealthProber::new(self.control_plane);
        let commander = RestartCommander::new(self.control_plane);
        let mut outcome = RunOutcome::default();

        for (_, instance) in ordered {
            let current = self
                .read_status(&prober, &instance)
                .await
                .inspect_err(|err| self.abort(Some(&instance), err))?;

            if !is_eligible(&current, self.settings.policy) {
                self.emit_event(RestartEvent::Skipped {
                    instance: instance.name.clone(),
                    hostname: instance.hostname.clone(),
                });
                outcome.skipped.push(instance.name);
                continue;
            }

            self.emit_event(RestartEvent::Restarting {
                instance: instance.name.clone(),
                hostname: instance.hostname.clone(),
            });
            commander
                .restart_checked(&instance)
                .await
                .inspect_err(|err| self.abort(Some(&instance), err))?;

            self.wait_until_healthy(&prober, &instance)
                .await
                .inspect_err(|err| self.abort(Some(&instance), err))?;

            self.emit_event(RestartEvent::CoolingDown {
                instance: instance.name.clone(),
                hostname: instance.hostname.clone(),
                delay: self.settings.delay,
            });
            tokio::time::sleep(self.settings.delay).await;

            outcome.restarted.push(instance.name);
        }

        self.emit_event(RestartEvent::Completed {
            restarted: outcome.restarted.len(),
            skipped: outcome.skipped.len(),
        });

        Ok(outcome)
    }

    fn abort(&self, instance: Option<&RoleInstance>, err: &Error) {
        self.emit_event(RestartEvent::Aborted {
            instance: instance.map(|i| i.name.clone()),
            reason: err.to_string(),
        });
    }

    /// Live status used for the eligibility decision.
    async fn read_status(
        &self,
        prober: &HealthProber<'_, C>,
        instance: &RoleInstance,
    ) -> Result<RoleInstance> {
        let mut failures = 0u32;

        loop {
            match prober.status(instance).await {
                Ok(status) => return Ok(status),
                Err(err) => {
                    failures += 1;
                    self.probe_failed(instance, failures, &err)?;
                    tokio::time::sleep(self.settings.probe_backoff_for(failures)).await;
                }
            }
        }
    }

    async fn wait_until_healthy(
        &self,
        prober: &HealthProber<'_, C>,
        instance: &RoleInstance,
    ) -> Result<()> {
        let started = Instant::now();
        let mut failures = 0u32;
        let mut attempt = 0u32;

        loop {
            let pause = match prober.is_healthy(instance).await {
                Ok(true) => {
                    self.emit_event(RestartEvent::Healthy {
                        instance: instance.name.clone(),
                        hostname: instance.hostname.clone(),
                    });
                    return Ok(());
                }
                Ok(false) => {
                    failures = 0;
                    attempt += 1;
                    self.emit_event(RestartEvent::WaitingForHealth {
                        instance: instance.name.clone(),
                        hostname: instance.hostname.clone(),
                        attempt,
                    });
                    self.settings.poll_interval
                }
                Err(err) => {
                    failures += 1;
                    self.probe_failed(instance, failures, &err)?;
                    self.settings.probe_backoff_for(failures)
                }
            };

            if let Some(timeout) = self.settings.health_timeout {
                let waited = started.elapsed();
                if waited >= timeout {
                    return Err(Error::ProbeTimeout {
                        instance: instance.name.clone(),
                        waited_secs: waited.as_secs(),
                    });
                }
                tokio::time::sleep(pause.min(timeout - waited)).await;
            } else {
                tokio::time::sleep(pause).await;
            }
        }
    }

    fn probe_failed(&self, instance: &RoleInstance, failures: u32, err: &Error) -> Result<()> {
        self.emit_event(RestartEvent::ProbeFailed {
            instance: instance.name.clone(),
            hostname: instance.hostname.clone(),
            failures,
            reason: err.to_string(),
        });

        if failures > self.settings.max_probe_failures {
            return Err(Error::Probe {
                instance: instance.name.clone(),
                attempts: failures,
                reason: err.to_string(),
            });
        }

        Ok(())
    }
}
