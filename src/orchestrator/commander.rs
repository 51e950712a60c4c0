use crate::control_plane::ControlPlane;
use crate::error::{Error, Result};
use crate::model::{RestartResult, RoleInstance};

/// Issues single-instance restart commands.
pub struct RestartCommander<'a, C> {
    control_plane: &'a C,
}

impl<'a, C: ControlPlane> RestartCommander<'a, C> {
    pub fn new(control_plane: &'a C) -> Self {
        Self { control_plane }
    }

    /// Sends the restart command and returns what the control plane reported.
    ///
    /// Calling this twice may queue two restarts.
    pub async fn restart(&self, instance: &RoleInstance) -> Result<RestartResult> {
        tracing::debug!(
            service = %instance.service_name,
            instance = %instance.name,
            "issuing restart command"
        );
        self.control_plane
            .restart_role(&instance.service_name, &instance.name)
            .await
    }

    /// Like [`restart`](Self::restart), but a result carrying errors becomes
    /// [`Error::RestartCommand`].
    pub async fn restart_checked(&self, instance: &RoleInstance) -> Result<()> {
        let result = self.restart(instance).await?;
        if result.is_success() {
            return Ok(());
        }

        Err(Error::RestartCommand {
            instance: instance.name.clone(),
            hostname: instance.hostname.clone(),
            errors: result.errors,
        })
    }
}
