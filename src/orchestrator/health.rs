use crate::control_plane::ControlPlane;
use crate::error::Result;
use crate::model::{ConfigStaleness, RoleInstance};

/// Reads an instance's live status and decides whether it has settled.
pub struct HealthProber<'a, C> {
    control_plane: &'a C,
}

impl<'a, C: ControlPlane> HealthProber<'a, C> {
    pub fn new(control_plane: &'a C) -> Self {
        Self { control_plane }
    }

    /// Fresh status of `instance`. A failed read is an error, never "unhealthy".
    pub async fn status(&self, instance: &RoleInstance) -> Result<RoleInstance> {
        self.control_plane
            .role_status(&instance.service_name, &instance.name)
            .await
    }

    pub async fn is_healthy(&self, instance: &RoleInstance) -> Result<bool> {
        let status = self.status(instance).await?;
        Ok(is_settled(&status))
    }
}

/// Started, healthy and running the deployed configuration.
///
/// Stricter than the `healthy` selection policy: a restarted node must also
/// have picked up its configuration.
pub fn is_settled(status: &RoleInstance) -> bool {
    status.config_staleness == ConfigStaleness::Fresh && status.is_running_well()
}
