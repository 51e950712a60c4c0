use crate::model::{ConfigStaleness, RoleInstance, SelectionPolicy};

/// Decides whether `instance` may be restarted under `policy`.
///
/// Instances in maintenance mode are never eligible.
pub fn is_eligible(instance: &RoleInstance, policy: SelectionPolicy) -> bool {
    if instance.maintenance_mode {
        return false;
    }

    match policy {
        SelectionPolicy::Healthy => instance.is_running_well(),
        SelectionPolicy::Stale => {
            instance.is_running_well() && instance.config_staleness == ConfigStaleness::Stale
        }
        SelectionPolicy::All => true,
    }
}
