//! Control Plane
//!
//! The cluster manager API the restart run talks to.

mod client;

pub use client::{ApiClient, ApiConfig};

use std::collections::BTreeSet;

use crate::error::Result;
use crate::model::{RestartResult, RoleInstance};

/// Operations a rolling restart needs from the cluster manager.
///
/// Every call is a single request/response; implementations decide how
/// transport failures are retried.
#[allow(async_fn_in_trait)]
pub trait ControlPlane {
    /// Names of the services deployed in the cluster.
    async fn list_services(&self) -> Result<Vec<String>>;

    /// All role instances of `service`.
    async fn list_roles(&self, service: &str) -> Result<Vec<RoleInstance>>;

    /// A fresh read of one role instance.
    async fn role_status(&self, service: &str, name: &str) -> Result<RoleInstance>;

    /// Queues a restart of exactly the instance `name`. Not idempotent.
    async fn restart_role(&self, service: &str, name: &str) -> Result<RestartResult>;
}

/// Distinct role types of a service, sorted.
pub async fn list_role_types<C: ControlPlane>(
    control_plane: &C,
    service: &str,
) -> Result<Vec<String>> {
    let roles = control_plane.list_roles(service).await?;
    Ok(role_types(&roles))
}

pub fn role_types(roles: &[RoleInstance]) -> Vec<String> {
    let types: BTreeSet<&str> = roles.iter().map(|role| role.role_type.as_str()).collect();
    types.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::instance;

    #[test]
    fn test_role_types_are_distinct_and_sorted() {
        let mut gateway = instance("yarn-GATEWAY-1", "c1-1");
        gateway.role_type = "GATEWAY".to_string();
        let mut manager = instance("yarn-RESOURCEMANAGER-1", "c1-1");
        manager.role_type = "RESOURCEMANAGER".to_string();
        let roles = vec![
            instance("yarn-NODEMANAGER-1", "c1-1"),
            manager,
            instance("yarn-NODEMANAGER-2", "c1-2"),
            gateway,
        ];

        assert_eq!(
            role_types(&roles),
            vec!["GATEWAY", "NODEMANAGER", "RESOURCEMANAGER"]
        );
    }
}
