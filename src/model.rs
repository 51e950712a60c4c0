use serde::Deserialize;

/// Lifecycle state reported for a role instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleState {
    Starting,
    Started,
    Stopping,
    Stopped,
    Busy,
    #[serde(other)]
    Unknown,
}

/// Coarse health verdict computed by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityStatus {
    GoodHealth,
    ConcerningHealth,
    BadHealth,
    Starting,
    Stopping,
    Stopped,
    Down,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthSummary {
    Good,
    Concerning,
    Bad,
    Disabled,
    #[serde(other)]
    Unknown,
}

/// Whether the instance runs with the configuration currently deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigStaleness {
    Fresh,
    Stale,
    StaleRefreshable,
    #[serde(other)]
    Unknown,
}

/// One running process of a service on one host, as last read from the
/// control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleInstance {
    pub name: String,
    pub hostname: String,
    pub service_name: String,
    pub role_type: String,
    pub maintenance_mode: bool,
    pub role_state: RoleState,
    pub entity_status: EntityStatus,
    pub health_summary: HealthSummary,
    pub config_staleness: ConfigStaleness,
}

impl RoleInstance {
    /// Started, good entity status and good health rollup.
    pub fn is_running_well(&self) -> bool {
        self.role_state == RoleState::Started
            && self.entity_status == EntityStatus::GoodHealth
            && self.health_summary == HealthSummary::Good
    }
}

/// Outcome of a restart command. Any error is fatal to the whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestartResult {
    pub errors: Vec<String>,
}

impl RestartResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Which instances a run is allowed to restart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Instances that are started and healthy.
    #[default]
    Healthy,
    /// Healthy instances whose configuration is stale.
    Stale,
    /// Every instance not in maintenance mode.
    All,
}

impl std::fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionPolicy::Healthy => write!(f, "healthy"),
            SelectionPolicy::Stale => write!(f, "stale"),
            SelectionPolicy::All => write!(f, "all"),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_values_parse_from_wire_names() {
        let state: RoleState = serde_json::from_str("\"STARTED\"").unwrap();
        assert_eq!(state, RoleState::Started);
        let status: EntityStatus = serde_json::from_str("\"GOOD_HEALTH\"").unwrap();
        assert_eq!(status, EntityStatus::GoodHealth);
        let staleness: ConfigStaleness = serde_json::from_str("\"STALE_REFRESHABLE\"").unwrap();
        assert_eq!(staleness, ConfigStaleness::StaleRefreshable);
    }

    #[test]
    fn test_unexpected_status_values_fall_back_to_unknown() {
        let state: RoleState = serde_json::from_str("\"HISTORY_NOT_AVAILABLE\"").unwrap();
        assert_eq!(state, RoleState::Unknown);
        let summary: HealthSummary = serde_json::from_str("\"NOT_AVAILABLE\"").unwrap();
        assert_eq!(summary, HealthSummary::Unknown);
    }

    #[test]
    fn test_restart_result_success() {
        assert!(RestartResult::default().is_success());
        let failed = RestartResult {
            errors: vec!["Command failed".to_string()],
        };
        assert!(!failed.is_success());
    }

    #[test]
    fn test_selection_policy_display() {
        assert_eq!(SelectionPolicy::default(), SelectionPolicy::Healthy);
        assert_eq!(SelectionPolicy::Stale.to_string(), "stale");
        assert_eq!(SelectionPolicy::All.to_string(), "all");
    }
}
