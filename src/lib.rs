pub mod app;
pub mod cli;
pub mod config;
pub mod control_plane;
pub mod eligibility;
pub mod error;
pub mod hostname;
pub mod model;
pub mod orchestrator;

pub use error::{Error, Result};
pub use model::{RestartResult, RoleInstance, SelectionPolicy};
pub use orchestrator::{Orchestrator, RestartSettings, RunOutcome};
