pub mod config;
pub mod features;
pub mod shared;

pub use config::{OutcomeFormat, ScenarioConfig};
pub use features::scenarios::controller::ScenarioController;
pub use features::scenarios::service::ScenarioOrchestrator;
pub use shared::error::{ScenarioError, ScenarioResult};
