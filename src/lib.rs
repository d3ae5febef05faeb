pub mod config;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod history;
pub mod logging;
pub mod models;
pub mod probes;
pub mod routing;
pub mod state_machine;
pub mod web;

pub use config::OrchestratorConfig;
pub use coordinator::FailoverCoordinator;
pub use error::ErrorKind;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_loads_successfully() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.initial_active_region, "region1");
        assert_eq!(config.overall_budget.as_millis(), 5000);
        assert_eq!(config.history_capacity, 1000);
    }
}
