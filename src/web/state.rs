//! Shared application state for the control API.

use crate::config::OrchestratorConfig;
use crate::coordinator::FailoverCoordinator;
use crate::error::ConfigError;
use crate::history::FailoverHistory;
use crate::probes::{CacheLeadership, RelationalProbe};
use crate::routing::RoutingRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<OrchestratorConfig>,
    pub coordinator: Arc<FailoverCoordinator>,
    pub routing: Arc<RoutingRegistry>,
    pub history: Arc<FailoverHistory>,
    pub relational: Arc<dyn RelationalProbe>,
    pub cache: Arc<dyn CacheLeadership>,
}

impl AppState {
    /// Assemble the orchestrator from configuration and probe
    /// implementations. The routing record starts from the configured
    /// initially-active region.
    pub fn build(
        config: Arc<OrchestratorConfig>,
        relational: Arc<dyn RelationalProbe>,
        cache: Arc<dyn CacheLeadership>,
    ) -> Result<Self, ConfigError> {
        let active = config
            .region(&config.initial_active_region)
            .ok_or_else(|| ConfigError::MissingRegion(config.initial_active_region.clone()))?;

        let routing = Arc::new(RoutingRegistry::new(
            config.initial_active_region.clone(),
            active.relational_endpoint.clone(),
            active.cache_endpoint.clone(),
        ));

        let history = Arc::new(match &config.history_file {
            Some(path) => FailoverHistory::with_persistence(config.history_capacity, path.clone()),
            None => FailoverHistory::new(config.history_capacity),
        });

        let coordinator = Arc::new(FailoverCoordinator::new(
            Arc::clone(&config),
            Arc::clone(&relational),
            Arc::clone(&cache),
            Arc::clone(&routing),
            Arc::clone(&history),
        ));

        Ok(Self {
            config,
            coordinator,
            routing,
            history,
            relational,
            cache,
        })
    }
}
