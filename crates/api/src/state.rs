use std::sync::Arc;

use bridgit_core::config::BridgeConfig;
use bridgit_gef::backend::ExecutionBackend;

use crate::config::ServerConfig;
use crate::engine::pipeline::JobPipeline;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`) and never mutated
/// after startup.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (timeouts, CORS, polling).
    pub config: Arc<ServerConfig>,
    /// Job dispatch pipeline, holding the service map and the GEF backend.
    pub pipeline: Arc<JobPipeline>,
}

impl AppState {
    /// Wire the pipeline from its injected collaborators.
    pub fn new(
        config: ServerConfig,
        bridge: BridgeConfig,
        backend: Arc<dyn ExecutionBackend>,
    ) -> Self {
        let pipeline = JobPipeline::new(Arc::new(bridge), backend)
            .with_stage_timeout(config.stage_timeout())
            .with_poll_policy(config.poll_policy());

        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
        }
    }
}
