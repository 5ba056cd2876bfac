//! The scheduler's periodic tasks, one per artifact tier.

pub mod daily_videos;
pub mod images;
pub mod latest_images;
pub mod latest_videos;
pub mod segments;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::common::config::Config;
use crate::processors::Toolset;
use crate::propagate::DependencyPropagator;
use crate::state::SharedState;
use crate::store::ArtifactStore;
use crate::workers::WorkerPool;

/// Everything a task needs, passed by reference into scheduler and workers.
pub struct TaskContext {
    pub config: Config,
    pub store: ArtifactStore,
    pub state: Arc<SharedState>,
    pub tools: Toolset,
    pub pool: WorkerPool,
    pub propagator: DependencyPropagator,
}

impl TaskContext {
    pub fn new(config: Config, tools: Toolset, cancel: CancellationToken) -> Self {
        let store = ArtifactStore::new(&config);
        let pool = WorkerPool::new(config.max_concurrency, cancel);
        TaskContext {
            config,
            store,
            state: Arc::new(SharedState::new()),
            tools,
            pool,
            propagator: DependencyPropagator,
        }
    }
}
