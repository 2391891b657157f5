use std::sync::Arc;

use crate::services::RagPipeline;

/// Shared application state: one pipeline for every request.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<RagPipeline>,
}

impl AppState {
    pub fn new(pipeline: RagPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn pipeline(&self) -> &RagPipeline {
        &self.pipeline
    }
}
