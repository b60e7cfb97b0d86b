//! Pipeline Generation Service
//!
//! prompt -> single model call -> normalizer. No caching, no retries.

use crate::artifact::{GeneratedArtifact, Target};
use crate::error::Result;
use crate::llm::CompletionModel;
use crate::normalizer::Normalizer;
use crate::prompt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

pub struct PipelineGenerator {
    model: Arc<dyn CompletionModel>,
    normalizer: Normalizer,
}

impl PipelineGenerator {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self {
            model,
            normalizer: Normalizer::default(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Generate the four-part artifact for one request.
    ///
    /// Normalizer errors are returned as-is; model failures surface as `PipelineError::Llm`.
    pub async fn generate(
        &self,
        user_request: &str,
        context: &str,
        target: Target,
    ) -> Result<GeneratedArtifact> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();
        info!(%request_id, %target, "Generating pipeline code");

        let prompt = prompt::compose(user_request, context, target);
        let reply = self.model.complete(&prompt).await.map_err(|e| {
            warn!(%request_id, "LLM call failed: {}", e);
            e
        })?;

        let result = self.normalizer.normalize(&reply);
        match &result {
            Ok(_) => info!(
                %request_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "LLM response normalized"
            ),
            Err(e) => warn!(%request_id, "LLM response rejected: {}", e),
        }
        result
    }
}
