//! Asks the hosted vision model to describe an image

use crate::config::ANALYSIS_PROMPT;
use crate::error::AnalysisError;
use crate::normalizer::EncodedImage;
use crate::runtime::ModelRuntime;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod protocol;

use protocol::{InferenceRequest, InferenceResponse};

/// Builds the request, makes one call through the runtime, and reads the
/// description out of the answer. Holds no per-request state
#[derive(Clone)]
pub struct InferenceClient {
    runtime: Arc<dyn ModelRuntime>,
    model_id: String,
}

impl InferenceClient {
    pub fn new(runtime: Arc<dyn ModelRuntime>, model_id: impl Into<String>) -> Self {
        Self {
            runtime,
            model_id: model_id.into(),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Describe the image. An answer without text is an empty description
    #[tracing::instrument(skip_all, fields(model_id = %self.model_id))]
    pub async fn describe(&self, image: &EncodedImage) -> Result<String, AnalysisError> {
        let request = InferenceRequest::for_image(image, ANALYSIS_PROMPT);
        let body = serde_json::to_vec(&request)
            .map_err(|e| AnalysisError::RemoteCall(format!("failed to build request: {e}")))?;

        let raw = self
            .runtime
            .invoke_model(&self.model_id, body)
            .await
            .map_err(|e| {
                warn!("model invocation failed: {e}");
                AnalysisError::from(e)
            })?;
        debug!("model answered with {} bytes", raw.len());

        let response: InferenceResponse = serde_json::from_slice(&raw).map_err(|e| {
            AnalysisError::RemoteCall(format!("malformed response from the model: {e}"))
        })?;

        if let Some(usage) = response.usage {
            info!(
                "description generated (input_tokens = {}, output_tokens = {}, stop_reason = {:?})",
                usage.input_tokens, usage.output_tokens, response.stop_reason
            );
        }

        let description = response.into_description();
        if description.is_empty() {
            warn!("model answer carried no text");
        }
        Ok(description)
    }
}
