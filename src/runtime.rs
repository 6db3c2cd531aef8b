//! The transport that carries an invocation to the hosted model. Bedrock in
//! production, a stub in tests

use crate::error::AnalysisError;
use crate::settings::Settings;
use async_trait::async_trait;
use aws_config::{retry::RetryConfig, BehaviorVersion};
use aws_sdk_bedrockruntime::config::{Credentials, Region};
use aws_sdk_bedrockruntime::error::{DisplayErrorContext, SdkError};
use aws_sdk_bedrockruntime::operation::invoke_model::InvokeModelError;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use thiserror::Error;
use tracing::{debug, info};

const JSON: &str = "application/json";

/// How a model invocation failed
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The caller's credentials or permissions were rejected
    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    Other(String),
}

impl From<InvokeError> for AnalysisError {
    fn from(err: InvokeError) -> Self {
        match err {
            InvokeError::AccessDenied(msg) => AnalysisError::Authorization(msg),
            InvokeError::Other(msg) => AnalysisError::RemoteCall(msg),
        }
    }
}

/// Something that can run one request/response invocation of a hosted model
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// Send a JSON body to the model and return the raw JSON it answers with
    async fn invoke_model(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, InvokeError>;
}

/// Amazon Bedrock's `InvokeModel` call
#[derive(Debug, Clone)]
pub struct BedrockRuntime {
    client: Client,
}

impl BedrockRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build the client once from the loaded settings. SDK retries are off:
    /// one invocation is one attempt
    pub async fn from_settings(settings: &Settings) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).retry_config(RetryConfig::disabled());

        if let Some(region) = settings.region() {
            loader = loader.region(Region::new(region.to_string()));
        }

        match settings.static_credentials() {
            Some((key, secret)) => {
                info!("using AWS credentials from configuration");
                loader = loader.credentials_provider(Credentials::new(
                    key,
                    secret,
                    settings.aws_session_token.clone(),
                    None,
                    "image-analyser",
                ));
            }
            None => info!("using the AWS default credential chain"),
        }

        let sdk_config = loader.load().await;
        info!(
            "bedrock client ready (region = {:?})",
            sdk_config.region().map(|r| r.as_ref())
        );
        Self::new(Client::new(&sdk_config))
    }
}

#[async_trait]
impl ModelRuntime for BedrockRuntime {
    async fn invoke_model(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, InvokeError> {
        debug!("invoking {model_id} with a {} byte body", body.len());

        let output = self
            .client
            .invoke_model()
            .model_id(model_id)
            .content_type(JSON)
            .accept(JSON)
            .body(Blob::new(body))
            .send()
            .await
            .map_err(classify)?;

        Ok(output.body().as_ref().to_vec())
    }
}

/// Split access-denied failures out from everything else using the SDK's
/// modelled error, not the message text
fn classify(err: SdkError<InvokeModelError>) -> InvokeError {
    let message = DisplayErrorContext(&err).to_string();
    match err.as_service_error() {
        Some(InvokeModelError::AccessDeniedException(_)) => InvokeError::AccessDenied(message),
        _ => InvokeError::Other(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_bedrockruntime::types::error::AccessDeniedException;
    use aws_sdk_bedrockruntime::types::error::ThrottlingException;

    fn service_error(err: InvokeModelError) -> SdkError<InvokeModelError> {
        SdkError::service_error(
            err,
            aws_smithy_runtime_api::http::Response::new(
                aws_smithy_runtime_api::http::StatusCode::try_from(400).unwrap(),
                aws_smithy_types::body::SdkBody::empty(),
            ),
        )
    }

    #[test]
    fn test_access_denied_is_classified() {
        let err = service_error(InvokeModelError::AccessDeniedException(
            AccessDeniedException::builder()
                .message("You don't have access to the model with the specified model ID.")
                .build(),
        ));
        let classified = classify(err);
        assert!(matches!(classified, InvokeError::AccessDenied(_)));
        assert!(matches!(
            AnalysisError::from(classified),
            AnalysisError::Authorization(_)
        ));
    }

    #[test]
    fn test_other_service_errors_are_remote_failures() {
        let err = service_error(InvokeModelError::ThrottlingException(
            ThrottlingException::builder()
                .message("Too many requests")
                .build(),
        ));
        let classified = classify(err);
        assert!(matches!(classified, InvokeError::Other(ref m) if m.contains("Too many requests")));
    }
}
