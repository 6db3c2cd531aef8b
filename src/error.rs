//! Failures of the analysis pipeline

use crate::config::CREDENTIALS_HINT;
use thiserror::Error;

/// Everything that can stop an upload from becoming a description
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The upload is not an image we can decode
    #[error("could not decode image: {0}")]
    Decode(String),

    /// The form did not carry a file
    #[error("no image was uploaded")]
    MissingUpload,

    /// Bedrock refused the call for lack of credentials or permissions
    #[error("access denied by the model service: {0}")]
    Authorization(String),

    /// Any other failure talking to the model service
    #[error("{0}")]
    RemoteCall(String),

    /// A failure inside this service
    #[error("internal error: {0}")]
    Internal(String),
}

impl AnalysisError {
    /// The message shown to the person who uploaded the image
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::Authorization(_) => CREDENTIALS_HINT.to_string(),
            other => other.to_string(),
        }
    }

    /// Whether the fault lies with the upload rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(self, AnalysisError::Decode(_) | AnalysisError::MissingUpload)
    }
}

impl From<::image::ImageError> for AnalysisError {
    fn from(err: ::image::ImageError) -> Self {
        AnalysisError::Decode(err.to_string())
    }
}

impl From<base64::DecodeError> for AnalysisError {
    fn from(err: base64::DecodeError) -> Self {
        AnalysisError::Decode(format!("invalid base64: {err}"))
    }
}
