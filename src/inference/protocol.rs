//! The Anthropic messages body Bedrock expects, and the parts of its answer
//! we read

use crate::config::{ANTHROPIC_VERSION, MAX_TOKENS};
use crate::normalizer::EncodedImage;
use serde::{Deserialize, Serialize};

/// A single-turn request: one user message holding the image, then the prompt.
/// Borrows the image data so the base64 is never copied
#[derive(Serialize)]
pub struct InferenceRequest<'a> {
    pub anthropic_version: &'static str,
    pub max_tokens: u32,
    pub messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
pub struct Message<'a> {
    pub role: Role,
    pub content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart<'a> {
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Serialize)]
pub struct ImageSource<'a> {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub media_type: String,
    pub data: &'a str,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Base64,
}

impl<'a> InferenceRequest<'a> {
    pub fn for_image(image: &'a EncodedImage, prompt: &'a str) -> Self {
        InferenceRequest {
            anthropic_version: ANTHROPIC_VERSION,
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: Role::User,
                content: vec![
                    ContentPart::Image {
                        source: ImageSource {
                            kind: SourceKind::Base64,
                            media_type: image.media_type().mime(),
                            data: image.data(),
                        },
                    },
                    ContentPart::Text { text: prompt },
                ],
            }],
        }
    }
}

/// The model's answer. Only `content` matters; everything is optional so a
/// sparse answer reads as an empty description rather than an error
#[derive(Debug, Deserialize)]
pub struct InferenceResponse {
    #[serde(default)]
    pub content: Option<Vec<ResponsePart>>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl InferenceResponse {
    /// The text of the first content part, or `""`
    pub fn into_description(self) -> String {
        self.content
            .and_then(|parts| parts.into_iter().next())
            .and_then(|part| part.text)
            .unwrap_or_default()
    }
}
