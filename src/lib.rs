pub mod analyser;
pub mod error;
pub mod inference;
pub mod normalizer;
pub mod runtime;
pub mod server;
pub mod settings;

pub use analyser::{Analyser, Analysis};
pub use error::AnalysisError;

/// Fixed values of the remote model protocol
pub mod config {
    /// Protocol version Bedrock uses to talk to Anthropic models. It is not
    /// the model version
    pub const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

    /// Upper bound on the length of a generated description
    pub const MAX_TOKENS: u32 = 1000;

    /// Bedrock inference profile used when none is configured. Cross-region
    /// models need the inference profile id rather than the plain model id
    pub const DEFAULT_MODEL_ID: &str = "apac.anthropic.claude-sonnet-4-20250514-v1:0";

    /// Largest upload accepted unless configured otherwise
    pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

    /// JPEG quality used when re-encoding uploads
    pub const JPEG_QUALITY: u8 = 90;

    /// Shown in place of the raw error when Bedrock denies access
    pub const CREDENTIALS_HINT: &str =
        "Please check your AWS credentials and Bedrock access permissions.";

    /// The prompt sent alongside every image
    pub const ANALYSIS_PROMPT: &str = "Analyse this image and provide a detailed description of what you see. Include:

1. Main subjects and objects in the image
2. Setting or background context
3. Actions or activities taking place
4. Notable visual characteristics (colors, style, lighting, etc.)
5. Any text visible in the image

Be detailed but concise in your analysis.";

    /// Default filter for the tracing subscriber
    pub const RUST_LOG: &str = "image_analyser=info,actix_web=info";
}
