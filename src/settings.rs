//! Process configuration, read once at start-up from defaults, an optional
//! `image-analyser.toml`, and the environment (after loading `.env`)

use crate::config::{DEFAULT_MODEL_ID, MAX_UPLOAD_BYTES};
use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use tracing::debug;

const CONFIG_FILE: &str = "image-analyser";

#[derive(Clone, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    /// Bedrock inference profile or model id
    pub model_id: String,

    /// Largest upload accepted, in bytes
    pub max_upload_bytes: usize,

    /// Directory served under `/static`
    pub static_dir: String,

    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_session_token: Option<String>,
    pub aws_default_region: Option<String>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("model_id", &self.model_id)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("static_dir", &self.static_dir)
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field(
                "aws_secret_access_key",
                &self.aws_secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "aws_session_token",
                &self.aws_session_token.as_ref().map(|_| "<redacted>"),
            )
            .field("aws_default_region", &self.aws_default_region)
            .finish()
    }
}

impl Settings {
    /// Load `.env` if there is one, then layer the config file and the
    /// environment over the defaults
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("loaded environment from {}", path.display()),
            Err(e) if e.not_found() => debug!("no .env file found"),
            Err(e) => return Err(e).context("failed to read .env file"),
        }

        Self::defaults()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::default())
            .build()
            .and_then(Config::try_deserialize)
            .context("invalid configuration")
    }

    pub(crate) fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8080)?
            .set_default("model_id", DEFAULT_MODEL_ID)?
            .set_default("max_upload_bytes", MAX_UPLOAD_BYTES as i64)?
            .set_default("static_dir", "static")
    }

    /// Access key and secret, when both are configured. Otherwise the AWS
    /// default credential chain applies
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        let key = self.aws_access_key_id.as_deref().filter(|s| !s.is_empty())?;
        let secret = self.aws_secret_access_key.as_deref().filter(|s| !s.is_empty())?;
        Some((key, secret))
    }

    pub fn region(&self) -> Option<&str> {
        self.aws_default_region.as_deref().filter(|s| !s.is_empty())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{FileFormat, Map};

    fn from_toml(toml: &str) -> Settings {
        Settings::defaults()
            .unwrap()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = from_toml("");
        assert_eq!(settings.listen_addr(), "0.0.0.0:8080");
        assert_eq!(settings.model_id, DEFAULT_MODEL_ID);
        assert_eq!(settings.max_upload_bytes, MAX_UPLOAD_BYTES);
        assert_eq!(settings.static_dir, "static");
        assert!(settings.static_credentials().is_none());
        assert!(settings.region().is_none());
    }

    #[test]
    fn test_overrides() {
        let settings = from_toml(
            r#"
            port = 9000
            model_id = "anthropic.claude-3-haiku-20240307-v1:0"
            aws_access_key_id = "AKIDEXAMPLE"
            aws_secret_access_key = "wJalrXUtnFEMI"
            aws_default_region = "ap-southeast-2"
            "#,
        );
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.model_id, "anthropic.claude-3-haiku-20240307-v1:0");
        assert_eq!(
            settings.static_credentials(),
            Some(("AKIDEXAMPLE", "wJalrXUtnFEMI"))
        );
        assert_eq!(settings.region(), Some("ap-southeast-2"));
    }

    #[test]
    fn test_environment_overrides() {
        let vars: Map<String, String> = [
            ("PORT", "9100"),
            ("MODEL_ID", "anthropic.claude-3-haiku-20240307-v1:0"),
            ("AWS_DEFAULT_REGION", "us-west-2"),
            ("MAX_UPLOAD_BYTES", "2048"),
            ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "wJalrXUtnFEMI"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let settings: Settings = Settings::defaults()
            .unwrap()
            .add_source(Environment::default().source(Some(vars)))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.port, 9100);
        assert_eq!(settings.model_id, "anthropic.claude-3-haiku-20240307-v1:0");
        assert_eq!(settings.region(), Some("us-west-2"));
        assert_eq!(settings.max_upload_bytes, 2048);
        assert_eq!(
            settings.static_credentials(),
            Some(("AKIDEXAMPLE", "wJalrXUtnFEMI"))
        );
        assert_eq!(settings.host, "0.0.0.0");
    }

    #[test]
    fn test_partial_credentials_fall_back_to_chain() {
        let settings = from_toml(r#"aws_access_key_id = "AKIDEXAMPLE""#);
        assert!(settings.static_credentials().is_none());

        let settings = from_toml(
            r#"
            aws_access_key_id = "AKIDEXAMPLE"
            aws_secret_access_key = ""
            "#,
        );
        assert!(settings.static_credentials().is_none());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let settings = from_toml(
            r#"
            aws_access_key_id = "AKIDEXAMPLE"
            aws_secret_access_key = "wJalrXUtnFEMI"
            "#,
        );
        let shown = format!("{settings:?}");
        assert!(!shown.contains("wJalrXUtnFEMI"));
        assert!(shown.contains("<redacted>"));
    }
}
