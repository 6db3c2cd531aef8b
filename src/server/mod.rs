//! The user-facing web server: an upload form, a JSON API, and a health check.
//! Every route funnels into `Analyser::analyze`

use crate::analyser::Analyser;
use crate::config::MAX_UPLOAD_BYTES;
use crate::error::AnalysisError;
use crate::settings::Settings;
use actix_files::Files;
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

mod pages;
pub mod protocol;
pub mod routes;

/// Largest upload the routes will read
#[derive(Debug, Clone, Copy)]
pub struct UploadLimit(pub usize);

/// How the routes are mounted
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub max_upload_bytes: usize,

    /// Served under `/static` when present
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            max_upload_bytes: MAX_UPLOAD_BYTES,
            static_dir: None,
        }
    }
}

impl From<&Settings> for ServerOptions {
    fn from(settings: &Settings) -> Self {
        let dir = Path::new(&settings.static_dir);
        let static_dir = if dir.is_dir() {
            Some(dir.to_path_buf())
        } else {
            warn!("static directory {} not found, not serving /static", dir.display());
            None
        };

        Self {
            max_upload_bytes: settings.max_upload_bytes,
            static_dir,
        }
    }
}

/// Register the shared state and every route. Called once per worker
pub fn configure(
    analyser: web::Data<Analyser>,
    options: ServerOptions,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(analyser)
            .app_data(web::Data::new(UploadLimit(options.max_upload_bytes)))
            .app_data(json_config(options.max_upload_bytes))
            .service(routes::index)
            .service(routes::analyse)
            .service(routes::analyse_json)
            .service(routes::health)
            .service(routes::favicon);

        if let Some(dir) = options.static_dir {
            cfg.service(Files::new("/static", dir));
        }
    }
}

fn json_config(max_upload_bytes: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(json_body_limit(max_upload_bytes))
        .error_handler(|err, _req| {
            WebError::from(AnalysisError::Decode(format!("invalid request body: {err}"))).into()
        })
}

/// The JSON body carries the image as base64, a third larger than the bytes
fn json_body_limit(max_upload_bytes: usize) -> usize {
    (max_upload_bytes / 3).saturating_mul(4).saturating_add(1024)
}

fn status_for(err: &AnalysisError) -> StatusCode {
    match err {
        AnalysisError::Decode(_) | AnalysisError::MissingUpload => StatusCode::BAD_REQUEST,
        AnalysisError::Authorization(_) => StatusCode::FORBIDDEN,
        AnalysisError::RemoteCall(_) => StatusCode::BAD_GATEWAY,
        AnalysisError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// An analysis failure rendered as JSON for API clients
#[derive(Debug)]
pub struct WebError {
    err: AnalysisError,
}

impl std::fmt::Display for WebError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.err.user_message())
    }
}

impl actix_web::error::ResponseError for WebError {
    fn error_response(&self) -> HttpResponse {
        let err = HashMap::from([("errors", vec![self.to_string()])]);

        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(err)
    }

    fn status_code(&self) -> StatusCode {
        status_for(&self.err)
    }
}

impl From<AnalysisError> for WebError {
    fn from(err: AnalysisError) -> WebError {
        WebError { err }
    }
}

impl From<base64::DecodeError> for WebError {
    fn from(err: base64::DecodeError) -> Self {
        WebError { err: err.into() }
    }
}

/// An analysis failure rendered as the HTML error page for browser clients
#[derive(Debug)]
pub struct PageError {
    err: AnalysisError,
}

impl std::fmt::Display for PageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.err.user_message())
    }
}

impl actix_web::error::ResponseError for PageError {
    fn error_response(&self) -> HttpResponse {
        pages::render(
            self.status_code(),
            &pages::ErrorPage {
                title: "Error",
                error: &self.to_string(),
            },
        )
    }

    fn status_code(&self) -> StatusCode {
        status_for(&self.err)
    }
}

impl From<AnalysisError> for PageError {
    fn from(err: AnalysisError) -> PageError {
        PageError { err }
    }
}
