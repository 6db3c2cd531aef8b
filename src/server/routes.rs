use super::pages::{self, IndexPage, ResultPage};
use super::protocol;
use super::{PageError, UploadLimit, WebError};
use crate::analyser::Analyser;
use crate::error::AnalysisError;
use actix_multipart::Multipart;
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{get, post, web, HttpResponse, Responder};
use base64::{engine::general_purpose, Engine as _};
use futures_util::TryStreamExt;
use tracing::{info, warn};

type Result<T> = std::result::Result<T, WebError>;

static FAVICON: &[u8] = include_bytes!("../../static/favicon.ico");

/// Name of the form field holding the upload
const UPLOAD_FIELD: &str = "file";

/// The upload form
#[get("/")]
pub async fn index() -> HttpResponse {
    pages::render(
        StatusCode::OK,
        &IndexPage {
            title: "Image Analyser",
        },
    )
}

/// Analyse an image uploaded from the form and show the description
#[post("/analyse")]
pub async fn analyse(
    payload: Multipart,
    limit: web::Data<UploadLimit>,
    analyser: web::Data<Analyser>,
) -> std::result::Result<HttpResponse, PageError> {
    let upload = read_upload(payload, limit.0).await.map_err(|e| {
        warn!("rejected upload: {e}");
        e
    })?;

    let analysis = analyser.analyze(upload).await?;
    info!("finished serving analysis request");

    Ok(pages::render(
        StatusCode::OK,
        &ResultPage {
            title: "Image Analysis Results",
            description: &analysis.description,
            image_data: &analysis.image.data_uri(),
        },
    ))
}

/// Analyse a base 64 image sent as JSON
#[post("/api/analyse")]
pub async fn analyse_json(
    req: web::Json<protocol::B64Image>,
    analyser: web::Data<Analyser>,
) -> Result<impl Responder> {
    let image = general_purpose::STANDARD.decode(&req.image)?;
    let analysis = analyser.analyze(image).await?;

    info!("finished serving analysis request");

    Ok(web::Json(protocol::AnalysisResponse {
        description: analysis.description,
        model_id: analyser.model_id().to_string(),
    }))
}

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body("OK")
}

#[get("/favicon.ico")]
pub async fn favicon() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("image/x-icon")
        .body(FAVICON)
}

/// Read the bytes of the `file` field, ignoring any other fields
async fn read_upload(
    mut payload: Multipart,
    limit: usize,
) -> std::result::Result<Vec<u8>, AnalysisError> {
    let invalid = |e: actix_multipart::MultipartError| AnalysisError::Decode(format!("invalid upload: {e}"));

    while let Some(mut field) = payload.try_next().await.map_err(invalid)? {
        if field.content_disposition().and_then(|cd| cd.get_name()) != Some(UPLOAD_FIELD) {
            continue;
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(invalid)? {
            if bytes.len() + chunk.len() > limit {
                return Err(AnalysisError::Decode(format!(
                    "the upload is larger than {limit} bytes"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }
        return Ok(bytes);
    }

    Err(AnalysisError::MissingUpload)
}
