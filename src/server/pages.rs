//! HTML pages, rendered from `templates/`

use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use askama::Template;
use tracing::error;

#[derive(Template)]
#[template(path = "index.html")]
pub(crate) struct IndexPage<'a> {
    pub title: &'a str,
}

#[derive(Template)]
#[template(path = "result.html")]
pub(crate) struct ResultPage<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub image_data: &'a str,
}

#[derive(Template)]
#[template(path = "error.html")]
pub(crate) struct ErrorPage<'a> {
    pub title: &'a str,
    pub error: &'a str,
}

/// Render a page with the given status. A template failure becomes a bare 500
pub(crate) fn render<T: Template>(status: StatusCode, page: &T) -> HttpResponse {
    match page.render() {
        Ok(html) => HttpResponse::build(status)
            .content_type(ContentType::html())
            .body(html),
        Err(e) => {
            error!("failed to render page: {e}");
            HttpResponse::InternalServerError()
                .content_type(ContentType::plaintext())
                .body("internal server error")
        }
    }
}
