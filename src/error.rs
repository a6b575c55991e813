use actix_web::http::{header::ContentType, StatusCode};
use actix_web::{HttpResponse, ResponseError};

use crate::render::RenderError;
use crate::repo::RepoError;
use crate::storage::ImageError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("not found")] NotFound,
    #[error("bad request")] BadRequest,
    #[error("forbidden")] Forbidden,
    #[error("internal error")] Internal,
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => AppError::NotFound,
            RepoError::Validation(_) => AppError::BadRequest,
            RepoError::Internal(msg) => {
                tracing::error!("store failure: {msg}");
                AppError::Internal
            }
        }
    }
}

impl From<ImageError> for AppError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::NotFound => AppError::NotFound,
            ImageError::UnsupportedFileType | ImageError::TooLarge => AppError::BadRequest,
            ImageError::Io(err) => {
                tracing::error!("image store failure: {err}");
                AppError::Internal
            }
        }
    }
}

impl From<RenderError> for AppError {
    fn from(e: RenderError) -> Self {
        tracing::error!("template failure: {e}");
        AppError::Internal
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest => StatusCode::BAD_REQUEST,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Kept template-free so it still works when rendering is what failed.
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let reason = status.canonical_reason().unwrap_or("Error");
        HttpResponse::build(status).content_type(ContentType::html()).body(format!(
            "<!DOCTYPE html><html><head><title>{code} {reason}</title></head>\
             <body><h1>{code} {reason}</h1><p><a href=\"/\">Back to all posts</a></p></body></html>",
            code = status.as_u16(),
        ))
    }
}
