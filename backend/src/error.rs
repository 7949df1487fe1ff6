use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::classifier::ClassifierError;
use crate::db::record_repository::RecordStoreError;
use crate::db::user_repository::UserStoreError;
use crate::scoring::AggregateError;
use crate::storage::S3ServiceError;

/// Boundary error for all handlers. Input-validation failures keep their
/// message; backend failures are logged where they convert and surface as an
/// opaque 500 so internals never leak to the client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Internal Server Error")]
    Internal,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}

impl From<UserStoreError> for ApiError {
    fn from(err: UserStoreError) -> Self {
        match err {
            UserStoreError::DuplicateUsername | UserStoreError::DuplicateEmail => {
                ApiError::BadRequest(err.to_string())
            }
            UserStoreError::NotFound => ApiError::NotFound(err.to_string()),
            UserStoreError::Database(e) => {
                log::error!("User store failure: {e}");
                ApiError::Internal
            }
        }
    }
}

impl From<RecordStoreError> for ApiError {
    fn from(err: RecordStoreError) -> Self {
        match err {
            RecordStoreError::NotFound => ApiError::NotFound("No records found".into()),
            RecordStoreError::Database(e) => {
                log::error!("Record store failure: {e}");
                ApiError::Internal
            }
        }
    }
}

impl From<S3ServiceError> for ApiError {
    fn from(err: S3ServiceError) -> Self {
        match err {
            S3ServiceError::InvalidFormat | S3ServiceError::FileTooLarge => {
                ApiError::BadRequest(err.to_string())
            }
            S3ServiceError::S3(e) => {
                log::error!("Object storage failure: {e}");
                ApiError::Internal
            }
        }
    }
}

impl From<ClassifierError> for ApiError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::Decode(e) => {
                ApiError::BadRequest(format!("unable to decode image: {e}"))
            }
            other => {
                log::error!("Classifier failure: {other}");
                ApiError::Internal
            }
        }
    }
}

impl From<AggregateError> for ApiError {
    fn from(err: AggregateError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<actix_web::error::BlockingError> for ApiError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        log::error!("Inference task aborted: {err}");
        ApiError::Internal
    }
}
