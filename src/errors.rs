use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use log::{debug, error, warn};
use serde_json::json;
use thiserror::Error;

// Error taxonomy shared by every workflow. Each variant maps to exactly one
// HTTP status in the ResponseError impl below.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation error: {0}")]
    Validation(String),

    // Missing-dependency validation always enumerates the offending ids so
    // the caller knows which employee numbers / permission ids were bad.
    #[error("{message}")]
    MissingIdentifiers { message: String, ids: Vec<String> },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal server error: {0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Validation(msg) => {
                warn!("\x1B[1;33mVALIDATION ERROR:\x1B[0m {}", msg);
                HttpResponse::BadRequest().json(json!({ "error": msg }))
            }
            ApiError::MissingIdentifiers { message, ids } => {
                warn!("\x1B[1;33mVALIDATION ERROR:\x1B[0m {} ({:?})", message, ids);
                HttpResponse::BadRequest().json(json!({ "error": message, "missing": ids }))
            }
            ApiError::Conflict(msg) => {
                warn!("\x1B[1;33mCONFLICT:\x1B[0m {}", msg);
                HttpResponse::Conflict().json(json!({ "error": msg }))
            }
            ApiError::Unauthorized(msg) => {
                warn!("\x1B[1;33mAUTHENTICATION ERROR:\x1B[0m {}", msg);
                HttpResponse::Unauthorized().json(json!({ "error": msg }))
            }
            ApiError::Forbidden(msg) => {
                warn!("\x1B[1;33mFORBIDDEN:\x1B[0m {}", msg);
                HttpResponse::Forbidden().json(json!({ "error": msg }))
            }
            ApiError::NotFound(msg) => {
                debug!("\x1B[1;36mNOT FOUND:\x1B[0m {}", msg);
                HttpResponse::NotFound().json(json!({ "error": msg }))
            }
            // Store failures are logged server-side with their detail but the
            // caller only ever sees a generic message.
            ApiError::Database(msg) => {
                error!("\x1B[1;31mDATABASE ERROR:\x1B[0m {}", msg);
                HttpResponse::InternalServerError().json(json!({ "error": "Internal Server Error" }))
            }
            ApiError::Internal(msg) => {
                error!("\x1B[1;31mINTERNAL SERVER ERROR:\x1B[0m {}", msg);
                HttpResponse::InternalServerError().json(json!({ "error": "Internal Server Error" }))
            }
        }
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            ApiError::Validation(_) | ApiError::MissingIdentifiers { .. } => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Lets `?` run inside `conn.transaction::<_, ApiError, _>(..)` closures and
// triggers rollback on the way out. Unique violations surface as Conflict so
// the username/email constraints backstop the application-level checks.
impl From<diesel::result::Error> for ApiError {
    fn from(e: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};
        match e {
            Error::NotFound => ApiError::NotFound("record not found".to_string()),
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                ApiError::Conflict(info.message().to_string())
            }
            Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                ApiError::Validation(info.message().to_string())
            }
            other => ApiError::Database(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for ApiError {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        error!("Failed to get database connection: {}", e);
        ApiError::Database(e.to_string())
    }
}

impl From<actix_web::error::BlockingError> for ApiError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        error!("Blocking task error: {}", e);
        ApiError::Internal(e.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(ApiError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::MissingIdentifiers { message: "x".into(), ids: vec!["EMP1".into()] }
                .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(ApiError::Unauthorized("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Database("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unique_violations_map_to_conflict() {
        let err: ApiError = diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key value violates unique constraint".to_string()),
        )
        .into();
        assert!(matches!(err, ApiError::Conflict(_)));
    }
}
