use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Typed outcomes for every expected business failure. Anything that is not
/// one of the first five kinds is an infrastructure failure and surfaces as
/// `Database`; retrying it is the caller's decision, not ours.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("authentication required")]
    Unauthenticated,
    #[error("storage failure")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        AppError::InvalidState(msg.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::InvalidState(_) => "invalid_state",
            AppError::Unauthenticated => "unauthenticated",
            AppError::Database(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::InvalidState(_) => StatusCode::CONFLICT,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Postgres signals a racing duplicate insert with SQLSTATE 23505; the
/// uniqueness constraints are the concurrency safety net, so that code and
/// only that code becomes a `Conflict` the caller can treat as "already done".
pub fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
    if is_sqlstate(&err, "23505") {
        AppError::Conflict(message.to_string())
    } else {
        AppError::Database(err)
    }
}

/// Foreign-key violations (23503) on deletes mean the row is still referenced.
pub fn conflict_on_reference(err: sqlx::Error, message: &str) -> AppError {
    if is_sqlstate(&err, "23503") {
        AppError::Conflict(message.to_string())
    } else {
        AppError::Database(err)
    }
}

fn is_sqlstate(err: &sqlx::Error, code: &str) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(code))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Database(e) = &self {
            tracing::error!(error = %e, "storage failure");
        }
        let body = Json(serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_kind_maps_to_its_status() {
        assert_eq!(
            AppError::validation("x").status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(AppError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("course").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(AppError::invalid_state("x").status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Unauthenticated.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_names_the_entity() {
        assert_eq!(AppError::NotFound("course").to_string(), "course not found");
    }

    #[test]
    fn non_database_errors_pass_through_conflict_mapping() {
        // RowNotFound carries no SQLSTATE, so it must stay an infrastructure error.
        let mapped = conflict_on_unique(sqlx::Error::RowNotFound, "duplicate");
        assert!(matches!(mapped, AppError::Database(_)));
        let mapped = conflict_on_reference(sqlx::Error::RowNotFound, "in use");
        assert!(matches!(mapped, AppError::Database(_)));
    }
}
