use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("invalid credentials")]
    InvalidCredential,

    #[error("not found")]
    NotFound,

    #[error("content store unavailable: {0}")]
    StorageUnavailable(#[from] mongodb::error::Error),

    #[error("write not acknowledged")]
    PersistenceFailure,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("BSON error: {0}")]
    Bson(#[from] mongodb::bson::ser::Error),

    #[error("internal error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated | AppError::InvalidCredential => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to clients. Infrastructure details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::Unauthenticated => "authentication required".to_string(),
            AppError::InvalidCredential => "invalid credentials".to_string(),
            AppError::NotFound => "not found".to_string(),
            _ => "internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }

        let body = Json(serde_json::json!({
            "success": false,
            "message": self.public_message(),
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn response_status(err: AppError) -> StatusCode {
        let response = err.into_response();
        response.status()
    }

    #[test]
    fn invalid_input_returns_400() {
        assert_eq!(
            response_status(AppError::InvalidInput("missing field".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn unauthenticated_returns_401() {
        assert_eq!(
            response_status(AppError::Unauthenticated),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn invalid_credential_returns_401() {
        assert_eq!(
            response_status(AppError::InvalidCredential),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn not_found_returns_404() {
        assert_eq!(response_status(AppError::NotFound), StatusCode::NOT_FOUND);
    }

    #[test]
    fn persistence_failure_returns_500() {
        assert_eq!(
            response_status(AppError::PersistenceFailure),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unexpected_returns_500() {
        assert_eq!(
            response_status(AppError::Unexpected("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn public_message_hides_internals() {
        let err = AppError::Unexpected("connection refused at 10.0.0.5".into());
        assert_eq!(err.public_message(), "internal server error");
    }

    #[test]
    fn invalid_input_message_passes_through() {
        let err = AppError::InvalidInput("postId is required".into());
        assert_eq!(err.public_message(), "postId is required");
    }
}
