pub mod auth;
pub mod posts;
pub mod users;

use axum::routing::get;
use axum::Router;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(posts::router())
        .route("/error", get(error_probe))
}

/// GET /error — exercises the 500 path end to end.
async fn error_probe() -> AppResult<()> {
    Err(AppError::Unexpected("error probe".to_string()))
}
