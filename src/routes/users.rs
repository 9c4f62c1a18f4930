use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::db::accounts;
use crate::error::AppResult;
use crate::extractors::CurrentAccount;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/users/connected", get(connected))
}

/// GET /users/connected — who is connected, per the credential store.
async fn connected(
    State(state): State<AppState>,
    CurrentAccount(_account): CurrentAccount,
) -> AppResult<Response> {
    let users = accounts::connected_accounts(&state.db)?;
    Ok(Json(serde_json::json!({ "success": true, "connectedUsers": users })).into_response())
}
