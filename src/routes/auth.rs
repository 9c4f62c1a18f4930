use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::{accounts, sessions};
use crate::error::{AppError, AppResult};
use crate::extractors::{session_token, CurrentAccount};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/user", get(current_user))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, days: u64) -> String {
    let max_age_secs = days * 24 * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Secure; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!(
        "{}=; HttpOnly; SameSite=Strict; Secure; Path=/; Max-Age=0",
        name
    )
}

// -- Handlers --

/// POST /login — verify credentials, flag the account connected, open a
/// session. Unknown email and wrong password both come back as 401.
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Response> {
    let email = req
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::InvalidInput("email is required".to_string()))?;
    let password = req
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::InvalidInput("password is required".to_string()))?;

    let account =
        accounts::find_by_email(&state.db, &email)?.ok_or(AppError::InvalidCredential)?;

    let valid = bcrypt::verify(&password, &account.password_hash)
        .map_err(|e| AppError::Unexpected(format!("password verification failed: {}", e)))?;
    if !valid {
        return Err(AppError::InvalidCredential);
    }

    accounts::set_connected(&state.db, account.id, true)?;
    let token = sessions::create_session(&state.db, account.id, state.config.auth.session_days)?;

    let body = Json(serde_json::json!({ "success": true, "user": account.summary() }));
    Ok((
        [(
            header::SET_COOKIE,
            session_cookie(
                &state.config.auth.cookie_name,
                &token,
                state.config.auth.session_days,
            ),
        )],
        body,
    )
        .into_response())
}

/// POST /logout — clear the connection flag and drop the session. Safe to
/// call without a session; the cookie is cleared either way.
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    if let Some(token) = session_token(&headers, &state.config.auth.cookie_name) {
        if let Some(account) = sessions::find_account_by_token(&state.db, token)? {
            accounts::set_connected(&state.db, account.id, false)?;
        }
        sessions::delete_session(&state.db, token)?;
    }

    let body = Json(serde_json::json!({ "success": true }));
    Ok((
        [(
            header::SET_COOKIE,
            clear_session_cookie(&state.config.auth.cookie_name),
        )],
        body,
    )
        .into_response())
}

/// GET /user — the session-bound account.
async fn current_user(CurrentAccount(account): CurrentAccount) -> AppResult<Response> {
    Ok(Json(serde_json::json!({ "success": true, "user": account.summary() })).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_carries_week_long_max_age() {
        let cookie = session_cookie("courant_session", "tok", 7);
        assert!(cookie.starts_with("courant_session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("Max-Age=604800"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie("courant_session");
        assert!(cookie.starts_with("courant_session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
