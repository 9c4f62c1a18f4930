use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};

use crate::db::accounts::Account;
use crate::db::sessions;
use crate::error::AppError;
use crate::state::AppState;

/// The session-bound account behind a request.
/// Rejects with 401 when the cookie is missing, unknown, or expired.
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub Account);

impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers, &state.config.auth.cookie_name)
            .ok_or(AppError::Unauthenticated)?;

        let account = sessions::find_account_by_token(&state.db, token)?
            .ok_or(AppError::Unauthenticated)?;

        Ok(CurrentAccount(account))
    }
}

/// Pull the session token out of the Cookie headers.
pub fn session_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == cookie_name {
                Some(val)
            } else {
                None
            }
        })
}
