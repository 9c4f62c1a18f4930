use rand::Rng;
use rusqlite::{params, OptionalExtension};

use crate::db::accounts::Account;
use crate::error::AppResult;
use crate::state::DbPool;

/// Create a new session for an account. Returns the session token.
pub fn create_session(pool: &DbPool, account_id: i64, days: u64) -> AppResult<String> {
    let conn = pool.get()?;

    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, account_id, token, expires_at) \
         VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, account_id, token, format!("+{} days", days)],
    )?;

    Ok(token)
}

/// Resolve an unexpired session token to its account.
pub fn find_account_by_token(pool: &DbPool, token: &str) -> AppResult<Option<Account>> {
    let conn = pool.get()?;
    let account = conn
        .query_row(
            "SELECT a.id, a.email, a.password_hash, a.first_name, a.last_name, a.avatar \
             FROM sessions s \
             JOIN accounts a ON a.id = s.account_id \
             WHERE s.token = ?1 AND s.expires_at > datetime('now')",
            params![token],
            |row| {
                Ok(Account {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    password_hash: row.get(2)?,
                    first_name: row.get(3)?,
                    last_name: row.get(4)?,
                    avatar: row.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(account)
}

/// Delete a session by token.
pub fn delete_session(pool: &DbPool, token: &str) -> AppResult<()> {
    let conn = pool.get()?;
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// Drop expired sessions. Run at startup.
pub fn purge_expired(pool: &DbPool) -> AppResult<usize> {
    let conn = pool.get()?;
    let purged = conn.execute(
        "DELETE FROM sessions WHERE expires_at <= datetime('now')",
        [],
    )?;
    Ok(purged)
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
