use std::collections::HashMap;

use rusqlite::{params, OptionalExtension};
use serde::Serialize;

use crate::error::AppResult;
use crate::state::DbPool;

/// Display-name fallback for account ids with no matching row.
pub const UNKNOWN_USER: &str = "unknown user";

/// Full account row, including the password hash. Never serialized.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
}

impl Account {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// What login and `GET /user` hand back to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
}

/// Entry in the connected-users list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedAccount {
    pub id: i64,
    pub name: String,
    pub avatar: Option<String>,
}

/// Display data resolved during feed enrichment.
#[derive(Debug, Clone)]
pub struct AccountDisplay {
    pub name: String,
    pub avatar: Option<String>,
}

pub fn find_by_email(pool: &DbPool, email: &str) -> AppResult<Option<Account>> {
    let conn = pool.get()?;
    let account = conn
        .query_row(
            "SELECT id, email, password_hash, first_name, last_name, avatar \
             FROM accounts WHERE email = ?1",
            params![email],
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

pub fn find_display(pool: &DbPool, id: i64) -> AppResult<Option<AccountDisplay>> {
    let conn = pool.get()?;
    let display = conn
        .query_row(
            "SELECT first_name, last_name, avatar FROM accounts WHERE id = ?1",
            params![id],
            |row| {
                let first: String = row.get(0)?;
                let last: String = row.get(1)?;
                Ok(AccountDisplay {
                    name: format!("{} {}", first, last),
                    avatar: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(display)
}

/// Toggle the connection-status flag. Stamps last_login on connect.
pub fn set_connected(pool: &DbPool, id: i64, connected: bool) -> AppResult<()> {
    let conn = pool.get()?;
    if connected {
        conn.execute(
            "UPDATE accounts SET is_connected = 1, last_login = datetime('now') WHERE id = ?1",
            params![id],
        )?;
    } else {
        conn.execute(
            "UPDATE accounts SET is_connected = 0 WHERE id = ?1",
            params![id],
        )?;
    }
    Ok(())
}

/// The connected list is always read fresh from here; the in-memory presence
/// map can desync across process restarts.
pub fn connected_accounts(pool: &DbPool) -> AppResult<Vec<ConnectedAccount>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, first_name, last_name, avatar FROM accounts \
         WHERE is_connected = 1 ORDER BY id",
    )?;
    let accounts = stmt
        .query_map([], |row| {
            let first: String = row.get(1)?;
            let last: String = row.get(2)?;
            Ok(ConnectedAccount {
                id: row.get(0)?,
                name: format!("{} {}", first, last),
                avatar: row.get(3)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();
    Ok(accounts)
}

/// Bulk display lookup for feed enrichment.
pub fn display_map(pool: &DbPool, ids: &[i64]) -> AppResult<HashMap<i64, AccountDisplay>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let conn = pool.get()?;
    let placeholders = vec!["?"; ids.len()].join(",");
    let sql = format!(
        "SELECT id, first_name, last_name, avatar FROM accounts WHERE id IN ({})",
        placeholders
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(ids.iter()), |row| {
            let id: i64 = row.get(0)?;
            let first: String = row.get(1)?;
            let last: String = row.get(2)?;
            let avatar: Option<String> = row.get(3)?;
            Ok((
                id,
                AccountDisplay {
                    name: format!("{} {}", first, last),
                    avatar,
                },
            ))
        })?
        .filter_map(|r| r.ok())
        .collect();
    Ok(rows)
}

/// Insert a single account. Used by seeding and tests.
pub fn insert_account(
    pool: &DbPool,
    email: &str,
    password_hash: &str,
    first_name: &str,
    last_name: &str,
    avatar: Option<&str>,
) -> AppResult<i64> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO accounts (email, password_hash, first_name, last_name, avatar) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![email, password_hash, first_name, last_name, avatar],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fixture accounts for local development. No-op unless the table is empty.
pub fn seed_accounts(pool: &DbPool) -> AppResult<usize> {
    let existing: i64 = {
        let conn = pool.get()?;
        conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?
    };
    if existing > 0 {
        return Ok(0);
    }

    let fixtures = [
        ("alice@courant.dev", "Alice", "Martin"),
        ("bruno@courant.dev", "Bruno", "Lefevre"),
        ("chloe@courant.dev", "Chloe", "Dubois"),
    ];

    let hash = bcrypt::hash("courant", bcrypt::DEFAULT_COST)
        .map_err(|e| crate::error::AppError::Unexpected(e.to_string()))?;

    for (email, first, last) in &fixtures {
        insert_account(pool, email, &hash, first, last, None)?;
    }

    tracing::info!("Seeded {} fixture accounts", fixtures.len());
    Ok(fixtures.len())
}
