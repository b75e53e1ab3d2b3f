use redb::Database;
use rusqlite::{Connection, Result as RusqliteResult, Transaction};
use thiserror::Error;

use crate::models::db_operations::documents_db_operations::{self, DbError};

pub const DEFAULT_MAX_VISIBLE_NOTIFICATIONS: usize = 3;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Content store error: {0}")]
    Content(#[from] DbError),
}

pub fn setup_accounts_db(conn: &mut Connection) -> Result<(), SetupError> {
    let tx = conn.transaction()?;
    log::info!("Creating 'accounts' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL CHECK(role IN ('admin', 'subadmin')),
            is_active INTEGER NOT NULL DEFAULT 1,
            sub_admin_id TEXT UNIQUE,
            last_login_time TEXT
        )",
        [],
    )?;

    log::info!("Creating 'settings' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    seed_initial_settings(&tx)?;

    tx.commit()?;
    Ok(())
}

fn seed_initial_settings(tx: &Transaction) -> RusqliteResult<()> {
    let default_max_visible = DEFAULT_MAX_VISIBLE_NOTIFICATIONS.to_string();
    tx.execute(
        "INSERT OR IGNORE INTO settings (key, value) VALUES ('max_visible_notifications', ?1)",
        [&default_max_visible],
    )?;
    log::info!("Default max visible notifications set to: {}", default_max_visible);
    Ok(())
}

pub fn setup_content_db(db: &Database) -> Result<(), SetupError> {
    log::info!("Creating one table per content collection...");
    documents_db_operations::ensure_collections(db)?;
    Ok(())
}
