use bcrypt::{hash, verify, BcryptError};
use chrono::Utc;
use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension, Row};

use crate::models::{Account, Role};

fn bcrypt_to_rusqlite_error(e: BcryptError) -> RusqliteError {
    RusqliteError::ToSqlConversionFailure(Box::new(e))
}

fn row_to_account(row: &Row) -> rusqlite::Result<Account> {
    let role: String = row.get(2)?;
    Ok(Account {
        id: row.get(0)?,
        email: row.get(1)?,
        role: role.parse().map_err(|e: String| {
            RusqliteError::FromSqlConversionFailure(2, rusqlite::types::Type::Text, e.into())
        })?,
        is_active: row.get(3)?,
        sub_admin_id: row.get(4)?,
        last_login_time: row.get(5)?,
    })
}

const ACCOUNT_COLUMNS: &str = "id, email, role, is_active, sub_admin_id, last_login_time";

/// True when a UNIQUE constraint rejected the write.
pub fn is_unique_violation(e: &RusqliteError) -> bool {
    matches!(
        e,
        RusqliteError::SqliteFailure(err, _) if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

pub fn create_account(
    conn: &Connection,
    email: &str,
    password: &str,
    role: Role,
    sub_admin_id: Option<&str>,
) -> Result<i64, RusqliteError> {
    let hashed_password = hash(password, bcrypt::DEFAULT_COST).map_err(bcrypt_to_rusqlite_error)?;
    conn.execute(
        "INSERT INTO accounts (email, password_hash, role, sub_admin_id) VALUES (?1, ?2, ?3, ?4)",
        params![email.trim(), hashed_password, role.as_str(), sub_admin_id],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn email_exists(conn: &Connection, email: &str) -> Result<bool, RusqliteError> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = ?1 COLLATE NOCASE)",
        [email.trim()],
        |row| row.get(0),
    )
}

pub fn read_all_accounts(conn: &Connection) -> Result<Vec<Account>, RusqliteError> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM accounts ORDER BY id", ACCOUNT_COLUMNS))?;
    let rows = stmt.query_map([], row_to_account)?;

    let mut accounts = Vec::new();
    for account in rows {
        accounts.push(account?);
    }
    Ok(accounts)
}

pub fn read_accounts_by_role(conn: &Connection, role: Role) -> Result<Vec<Account>, RusqliteError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM accounts WHERE role = ?1 ORDER BY email",
        ACCOUNT_COLUMNS
    ))?;
    let rows = stmt.query_map([role.as_str()], row_to_account)?;

    let mut accounts = Vec::new();
    for account in rows {
        accounts.push(account?);
    }
    Ok(accounts)
}

pub fn read_account_by_email(conn: &Connection, email: &str) -> Result<Option<Account>, RusqliteError> {
    conn.query_row(
        &format!("SELECT {} FROM accounts WHERE email = ?1 COLLATE NOCASE", ACCOUNT_COLUMNS),
        [email.trim()],
        row_to_account,
    )
    .optional()
}

/// Keeps a sub-admin's login in step with its profile document.
pub fn update_sub_admin_account(
    conn: &Connection,
    sub_admin_id: &str,
    email: &str,
    is_active: bool,
    new_password: Option<&str>,
) -> Result<usize, RusqliteError> {
    if let Some(password) = new_password.filter(|p| !p.is_empty()) {
        let hashed_password = hash(password, bcrypt::DEFAULT_COST).map_err(bcrypt_to_rusqlite_error)?;
        return conn.execute(
            "UPDATE accounts SET email = ?1, is_active = ?2, password_hash = ?3 WHERE sub_admin_id = ?4",
            params![email.trim(), is_active, hashed_password, sub_admin_id],
        );
    }

    conn.execute(
        "UPDATE accounts SET email = ?1, is_active = ?2 WHERE sub_admin_id = ?3",
        params![email.trim(), is_active, sub_admin_id],
    )
}

pub fn update_password(conn: &Connection, email: &str, role: Role, new_password: &str) -> Result<usize, RusqliteError> {
    let hashed_password = hash(new_password, bcrypt::DEFAULT_COST).map_err(bcrypt_to_rusqlite_error)?;
    conn.execute(
        "UPDATE accounts SET password_hash = ?1 WHERE email = ?2 COLLATE NOCASE AND role = ?3",
        params![hashed_password, email.trim(), role.as_str()],
    )
}

pub fn delete_account_for_sub_admin(conn: &Connection, sub_admin_id: &str) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM accounts WHERE sub_admin_id = ?1", [sub_admin_id])
}

/// Returns the account when the password matches and the account is active.
pub fn verify_credentials(conn: &Connection, email: &str, password: &str) -> Option<Account> {
    let res: rusqlite::Result<String> = conn.query_row(
        "SELECT password_hash FROM accounts WHERE email = ?1 COLLATE NOCASE",
        [email.trim()],
        |row| row.get(0),
    );

    let password_hash = res.ok()?;
    if !verify(password, &password_hash).unwrap_or(false) {
        return None;
    }
    read_account_by_email(conn, email).ok().flatten().filter(|account| account.is_active)
}

pub fn update_last_login_time(conn: &Connection, email: &str) -> Result<(), RusqliteError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE accounts SET last_login_time = ?1 WHERE email = ?2 COLLATE NOCASE",
        params![now, email.trim()],
    )?;
    Ok(())
}

pub fn read_setting(conn: &Connection, key: &str) -> Option<String> {
    conn.query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| row.get(0))
        .optional()
        .unwrap_or(None)
}

pub fn update_setting(conn: &Connection, key: &str, value: &str) -> Result<(), RusqliteError> {
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}
