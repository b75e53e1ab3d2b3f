use crate::models::content_models::SubAdmin;
use crate::models::db_operations::accounts_db_operations;
use crate::models::db_operations::documents_db_operations::{self as documents, DbError};
use crate::models::{Account, Collection, ContentSection, Role, Status};
use crate::setup::db_setup::DEFAULT_MAX_VISIBLE_NOTIFICATIONS;
use crate::DbPool;
use redb::Database;
use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;

pub const MAX_VISIBLE_NOTIFICATIONS_KEY: &str = "max_visible_notifications";
pub const MAX_VISIBLE_NOTIFICATIONS_LIMIT: usize = 10;

#[derive(Error, Debug)]
pub enum AdminHelperError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Content store error: {0}")]
    Content(#[from] DbError),
    #[error("R2D2 Pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

#[derive(Serialize)]
pub struct Settings {
    pub max_visible_notifications: usize,
}

#[derive(Serialize)]
pub struct CollectionCount {
    pub name: &'static str,
    pub count: usize,
}

/// What a successful login carries into the session.
#[derive(Debug, Clone)]
pub struct StaffLogin {
    pub account: Account,
    pub permissions: Vec<ContentSection>,
}

fn get_conn(pool: &DbPool) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>, AdminHelperError> {
    pool.get().map_err(AdminHelperError::Pool)
}

// Takes a direct connection because it also runs at startup, before the pool
// is handed to actix.
pub fn get_settings(conn: &Connection) -> Settings {
    let max_visible_notifications = accounts_db_operations::read_setting(conn, MAX_VISIBLE_NOTIFICATIONS_KEY)
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(DEFAULT_MAX_VISIBLE_NOTIFICATIONS);
    Settings {
        max_visible_notifications,
    }
}

pub fn update_setting(pool: &DbPool, key: &str, value: &str) -> Result<(), AdminHelperError> {
    let conn = get_conn(pool)?;
    accounts_db_operations::update_setting(&conn, key, value)?;
    Ok(())
}

/// Accepts 1..=10 visible notifications.
pub fn parse_max_visible(input: &str) -> Option<usize> {
    input
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=MAX_VISIBLE_NOTIFICATIONS_LIMIT).contains(n))
}

/// Checks credentials and, for sub-admins, that their profile is active.
/// Returns `None` for any failure so the login page cannot tell them apart.
pub fn verify_staff_login(pool: &DbPool, db: &Database, email: &str, password: &str) -> Option<StaffLogin> {
    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Could not get DB connection from pool for login: {}", e);
            return None;
        }
    };
    let account = accounts_db_operations::verify_credentials(&conn, email, password)?;

    let permissions = match account.role {
        Role::Admin => Vec::new(),
        Role::SubAdmin => {
            let profile_id = account.sub_admin_id.as_deref()?;
            let profile = match documents::get_document::<SubAdmin>(db, profile_id) {
                Ok(Some(profile)) => profile,
                Ok(None) => {
                    log::warn!("Sub-admin account '{}' has no profile document", account.email);
                    return None;
                }
                Err(e) => {
                    log::error!("Failed to load sub-admin profile {}: {}", profile_id, e);
                    return None;
                }
            };
            if profile.data.status != Status::Active {
                return None;
            }
            profile.data.permissions.into_iter().collect()
        }
    };

    if let Err(e) = accounts_db_operations::update_last_login_time(&conn, &account.email) {
        log::warn!("Could not record login time for '{}': {}", account.email, e);
    }
    Some(StaffLogin { account, permissions })
}

pub fn collection_counts(db: &Database, visible: impl Fn(Collection) -> bool) -> Result<Vec<CollectionCount>, AdminHelperError> {
    let mut counts = Vec::new();
    for collection in Collection::ALL.into_iter().filter(|c| visible(*c)) {
        counts.push(CollectionCount {
            name: collection.name(),
            count: documents::get_all_raw(db, collection)?.len(),
        });
    }
    Ok(counts)
}

pub fn fetch_all_accounts(pool: &DbPool) -> Result<Vec<Account>, AdminHelperError> {
    let conn = get_conn(pool)?;
    Ok(accounts_db_operations::read_all_accounts(&conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_visible_must_be_a_small_positive_number() {
        assert_eq!(parse_max_visible(" 4 "), Some(4));
        assert_eq!(parse_max_visible("0"), None);
        assert_eq!(parse_max_visible("11"), None);
        assert_eq!(parse_max_visible("three"), None);
    }
}
