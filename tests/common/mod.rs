//! Helpers for integration tests.

use r2d2_sqlite::SqliteConnectionManager;
use redb::Database;
use researchdesk_backend::forms::PersistContext;
use researchdesk_backend::setup::db_setup::{setup_accounts_db, setup_content_db};
use researchdesk_backend::DbPool;
use std::sync::Arc;
use tempfile::TempDir;

/// A content store and an accounts database living in a temp directory.
pub struct TestStores {
    _dir: TempDir,
    pub db: Arc<Database>,
    pub pool: DbPool,
}

impl TestStores {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");

        let db = Database::create(dir.path().join("content.db")).expect("Failed to create content store");
        setup_content_db(&db).expect("Content store setup failed");

        let manager = SqliteConnectionManager::file(dir.path().join("accounts.db"));
        let pool = r2d2::Pool::builder()
            .max_size(2)
            .build(manager)
            .expect("Failed to build SQLite pool");
        let mut conn = pool.get().expect("Failed to get SQLite connection from pool.");
        setup_accounts_db(&mut conn).expect("Accounts setup failed");

        TestStores {
            _dir: dir,
            db: Arc::new(db),
            pool,
        }
    }

    pub fn ctx(&self) -> PersistContext<'_> {
        PersistContext {
            db: &self.db,
            pool: &self.pool,
        }
    }
}
