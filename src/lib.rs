use std::sync::{Arc, RwLock};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::helper::draft_helpers::DraftStore;
use crate::helper::notification_helpers::NotificationStore;

pub type DbPool = Pool<SqliteConnectionManager>;

pub struct AppState {
    /// How many notifications a back-office page shows at once.
    pub max_visible_notifications: Arc<RwLock<usize>>,
    /// Wizard drafts, keyed by (account email, form name).
    pub drafts: DraftStore,
    /// Pending notifications, keyed by account email.
    pub notifications: NotificationStore,
}

impl AppState {
    pub fn new(max_visible_notifications: usize) -> Self {
        Self {
            max_visible_notifications: Arc::new(RwLock::new(max_visible_notifications)),
            drafts: DraftStore::default(),
            notifications: NotificationStore::default(),
        }
    }

    pub fn max_visible(&self) -> usize {
        *self.max_visible_notifications.read().unwrap_or_else(|poisoned| {
            log::error!("RwLock for max_visible_notifications was poisoned! Using stale data.");
            poisoned.into_inner()
        })
    }
}

pub mod config;
pub mod forms;
pub mod helper;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod setup;
