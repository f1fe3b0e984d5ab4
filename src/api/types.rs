use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::api::error::ApiError;
use crate::auth::TokenKeys;

#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
    pub tokens: TokenKeys,
}

impl AppState {
    pub fn new(conn: Connection, tokens: TokenKeys) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            tokens,
        }
    }

    /// Handlers must not hold the guard across an `.await`.
    pub fn db(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal(anyhow::anyhow!("database mutex poisoned")))
    }
}
