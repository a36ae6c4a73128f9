pub mod chat;
pub mod documents;
pub mod settings;

use crate::config::AppConfig;
use crate::db::Database;
use crate::session::Session;
use tokio::sync::Mutex;

/// Everything the command handlers share for one window.
pub struct AppState {
    pub db: Database,
    pub session: Mutex<Session>,
}

impl AppState {
    pub fn new(db: Database, session: Session) -> Self {
        Self {
            db,
            session: Mutex::new(session),
        }
    }

    pub fn config(&self) -> Result<AppConfig, String> {
        AppConfig::load(&self.db).map_err(|e| e.to_string())
    }
}
