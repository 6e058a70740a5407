use crate::config::Settings;
use crate::db::Database;

// app's shared state
pub struct AppState {
    pub db: Database,
    pub settings: Settings, // read-only after startup
}

impl AppState {
    pub fn new(db: Database, settings: Settings) -> Self {
        Self { db, settings }
    }
}
