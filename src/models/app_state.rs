use std::time::Duration;

use crate::models::OneTimeStore;
use crate::settings::Settings;

/// Application state structure for the web server
#[derive(Debug)]
pub struct AppState {
    /// Outstanding one-time downloads
    pub downloads: OneTimeStore,
}

impl AppState {
    /// Create a new AppState instance
    pub fn new(download_ttl: Duration) -> Self {
        Self {
            downloads: OneTimeStore::new(download_ttl),
        }
    }

    /// Create an AppState from the current global settings
    pub fn from_settings() -> Self {
        Self::new(Duration::from_secs(Settings::current().one_time_ttl_secs))
    }
}
