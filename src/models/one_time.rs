use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::{debug, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of a download token
pub const TOKEN_LENGTH: usize = 10;

#[derive(Debug)]
struct PendingDownload {
    path: PathBuf,
    expires_at: Instant,
}

/// Single-use download tokens for generated files.
///
/// Every token maps to a file on disk and lives for `ttl`. Expired entries
/// are swept on each `register` and `consume`, removing their files too.
/// All methods take `&self`; the table is guarded by a mutex.
#[derive(Debug)]
pub struct OneTimeStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, PendingDownload>>,
}

/// Random token drawn from `[A-Za-z0-9]`.
pub fn generate_token(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

fn remove_file_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

impl OneTimeStore {
    pub fn new(ttl: Duration) -> Self {
        OneTimeStore {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn sweep(entries: &mut HashMap<String, PendingDownload>, now: Instant) {
        entries.retain(|token, entry| {
            if entry.expires_at > now {
                return true;
            }
            debug!("Download token {} expired", token);
            remove_file_quietly(&entry.path);
            false
        });
    }

    /// Register `path` and return its fresh token.
    pub fn register(&self, path: PathBuf) -> String {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Self::sweep(&mut entries, now);

        let mut token = generate_token(TOKEN_LENGTH);
        while entries.contains_key(&token) {
            token = generate_token(TOKEN_LENGTH);
        }
        entries.insert(
            token.clone(),
            PendingDownload {
                path,
                expires_at: now + self.ttl,
            },
        );
        token
    }

    /// Take the file behind `token`. A token can be consumed only once.
    pub fn consume(&self, token: &str) -> Option<PathBuf> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Self::sweep(&mut entries, Instant::now());
        entries.remove(token).map(|entry| entry.path)
    }

    /// Number of live tokens.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
