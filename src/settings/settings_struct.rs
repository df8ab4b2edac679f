use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::LazyLock;
use std::sync::{RwLock, RwLockWriteGuard};
use std::time::Duration;

use log::{info, warn};

use crate::generator::profile::ProfileOptions;
use crate::interfaces::builder::BuildOptions;
use crate::settings::file_settings::FileSettings;

/// Environment variable overriding the one-time link lifetime, in seconds
pub const ENV_ONE_TIME_TTL: &str = "ONE_TIME_DOWNLOAD_TTL_S";

/// Environment variable overriding the origin of one-time links
pub const ENV_PUBLIC_BASE_URL: &str = "PUBLIC_BASE_URL";

/// Settings structure to hold global configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub pref_path: String,

    // Server
    pub listen_address: String,
    pub listen_port: u32,
    pub max_concur_threads: usize,
    pub public_base_url: Option<String>,
    pub one_time_ttl_secs: u64,
    pub max_upload_size: usize,

    // Build
    pub template_path: String,
    pub subs_path: String,
    pub temp_dir: String,
    pub output_path: String,
    pub fetch_subscriptions: bool,
    pub fetch_timeout_secs: u64,
    pub scan_provider_files: bool,
    pub provider_base_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::from(FileSettings::default())
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl From<FileSettings> for Settings {
    fn from(file: FileSettings) -> Self {
        let server = file.server;
        let build = file.build;
        Settings {
            pref_path: String::new(),
            listen_address: server.listen,
            listen_port: server.port,
            max_concur_threads: server.max_concurrent_threads.max(1),
            public_base_url: non_empty(server.public_base_url),
            one_time_ttl_secs: server.one_time_ttl,
            max_upload_size: server.max_upload_size,
            template_path: build.template,
            subs_path: build.subs,
            temp_dir: build.temp_dir,
            output_path: build.output,
            fetch_subscriptions: build.fetch_subscriptions,
            fetch_timeout_secs: build.fetch_timeout,
            scan_provider_files: build.scan_provider_files,
            provider_base_dir: non_empty(build.provider_base_dir),
        }
    }
}

impl Settings {
    /// Create a new settings instance with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current() -> Arc<Settings> {
        GLOBAL.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn current_mut() -> RwLockWriteGuard<'static, Arc<Settings>> {
        GLOBAL.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Parse settings text; `.yaml`/`.yml` paths are read as YAML, anything else as TOML.
    pub fn load_from_content(content: &str, path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let is_yaml = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        let file_settings: FileSettings = if is_yaml {
            serde_yaml::from_str(content)?
        } else {
            toml::from_str(content)?
        };

        let mut settings = Settings::from(file_settings);
        if settings.listen_address.trim().is_empty() {
            settings.listen_address = Settings::default().listen_address;
        }
        settings.pref_path = path.to_owned();
        Ok(settings)
    }

    /// Load settings from a file
    pub fn load_from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Settings::load_from_content(&content, path)
    }

    /// Apply `ONE_TIME_DOWNLOAD_TTL_S` and `PUBLIC_BASE_URL` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var(ENV_ONE_TIME_TTL) {
            match raw.trim().parse::<u64>() {
                Ok(ttl) if ttl > 0 => self.one_time_ttl_secs = ttl,
                _ if raw.trim().is_empty() => {}
                _ => warn!("Ignoring invalid {}: {}", ENV_ONE_TIME_TTL, raw),
            }
        }
        if let Ok(raw) = std::env::var(ENV_PUBLIC_BASE_URL) {
            if let Some(url) = non_empty(raw) {
                self.public_base_url = Some(url);
            }
        }
    }

    /// Listen address, with the configured port appended unless one is present.
    ///
    /// Bare IPv6 hosts are bracketed, e.g. `::` becomes `[::]:8000`.
    pub fn bind_address(&self) -> String {
        let address = self.listen_address.trim();
        if address.is_empty() {
            return format!("127.0.0.1:{}", self.listen_port);
        }
        if address.parse::<SocketAddr>().is_ok() {
            return address.to_string();
        }
        match address.parse::<IpAddr>() {
            Ok(IpAddr::V6(ip)) => format!("[{}]:{}", ip, self.listen_port),
            Ok(IpAddr::V4(ip)) => format!("{}:{}", ip, self.listen_port),
            Err(_) if address.starts_with('[') && address.ends_with(']') => {
                format!("{}:{}", address, self.listen_port)
            }
            // A host name, with a port if it names one.
            Err(_) if address.contains(':') => address.to_string(),
            Err(_) => format!("{}:{}", address, self.listen_port),
        }
    }

    /// Build options derived from these settings.
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            profile: ProfileOptions {
                scan_provider_files: self.scan_provider_files,
                provider_base_dir: self.provider_base_dir.as_ref().map(PathBuf::from),
            },
            fetch_subscriptions: self.fetch_subscriptions,
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
        }
    }
}

// Global settings instance
pub static GLOBAL: LazyLock<RwLock<Arc<Settings>>> =
    LazyLock::new(|| RwLock::new(Arc::new(Settings::new())));

/// Initialize the global settings from `path` (defaults when empty), then apply env overrides.
pub fn init_settings(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = if path.trim().is_empty() {
        Settings::new()
    } else {
        let loaded = Settings::load_from_file(path)?;
        info!("Loaded settings from {}", path);
        loaded
    };
    settings.apply_env_overrides();
    *Settings::current_mut() = Arc::new(settings);
    Ok(())
}
