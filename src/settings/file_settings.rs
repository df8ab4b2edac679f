use serde::{Deserialize, Serialize};

fn default_listen_address() -> String {
    "127.0.0.1".to_string()
}

fn default_listen_port() -> u32 {
    8000
}

fn default_max_concurrent_threads() -> usize {
    4
}

fn default_template_path() -> String {
    "templates/ryan.yaml".to_string()
}

fn default_subs_path() -> String {
    "subs.yaml".to_string()
}

fn default_temp_dir() -> String {
    "temp".to_string()
}

fn default_output_path() -> String {
    "temp/sub.yaml".to_string()
}

fn default_one_time_ttl() -> u64 {
    180
}

fn default_max_upload_size() -> usize {
    1024 * 1024 // 1MB
}

fn default_fetch_timeout() -> u64 {
    25
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    #[serde(default = "default_listen_address")]
    pub listen: String,
    #[serde(default = "default_listen_port")]
    pub port: u32,
    #[serde(default = "default_max_concurrent_threads")]
    pub max_concurrent_threads: usize,
    /// Origin used in one-time links, e.g. `https://sub.example.com`
    pub public_base_url: String,
    #[serde(default = "default_one_time_ttl")]
    pub one_time_ttl: u64,
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            listen: default_listen_address(),
            port: default_listen_port(),
            max_concurrent_threads: default_max_concurrent_threads(),
            public_base_url: String::new(),
            one_time_ttl: default_one_time_ttl(),
            max_upload_size: default_max_upload_size(),
        }
    }
}

/// Build settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    #[serde(default = "default_template_path")]
    pub template: String,
    #[serde(default = "default_subs_path")]
    pub subs: String,
    #[serde(default = "default_temp_dir")]
    pub temp_dir: String,
    #[serde(default = "default_output_path")]
    pub output: String,
    pub fetch_subscriptions: bool,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: u64,
    pub scan_provider_files: bool,
    pub provider_base_dir: String,
}

impl Default for BuildSettings {
    fn default() -> Self {
        BuildSettings {
            template: default_template_path(),
            subs: default_subs_path(),
            temp_dir: default_temp_dir(),
            output: default_output_path(),
            fetch_subscriptions: false,
            fetch_timeout: default_fetch_timeout(),
            scan_provider_files: false,
            provider_base_dir: String::new(),
        }
    }
}

/// Settings file layout, shared by the TOML and YAML formats
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileSettings {
    pub server: ServerSettings,
    pub build: BuildSettings,
}
