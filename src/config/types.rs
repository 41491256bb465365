use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    pub auth: AuthConfig,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub lines: LinesConfig,
    #[serde(default)]
    pub z2m: Z2mConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub core_log: CoreLogConfig,
}

impl Config {
    /// Local rotation candidates for the core log, newest first.
    ///
    /// Relative entries are resolved against `paths.config_dir`.
    pub fn core_log_candidates(&self) -> Vec<PathBuf> {
        self.core_log
            .files
            .iter()
            .map(|file| {
                if file.is_absolute() {
                    file.clone()
                } else {
                    self.paths.config_dir.join(file)
                }
            })
            .collect()
    }

    /// Directories that may hold the Zigbee2MQTT configuration, in lookup order.
    pub fn z2m_config_dirs(&self) -> Vec<PathBuf> {
        vec![
            self.paths.config_dir.join("zigbee2mqtt"),
            self.paths.all_addon_configs_dir.join(&self.z2m.slug),
        ]
    }

    /// Upstream path serving the Zigbee2MQTT add-on logs.
    pub fn z2m_logs_path(&self) -> String {
        format!("/addons/{}/logs", self.z2m.slug)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8099".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Bearer token clients must present.
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token sent to the supervisor.
    pub token: String,
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub connect_timeout: Duration,
    #[serde(with = "humantime_serde", default = "default_read_timeout")]
    pub read_timeout: Duration,
    #[serde(default = "default_no_colors")]
    pub no_colors: bool,
}

fn default_base_url() -> String {
    "http://supervisor".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(6)
}

fn default_no_colors() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinesConfig {
    #[serde(default = "default_lines")]
    pub default: i64,
    #[serde(default = "default_lines")]
    pub max: i64,
}

impl Default for LinesConfig {
    fn default() -> Self {
        Self {
            default: default_lines(),
            max: default_lines(),
        }
    }
}

fn default_lines() -> i64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Z2mConfig {
    #[serde(default = "default_z2m_slug")]
    pub slug: String,
    /// Largest window the debug filter may request from the add-on logs.
    #[serde(default = "default_fetch_cap")]
    pub fetch_cap: usize,
}

impl Default for Z2mConfig {
    fn default() -> Self {
        Self {
            slug: default_z2m_slug(),
            fetch_cap: default_fetch_cap(),
        }
    }
}

fn default_z2m_slug() -> String {
    "45df7312_zigbee2mqtt".to_string()
}

fn default_fetch_cap() -> usize {
    20000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,
    #[serde(default = "default_all_addon_configs_dir")]
    pub all_addon_configs_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            all_addon_configs_dir: default_all_addon_configs_dir(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("/config")
}

fn default_all_addon_configs_dir() -> PathBuf {
    PathBuf::from("/all_addon_configs")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreLogConfig {
    #[serde(default = "default_core_log_files")]
    pub files: Vec<PathBuf>,
}

impl Default for CoreLogConfig {
    fn default() -> Self {
        Self {
            files: default_core_log_files(),
        }
    }
}

fn default_core_log_files() -> Vec<PathBuf> {
    vec![
        PathBuf::from("home-assistant.log"),
        PathBuf::from("home-assistant.log.1"),
        PathBuf::from("home-assistant.log.2"),
    ]
}
