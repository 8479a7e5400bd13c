//! Runtime configuration
//!
//! Read from `config.toml` in the platform config directory, then
//! overridden by environment variables.

use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "famly.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FamlyConfig {
    /// Address both listeners bind to
    pub bind_address: IpAddr,
    /// HTTP query interface
    pub http_port: u16,
    /// TCP event channel
    pub room_port: u16,
    /// SQLite file; defaults to the platform data directory
    pub database_path: Option<PathBuf>,
    /// Search is disabled without a key
    pub youtube_api_key: Option<String>,
    pub search_results: u32,
}

impl Default for FamlyConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            http_port: 5000,
            room_port: famly_net::DEFAULT_PORT,
            database_path: None,
            youtube_api_key: None,
            search_results: 10,
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "famly", "famly")
        .ok_or_else(|| anyhow!("Could not determine home directory"))
}

impl FamlyConfig {
    /// Load the config file if there is one, then apply the environment
    pub fn load() -> Result<Self> {
        let path = project_dirs()?.config_dir().join(CONFIG_FILE);
        let config = if path.exists() {
            info!(path = %path.display(), "Loading config");
            Self::from_file(&path)?
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };

        Ok(config.with_env(|key| env::var(key).ok()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Apply `PORT`, `FAMLY_ROOM_PORT`, `FAMLY_DB` and `YOUTUBE_API_KEY`
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = parse_port(&lookup, "PORT") {
            self.http_port = port;
        }
        if let Some(port) = parse_port(&lookup, "FAMLY_ROOM_PORT") {
            self.room_port = port;
        }
        if let Some(path) = lookup("FAMLY_DB").filter(|p| !p.is_empty()) {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(key) = lookup("YOUTUBE_API_KEY").filter(|k| !k.is_empty()) {
            self.youtube_api_key = Some(key);
        }
        self
    }

    /// Where the database lives, with its parent directory created
    pub fn database_path(&self) -> Result<PathBuf> {
        let path = match &self.database_path {
            Some(path) => path.clone(),
            None => project_dirs()?.data_dir().join(DATABASE_FILE),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        Ok(path)
    }
}

fn parse_port<F>(lookup: &F, key: &str) -> Option<u16>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(port) => Some(port),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring invalid port");
            None
        }
    }
}
