use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// The daemon's whole configuration, loaded once at startup from the TOML
/// file pointed to by `--config-file` / `POSTCONFIRM_CONFIG`. A bad or
/// incomplete file is a startup error: the process never enters the
/// decision loop.
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub pid: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    pub listen_addr: String,

    pub mail_template: PathBuf,
    pub admin_address: String,

    #[serde(default = "default_bulk_regex")]
    pub bulk_regex: String,
    #[serde(default = "default_auto_submitted_regex")]
    pub auto_submitted_regex: String,

    #[serde(default)]
    pub challenge_recipients: Vec<String>,

    pub confirm_ttl_seconds: Option<i64>,

    pub smtp_host: String,

    pub db: DbConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DbConfig {
    pub name: String,
    pub user: String,
    pub password: Option<String>,
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default = "default_pool_max_connections")]
    pub pool_max_connections: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bulk_regex() -> String {
    r"(junk|list|bulk|auto_reply)".to_string()
}

fn default_auto_submitted_regex() -> String {
    r"^auto-".to_string()
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_pool_max_connections() -> u32 {
    10
}

pub fn read_config(config_file: PathBuf) -> Result<Config> {
    let mut file = std::fs::OpenOptions::new()
        .read(true)
        .open(&config_file)
        .with_context(|| format!("opening config file {config_file:?}"))?;

    let mut raw = String::new();
    file.read_to_string(&mut raw)?;

    toml::from_str(&raw).with_context(|| format!("parsing config file {config_file:?}"))
}
