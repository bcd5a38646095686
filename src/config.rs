use crate::constants::DEFAULT_TOKEN_TTL_DAYS;
use crate::error::{InspectionError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub mail: MailConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base used to build the review links sent to guests.
    pub public_base_url: String,
    pub metrics_port: Option<u16>,
    pub log_dir: PathBuf,
    /// Days a guest review link stays valid after the inspection is sent.
    pub token_expiry_days: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            public_base_url: "http://localhost:8000".to_string(),
            metrics_port: None,
            log_dir: PathBuf::from("logs"),
            token_expiry_days: DEFAULT_TOKEN_TTL_DAYS as u32,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl ServerConfig {
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.token_expiry_days))
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/inspections.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub sendgrid_api_key: Option<String>,
    pub from_address: String,
    pub manager_email: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sendgrid_api_key: None,
            from_address: "no-reply@example.com".to_string(),
            manager_email: "admin@example.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Directory served under `/media` when no object store is configured.
    pub root: PathBuf,
    pub supabase_url: Option<String>,
    pub supabase_service_role_key: Option<String>,
    pub supabase_bucket: String,
    pub supabase_prefix: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("media"),
            supabase_url: None,
            supabase_service_role_key: None,
            supabase_bucket: "inspections".to_string(),
            supabase_prefix: String::new(),
        }
    }
}

impl MediaConfig {
    /// Supabase URL and key, when both are present.
    pub fn supabase(&self) -> Option<(&str, &str)> {
        match (&self.supabase_url, &self.supabase_service_role_key) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => {
                Some((url.as_str(), key.as_str()))
            }
            _ => None,
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_port(key: &str) -> Result<Option<u16>> {
    env_value(key)
        .map(|v| {
            v.parse::<u16>()
                .map_err(|e| InspectionError::Config(format!("{key} must be a port number: {e}")))
        })
        .transpose()
}

impl Config {
    /// Reads the TOML file when it exists, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        let mut config = if config_path.exists() {
            let config_content = fs::read_to_string(config_path).map_err(|e| {
                InspectionError::Config(format!(
                    "Failed to read config file '{}': {}",
                    config_path.display(),
                    e
                ))
            })?;
            Self::from_toml(&config_content)?
        } else if path.is_some() {
            return Err(InspectionError::Config(format!(
                "Config file '{}' does not exist",
                config_path.display()
            )));
        } else {
            Config::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.server.token_expiry_days == 0 {
            return Err(InspectionError::Config(
                "server.token_expiry_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(port) = env_port("PORT")? {
            self.server.port = port;
        }
        if let Some(port) = env_port("METRICS_PORT")? {
            self.server.metrics_port = Some(port);
        }
        if let Some(host) = env_value("HOST") {
            self.server.host = host;
        }
        if let Some(url) = env_value("PUBLIC_BASE_URL") {
            self.server.public_base_url = url;
        }
        if let Some(days) = env_value("TOKEN_EXPIRY_DAYS") {
            self.server.token_expiry_days = days.parse::<u32>().map_err(|e| {
                InspectionError::Config(format!("TOKEN_EXPIRY_DAYS must be a number of days: {e}"))
            })?;
        }
        if let Some(path) = env_value("DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(key) = env_value("SENDGRID_API_KEY") {
            self.mail.sendgrid_api_key = Some(key);
        }
        if let Some(sender) = env_value("SENDGRID_VERIFIED_SENDER") {
            self.mail.from_address = sender;
        }
        if let Some(manager) = env_value("MANAGER_EMAIL") {
            self.mail.manager_email = manager;
        }
        if let Some(root) = env_value("MEDIA_ROOT") {
            self.media.root = PathBuf::from(root);
        }
        if let Some(url) = env_value("SUPABASE_URL") {
            self.media.supabase_url = Some(url);
        } else if let Some(project_ref) = env_value("SUPABASE_PROJECT_REF") {
            self.media.supabase_url = Some(format!("https://{project_ref}.supabase.co"));
        }
        if let Some(key) = env_value("SUPABASE_SERVICE_ROLE_KEY") {
            self.media.supabase_service_role_key = Some(key);
        }
        if let Some(bucket) = env_value("SUPABASE_BUCKET") {
            self.media.supabase_bucket = bucket;
        }
        if let Some(prefix) = env_value("SUPABASE_PREFIX") {
            self.media.supabase_prefix = prefix;
        }
        self.validate()
    }
}
