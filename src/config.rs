use serde::{Deserialize, Serialize};

use std::{env, fs, path::Path, time::Duration};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_SMTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Outgoing address, used as `From` on every relayed message.
    pub sender: String,
    /// Fixed destination inbox.
    pub recipient: String,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub security: SmtpSecurity,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(with = "humantime_serde", default = "default_smtp_timeout")]
    pub timeout: Duration,
}

/// How the connection to the relay is secured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Plain connection upgraded with STARTTLS (usually port 587).
    #[default]
    Starttls,
    /// Implicit TLS from the first byte (usually port 465).
    Tls,
    /// No encryption at all, for local test relays.
    None,
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_smtp_host() -> String {
    DEFAULT_SMTP_HOST.to_string()
}

const fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

const fn default_smtp_timeout() -> Duration {
    DEFAULT_SMTP_TIMEOUT
}

/// First non-empty value among `keys`, in order.
fn required<F>(lookup: &F, keys: &[&str]) -> Result<String, String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .find_map(|key| lookup(key).filter(|v| !v.is_empty()))
        .ok_or_else(|| format!("{} environment variable is required", keys.join(" or ")))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, String>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key).filter(|v| !v.is_empty()) {
        Some(v) => v
            .parse::<T>()
            .map_err(|e| format!("Failed to parse {key}: {e}")),
        None => Ok(default),
    }
}

/// Only the exact string `true` switches a flag on.
fn flag<F>(lookup: &F, key: &str) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).is_some_and(|v| v == "true")
}

/// Builds a config from environment-style variables. `lookup` abstracts over
/// the process environment so the mapping can be exercised in isolation.
fn config_from_vars<F>(lookup: F) -> Result<Config, String>
where
    F: Fn(&str) -> Option<String>,
{
    // GMAIL_* are the names older deployments were configured with
    let username = required(&lookup, &["SMTP_USER", "GMAIL_USER"])?;
    let password = required(&lookup, &["SMTP_PASSWORD", "GMAIL_APP_PASSWORD"])?;
    let recipient = required(&lookup, &["RECEIVER_EMAIL"])?;

    let security = if flag(&lookup, "SMTP_SECURE") {
        SmtpSecurity::Tls
    } else {
        SmtpSecurity::Starttls
    };

    let timeout = match lookup("SMTP_TIMEOUT").filter(|v| !v.is_empty()) {
        Some(v) => humantime_serde::re::humantime::parse_duration(&v)
            .map_err(|e| format!("Failed to parse SMTP_TIMEOUT: {e}"))?,
        None => DEFAULT_SMTP_TIMEOUT,
    };

    Ok(Config {
        port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
        sender: username.clone(),
        recipient,
        smtp: SmtpConfig {
            host: lookup("SMTP_HOST")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(default_smtp_host),
            port: parse_or(&lookup, "SMTP_PORT", DEFAULT_SMTP_PORT)?,
            security,
            username,
            password,
            accept_invalid_certs: flag(&lookup, "SMTP_ACCEPT_INVALID_CERTS"),
            timeout,
        },
    })
}

fn load_from_env() -> Result<Config, String> {
    // A missing .env file is fine, the variables may come from the real environment
    if let Ok(path) = dotenvy::dotenv() {
        tracing::info!("Loaded environment overrides from {}", path.display());
    }

    config_from_vars(|key| env::var(key).ok())
}

fn load_from_file(path: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(path)?;
    serde_yaml::from_str(&contents).map_err(Into::into)
}

pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    // Retrieve env variable
    let config_path =
        env::var("CONTACT_RELAY_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

    // Try env path
    if Path::new(&config_path).exists() {
        return load_from_file(&config_path);
    }

    // Fallback to config.yaml
    if Path::new("config.yaml").exists() {
        tracing::warn!(
            "Config file '{}' not found, falling back to 'config.yaml'",
            config_path
        );
        return load_from_file("config.yaml");
    }

    // Fallback to config.example.yaml
    if Path::new("config.example.yaml").exists() {
        tracing::warn!(
            "Config file '{}' and 'config.yaml' not found, falling back to 'config.example.yaml'\
             \n This file should not be used and should be replaced with actual data",
            config_path
        );
        return load_from_file("config.example.yaml");
    }

    // Fallback to environment variables
    tracing::info!(
        "No config file found, attempting to load configuration from environment variables"
    );
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Successfully loaded configuration from environment variables");
            Ok(config)
        }
        Err(e) => Err(format!(
            "Config file not found and environment variables are incomplete. \
             Tried: '{config_path}', 'config.yaml', 'config.example.yaml', and environment variables. \
             Error: {e}"
        )
        .into()),
    }
}
