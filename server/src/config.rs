//! # Server configuration
//!
//! Everything is read from environment variables once at startup; see [`vars`] for the names
//! and [`defaults`] for the fallbacks.

use std::{
    env::{self, VarError},
    net::SocketAddr,
    path::PathBuf,
};

use axum_extra::extract::cookie::Key;
use tracing::{info, warn};

use crate::models::AppConfig;

pub mod vars {
    pub const DB_PATH: &str = "DB_PATH";
    pub const LISTEN_ADDR: &str = "LISTEN_ADDR";
    pub const STATIC_DIR: &str = "STATIC_DIR";
    pub const SECRET_KEY: &str = "SECRET_KEY";
    pub const COOKIE_SECURE: &str = "COOKIE_SECURE";
    pub const INSTANCE_NAME: &str = "INSTANCE_NAME";
}

pub mod defaults {
    pub const DB_PATH: &str = "./flashdeck.db";
    pub const LISTEN_ADDR: &str = "0.0.0.0:3000";
    pub const STATIC_DIR: &str = "./static";
    pub const COOKIE_SECURE: bool = true;
}

/// Shortest accepted `SECRET_KEY`, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// BLAKE3 key-derivation context for the session cookie key.
const COOKIE_KEY_CONTEXT: &str = "flashdeck 2024 session cookie key";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not valid UTF-8")]
    EnvNotUtf8(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Session cookie settings.
#[derive(Clone)]
pub struct CookieConfig {
    /// Encrypts and authenticates the session cookie.
    pub key: Key,
    /// Whether the cookie carries the `Secure` attribute.
    pub secure: bool,
}

impl std::fmt::Debug for CookieConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieConfig")
            .field("key", &"<redacted>")
            .field("secure", &self.secure)
            .finish()
    }
}

impl CookieConfig {
    /// Derives the cookie key from a configured master secret.
    #[must_use]
    pub fn from_secret(secret: &[u8], secure: bool) -> Self {
        let mut key = [0u8; 64];
        blake3::Hasher::new_derive_key(COOKIE_KEY_CONTEXT)
            .update(secret)
            .finalize_xof()
            .fill(&mut key);
        Self {
            key: Key::from(&key[..]),
            secure,
        }
    }

    /// Uses a random key. Sessions will not survive a restart.
    #[must_use]
    pub fn ephemeral(secure: bool) -> Self {
        Self {
            key: Key::generate(),
            secure,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    pub listen_addr: SocketAddr,
    pub static_dir: PathBuf,
    pub cookie: CookieConfig,
    pub app: AppConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_path = PathBuf::from(var_or_default(vars::DB_PATH, defaults::DB_PATH)?);
        let static_dir = PathBuf::from(var_or_default(vars::STATIC_DIR, defaults::STATIC_DIR)?);

        let listen_addr = var_or_default(vars::LISTEN_ADDR, defaults::LISTEN_ADDR)?
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: vars::LISTEN_ADDR,
                reason: e.to_string(),
            })?;

        let secure = match var(vars::COOKIE_SECURE)? {
            Some(value) => parse_bool(&value).ok_or_else(|| ConfigError::Invalid {
                var: vars::COOKIE_SECURE,
                reason: format!("expected true or false, got {value:?}"),
            })?,
            None => defaults::COOKIE_SECURE,
        };

        let cookie = match var(vars::SECRET_KEY)? {
            Some(secret) if secret.len() < MIN_SECRET_LEN => {
                return Err(ConfigError::Invalid {
                    var: vars::SECRET_KEY,
                    reason: format!("must be at least {MIN_SECRET_LEN} bytes"),
                });
            }
            Some(secret) => CookieConfig::from_secret(secret.as_bytes(), secure),
            None => {
                warn!("{} not set; sessions will not survive a restart", vars::SECRET_KEY);
                CookieConfig::ephemeral(secure)
            }
        };

        let mut app = AppConfig::default();
        if let Some(name) = var(vars::INSTANCE_NAME)? {
            app.instance_name = name;
        }

        Ok(Self {
            db_path,
            listen_addr,
            static_dir,
            cookie,
            app,
        })
    }
}

fn var(key: &'static str) -> Result<Option<String>, ConfigError> {
    match env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(ConfigError::EnvNotUtf8(key)),
    }
}

fn var_or_default(key: &'static str, default: &str) -> Result<String, ConfigError> {
    Ok(var(key)?.unwrap_or_else(|| {
        info!("{key} not set; using default of {default}");
        default.to_string()
    }))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use axum_extra::extract::cookie::Key;

    use super::{CookieConfig, parse_bool};

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_cookie_key_derivation_is_stable() {
        let secret = b"0123456789abcdef0123456789abcdef";
        let a: Key = CookieConfig::from_secret(secret, true).key;
        let b: Key = CookieConfig::from_secret(secret, false).key;
        let c: Key = CookieConfig::from_secret(b"another secret, also long enough!", true).key;
        assert_eq!(a.master(), b.master());
        assert_ne!(a.master(), c.master());
    }
}
