use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "secret123";

/// Placeholder JWT secrets that should never reach production.
pub const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

/// Settings for the secret session service.
#[derive(Clone)]
pub struct SecretConfig {
    pub username: String,
    pub password: String,
    pub session_ttl: chrono::Duration,
    pub sweep_interval: Duration,
    pub proxy_timeout: Duration,
    /// Lowercase host names the proxy may contact. Empty allows any host.
    pub proxy_allowed_hosts: Vec<String>,
    /// Key for the optional caller-identity JWT.
    pub jwt_secret: String,
    pub chat_log_capacity: usize,
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.into(),
            password: DEFAULT_PASSWORD.into(),
            session_ttl: chrono::Duration::hours(24),
            sweep_interval: Duration::from_secs(300),
            proxy_timeout: Duration::from_secs(15),
            proxy_allowed_hosts: Vec::new(),
            jwt_secret: "dev-secret-change-me".into(),
            chat_log_capacity: 256,
        }
    }
}

impl std::fmt::Debug for SecretConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("session_ttl", &self.session_ttl)
            .field("sweep_interval", &self.sweep_interval)
            .field("proxy_timeout", &self.proxy_timeout)
            .field("proxy_allowed_hosts", &self.proxy_allowed_hosts)
            .field("chat_log_capacity", &self.chat_log_capacity)
            .finish()
    }
}

impl SecretConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Missing keys fall back to
    /// defaults; present but unparseable numbers are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let ttl_hours: i64 = parse_or(&lookup, "MATHNOOK_SESSION_TTL_HOURS", 24)?;
        if ttl_hours <= 0 {
            anyhow::bail!("MATHNOOK_SESSION_TTL_HOURS must be positive, got {}", ttl_hours);
        }
        let sweep_secs: u64 = parse_or(&lookup, "MATHNOOK_SESSION_SWEEP_SECS", 300)?;
        let timeout_secs: u64 = parse_or(&lookup, "MATHNOOK_PROXY_TIMEOUT_SECS", 15)?;

        let proxy_allowed_hosts = lookup("MATHNOOK_PROXY_ALLOWED_HOSTS")
            .map(|raw| {
                raw.split(',')
                    .map(|h| h.trim().to_ascii_lowercase())
                    .filter(|h| !h.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            username: lookup("SECRET_USERNAME").unwrap_or(defaults.username),
            password: lookup("SECRET_PASSWORD").unwrap_or(defaults.password),
            session_ttl: chrono::Duration::hours(ttl_hours),
            sweep_interval: Duration::from_secs(sweep_secs.max(1)),
            proxy_timeout: Duration::from_secs(timeout_secs.max(1)),
            proxy_allowed_hosts,
            jwt_secret: lookup("MATHNOOK_JWT_SECRET").unwrap_or(defaults.jwt_secret),
            chat_log_capacity: defaults.chat_log_capacity,
        })
    }

    pub fn uses_default_credentials(&self) -> bool {
        self.username == DEFAULT_USERNAME || self.password == DEFAULT_PASSWORD
    }

    pub fn uses_placeholder_jwt_secret(&self) -> bool {
        self.jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&self.jwt_secret.as_str())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        None => Ok(default),
    }
}
