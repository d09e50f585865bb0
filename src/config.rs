use std::net::SocketAddr;
use std::path::PathBuf;

use zeroize::Zeroize;

/// Application-level constants
pub const APP_NAME: &str = "MedBridge";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Session token lifetime when `MEDBRIDGE_TOKEN_TTL_SECS` is unset (1 day).
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 86_400;

/// HMAC keys shorter than this are refused at startup.
pub const MIN_SECRET_LEN: usize = 32;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "medbridge_lib=info,medbridge=info,tower_http=warn"
}

/// Get the application data directory (~/MedBridge/).
///
/// Falls back to the working directory when no home directory exists
/// (containers running as a bare uid).
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default database location under the app data directory.
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("medbridge.db")
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("MEDBRIDGE_JWT_SECRET is not set")]
    MissingSecret,
    #[error("MEDBRIDGE_JWT_SECRET must be at least {MIN_SECRET_LEN} bytes")]
    WeakSecret,
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("MEDBRIDGE_ADMIN_EMAIL and MEDBRIDGE_ADMIN_PASSWORD must be set together")]
    IncompleteAdmin,
}

/// Token signing key, wiped from memory on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if bytes.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret);
        }
        Ok(Self(bytes))
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// Admin account created at startup when configured.
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

/// Runtime configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    pub secret: SigningSecret,
    pub token_ttl_secs: i64,
    /// Production mode sets the `Secure` flag on session cookies.
    pub production: bool,
    pub admin: Option<AdminBootstrap>,
}

impl ServerConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// A missing or short signing secret is fatal: there is no default key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("MEDBRIDGE_JWT_SECRET").ok_or(ConfigError::MissingSecret)?;
        let secret = SigningSecret::new(secret.into_bytes())?;

        let bind_raw = lookup("MEDBRIDGE_BIND").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: "MEDBRIDGE_BIND",
            value: bind_raw.clone(),
        })?;

        let db_path = lookup("MEDBRIDGE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let token_ttl_secs = match lookup("MEDBRIDGE_TOKEN_TTL_SECS") {
            Some(raw) => match raw.parse::<i64>() {
                Ok(ttl) if ttl > 0 => ttl,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "MEDBRIDGE_TOKEN_TTL_SECS",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_TOKEN_TTL_SECS,
        };

        let production = lookup("MEDBRIDGE_ENV")
            .map(|env| env.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let admin = match (lookup("MEDBRIDGE_ADMIN_EMAIL"), lookup("MEDBRIDGE_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap { email, password }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteAdmin),
        };

        Ok(Self {
            bind_addr,
            db_path,
            secret,
            token_ttl_secs,
            production,
            admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_secret_is_fatal() {
        let err = ServerConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(err, ConfigError::MissingSecret);
    }

    #[test]
    fn short_secret_is_rejected() {
        let err =
            ServerConfig::from_lookup(lookup_from(&[("MEDBRIDGE_JWT_SECRET", "short")])).unwrap_err();
        assert_eq!(err, ConfigError::WeakSecret);
    }

    #[test]
    fn defaults_applied() {
        let config =
            ServerConfig::from_lookup(lookup_from(&[("MEDBRIDGE_JWT_SECRET", SECRET)])).unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.token_ttl_secs, DEFAULT_TOKEN_TTL_SECS);
        assert!(!config.production);
        assert!(config.admin.is_none());
        assert!(config.db_path.ends_with("medbridge.db"));
    }

    #[test]
    fn production_env_enables_secure_cookies() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("MEDBRIDGE_JWT_SECRET", SECRET),
            ("MEDBRIDGE_ENV", "Production"),
        ]))
        .unwrap();
        assert!(config.production);
    }

    #[test]
    fn invalid_ttl_rejected() {
        let err = ServerConfig::from_lookup(lookup_from(&[
            ("MEDBRIDGE_JWT_SECRET", SECRET),
            ("MEDBRIDGE_TOKEN_TTL_SECS", "-5"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "MEDBRIDGE_TOKEN_TTL_SECS", .. }));
    }

    #[test]
    fn admin_requires_both_values() {
        let err = ServerConfig::from_lookup(lookup_from(&[
            ("MEDBRIDGE_JWT_SECRET", SECRET),
            ("MEDBRIDGE_ADMIN_EMAIL", "root@medbridge.test"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::IncompleteAdmin);
    }

    #[test]
    fn secret_debug_is_redacted() {
        let secret = SigningSecret::new(SECRET.as_bytes().to_vec()).unwrap();
        assert!(!format!("{secret:?}").contains("0123"));
    }

    #[test]
    fn app_data_dir_ends_with_app_name() {
        assert!(app_data_dir().ends_with(APP_NAME));
    }
}
