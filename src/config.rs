//! Environment-driven configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;

/// Runtime configuration, read from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// HTTP listen port (`PORT`).
    pub port: u16,
    /// Country-code prefix applied to bare 10-digit numbers (`WA_COUNTRY_CODE`).
    pub country_code: String,
    /// Directory holding persisted session credentials (`WA_SESSION_DIR`).
    pub session_dir: PathBuf,
    /// Bounded reconnect attempts before the session stays closed (`WA_MAX_RETRIES`).
    pub max_retries: u32,
    /// Base reconnect delay; doubles per attempt, capped (`WA_RECONNECT_DELAY_MS`).
    pub reconnect_delay: Duration,
    /// Deadline for a single outbound delivery (`WA_SEND_TIMEOUT_MS`).
    pub send_timeout: Duration,
}

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_COUNTRY_CODE: &str = "91";
pub const DEFAULT_SESSION_DIR: &str = "./session";
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3000;
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 10_000;

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            session_dir: PathBuf::from(DEFAULT_SESSION_DIR),
            max_retries: DEFAULT_MAX_RETRIES,
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            send_timeout: Duration::from_millis(DEFAULT_SEND_TIMEOUT_MS),
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults.
    /// Unparseable numeric values are a startup error rather than a silent default.
    pub fn from_env() -> crate::Result<Self> {
        let mut cfg = Self::default();
        if let Some(port) = parse_var("PORT")? {
            cfg.port = port;
        }
        if let Ok(cc) = env::var("WA_COUNTRY_CODE") {
            if !cc.trim().is_empty() {
                cfg.country_code = cc.trim().to_string();
            }
        }
        if let Ok(dir) = env::var("WA_SESSION_DIR") {
            if !dir.trim().is_empty() {
                cfg.session_dir = PathBuf::from(dir);
            }
        }
        if let Some(n) = parse_var("WA_MAX_RETRIES")? {
            cfg.max_retries = n;
        }
        if let Some(ms) = parse_var("WA_RECONNECT_DELAY_MS")? {
            cfg.reconnect_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var("WA_SEND_TIMEOUT_MS")? {
            cfg.send_timeout = Duration::from_millis(ms);
        }
        Ok(cfg)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> crate::Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => {
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(None);
            }
            raw.parse::<T>()
                .map(Some)
                .map_err(|_| Error::Config(format!("invalid {name}: {raw:?}")))
        }
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.country_code, "91");
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.reconnect_delay, Duration::from_secs(3));
        assert_eq!(cfg.send_timeout, Duration::from_secs(10));
    }

    #[test]
    fn parse_var_rejects_garbage() {
        // Env mutation is process-wide; use a name no other test touches.
        std::env::set_var("WA_TEST_BAD_PORT", "not-a-number");
        let res: crate::Result<Option<u16>> = parse_var("WA_TEST_BAD_PORT");
        assert!(res.is_err());
        std::env::remove_var("WA_TEST_BAD_PORT");
    }

    #[test]
    fn parse_var_missing_is_none() {
        let res: Option<u16> = parse_var("WA_TEST_UNSET_VAR").unwrap();
        assert!(res.is_none());
    }
}
