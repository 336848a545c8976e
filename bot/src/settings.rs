//! Process settings read from the environment.

use std::time::Duration;

use crate::error::{BotError, Result};

pub const TOKEN: &str = "TELEGRAM_TOKEN";
pub const PORT: &str = "PORT";
pub const API_URL: &str = "TELEGRAM_API_URL";

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub token: String,
    pub port: u16,
    pub api_url: String,
    /// Seconds a `getUpdates` call may wait for new updates.
    pub poll_timeout: u64,
    /// Upper bound for any single HTTP request.
    pub request_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Settings> {
        Settings::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Settings> {
        let token = lookup(TOKEN)
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .ok_or(BotError::MissingToken)?;
        Ok(Settings {
            token,
            port: port(&lookup)?,
            api_url: lookup(API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_owned()),
            poll_timeout: 30,
            request_timeout: Duration::from_secs(60),
        })
    }
}

/// `PORT`, defaulting to 5000.
pub fn port(lookup: impl Fn(&str) -> Option<String>) -> Result<u16> {
    match lookup(PORT) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| BotError::InvalidPort(value)),
        None => Ok(DEFAULT_PORT),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<&str, String> = pairs.iter().map(|(k, v)| (*k, v.to_string())).collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn token_is_required() {
        assert!(matches!(settings(&[]), Err(BotError::MissingToken)));
        assert!(matches!(settings(&[(TOKEN, "  ")]), Err(BotError::MissingToken)));
    }

    #[test]
    fn defaults() {
        let s = settings(&[(TOKEN, "123:abc")]).unwrap();
        assert_eq!(s.token, "123:abc");
        assert_eq!(s.port, 5000);
        assert_eq!(s.api_url, DEFAULT_API_URL);
        assert_eq!(s.poll_timeout, 30);
        assert_eq!(s.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn port_override() {
        assert_eq!(settings(&[(TOKEN, "t"), (PORT, "8080")]).unwrap().port, 8080);
        assert!(matches!(
            settings(&[(TOKEN, "t"), (PORT, "http")]),
            Err(BotError::InvalidPort(_))
        ));
    }
}
