//! Limits and defaults shared by every request.

use std::{str::FromStr, time::Duration};

use crate::ConfigError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Longest accepted input, in characters.
    pub max_input_chars: usize,
    /// Budget for one call into the algebra engine.
    pub timeout: Duration,
    /// Rendered results are cut at this many characters.
    pub max_output_chars: usize,
    /// Upper index of a sum given without bounds; the lower one is 1.
    pub sum_upper: i64,
    /// Upper index of a product given without bounds.
    pub product_upper: i64,
    /// Threads in the pool each request runs on. 0 picks one per core.
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_input_chars: 200,
            timeout: Duration::from_secs(5),
            max_output_chars: 3000,
            sum_upper: 10,
            product_upper: 5,
            workers: 2,
        }
    }
}

pub const MAX_INPUT: &str = "MATHBOT_MAX_INPUT";
pub const TIMEOUT_MS: &str = "MATHBOT_TIMEOUT_MS";
pub const MAX_OUTPUT: &str = "MATHBOT_MAX_OUTPUT";
pub const SUM_UPPER: &str = "MATHBOT_SUM_UPPER";
pub const PRODUCT_UPPER: &str = "MATHBOT_PRODUCT_UPPER";
pub const WORKERS: &str = "MATHBOT_WORKERS";

impl Config {
    /// Defaults overridden by `MATHBOT_*` environment variables.
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let mut config = Config::default();
        if let Some(v) = parse(&lookup, MAX_INPUT)? {
            config.max_input_chars = v;
        }
        if let Some(ms) = parse::<u64>(&lookup, TIMEOUT_MS)? {
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(v) = parse(&lookup, MAX_OUTPUT)? {
            config.max_output_chars = v;
        }
        if let Some(v) = parse(&lookup, SUM_UPPER)? {
            config.sum_upper = v;
        }
        if let Some(v) = parse(&lookup, PRODUCT_UPPER)? {
            config.product_upper = v;
        }
        if let Some(v) = parse(&lookup, WORKERS)? {
            config.workers = v;
        }
        log::debug!("{:?}", config);
        Ok(config)
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError> {
    let Some(value) = lookup(key) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::Invalid {
            key: key.to_owned(),
            value,
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.max_input_chars, 200);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!((config.sum_upper, config.product_upper), (10, 5));
    }

    #[test]
    fn overrides() {
        let config = config(&[
            (TIMEOUT_MS, "250"),
            (SUM_UPPER, " 20 "),
            (MAX_INPUT, "50"),
            (WORKERS, "4"),
        ])
        .unwrap();
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.workers, 4);
        assert_eq!(config.sum_upper, 20);
        assert_eq!(config.max_input_chars, 50);
        assert_eq!(config.max_output_chars, 3000);
    }

    #[test]
    fn invalid_values() {
        assert_eq!(
            config(&[(MAX_OUTPUT, "lots")]),
            Err(ConfigError::Invalid {
                key: MAX_OUTPUT.to_owned(),
                value: "lots".to_owned()
            })
        );
        assert!(config(&[(MAX_INPUT, "-1")]).is_err());
    }
}
