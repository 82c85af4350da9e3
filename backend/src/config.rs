//! Runtime configuration.
//!
//! Values come from the environment (a `.env` file is loaded first when
//! present) and fall back to the defaults below. CLI flags override them.
//!
//! | Variable                       | Default |
//! |--------------------------------|---------|
//! | `TABLEMERGE_PORT`              | 3000    |
//! | `TABLEMERGE_SCRIPT_CACHE_SIZE` | 10000   |
//! | `TABLEMERGE_MAX_DOCS`          | 100     |

use std::env;
use std::str::FromStr;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SCRIPT_CACHE_SIZE: usize = 10_000;
/// Documents scanned per dataset when describing JSON columns.
pub const DEFAULT_MAX_DOCS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Maximum number of memoized script results.
    pub script_cache_size: usize,
    /// Documents scanned per dataset when describing JSON columns.
    pub max_docs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            script_cache_size: DEFAULT_SCRIPT_CACHE_SIZE,
            max_docs: DEFAULT_MAX_DOCS,
        }
    }
}

impl Config {
    /// Read configuration from the environment.
    ///
    /// Unparsable values are ignored in favour of the default.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            port: parse_or(lookup("TABLEMERGE_PORT"), defaults.port),
            script_cache_size: parse_or(
                lookup("TABLEMERGE_SCRIPT_CACHE_SIZE"),
                defaults.script_cache_size,
            ),
            max_docs: parse_or(lookup("TABLEMERGE_MAX_DOCS"), defaults.max_docs),
        }
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config, Config::default());
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_docs, 100);
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let vars: HashMap<&str, &str> = [
            ("TABLEMERGE_PORT", "8080"),
            ("TABLEMERGE_SCRIPT_CACHE_SIZE", "not-a-number"),
            ("TABLEMERGE_MAX_DOCS", " 5 "),
        ]
        .into_iter()
        .collect();
        let config = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.port, 8080);
        assert_eq!(config.script_cache_size, DEFAULT_SCRIPT_CACHE_SIZE);
        assert_eq!(config.max_docs, 5);
    }
}
