// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service configuration, read from `PITR_*` environment variables.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use pitr_heal::{EngineConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Telegram Bot API credentials.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &format_args!("<{} chars>", self.bot_token.len()))
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to.
    pub listen_addr: String,
    /// Root of the day-namespaced archive (a mounted remote).
    pub archive_root: PathBuf,
    /// Local directory the database drops finished WAL segments into.
    pub wal_spool: PathBuf,
    /// How often the spool is shipped to today's namespace.
    pub ship_interval: Duration,
    /// Reconcile all historical days once at startup.
    pub startup_reconciliation: bool,
    /// Minimum gap between two Telegram deliveries.
    pub notification_pacing: Duration,
    pub notification_queue: usize,
    /// Emit logs as JSON lines.
    pub log_json: bool,
    /// `None` disables Telegram; notifications are then only logged.
    pub telegram: Option<TelegramConfig>,
    pub engine: EngineConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            archive_root: PathBuf::from("/mnt/pitr-archive"),
            wal_spool: PathBuf::from("/wal_archive"),
            ship_interval: Duration::from_secs(10),
            startup_reconciliation: true,
            notification_pacing: Duration::from_millis(200),
            notification_queue: 100,
            log_json: false,
            telegram: None,
            engine: EngineConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Defaults overridden by the given variables.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k, v.trim().to_string()))
            .filter(|(_, v)| !v.is_empty())
            .collect();
        let mut config = Self::default();

        if let Some(addr) = vars.get("PITR_LISTEN_ADDR") {
            config.listen_addr = addr.clone();
        }
        if let Some(root) = vars.get("PITR_ARCHIVE_ROOT") {
            config.archive_root = PathBuf::from(root);
        }
        if let Some(spool) = vars.get("PITR_WAL_SPOOL") {
            config.wal_spool = PathBuf::from(spool);
        }
        if let Some(secs) = parse::<u64>(&vars, "PITR_SHIP_INTERVAL_SECS")? {
            config.ship_interval = Duration::from_secs(secs.max(1));
        }
        if let Some(flag) = parse_flag(&vars, "PITR_STARTUP_RECONCILIATION")? {
            config.startup_reconciliation = flag;
        }
        if let Some(ms) = parse::<u64>(&vars, "PITR_NOTIFY_PACING_MS")? {
            config.notification_pacing = Duration::from_millis(ms);
        }
        if let Some(size) = parse::<usize>(&vars, "PITR_NOTIFY_QUEUE")? {
            config.notification_queue = size;
        }
        if let Some(flag) = parse_flag(&vars, "PITR_LOG_JSON")? {
            config.log_json = flag;
        }

        let engine = &mut config.engine;
        if let Some(ms) = parse::<i64>(&vars, "PITR_BASE_TOLERANCE_MS")? {
            engine.base_tolerance_ms = ms;
        }
        if let Some(year) = parse::<i32>(&vars, "PITR_PLACEHOLDER_CUTOFF_YEAR")? {
            engine.placeholder_cutoff_year = year;
        }
        if let Some(hours) = parse::<i64>(&vars, "PITR_PLACEHOLDER_OFFSET_HOURS")? {
            engine.placeholder_display_offset_hours = hours;
        }
        if let Some(root) = vars.get("PITR_STAGING_DIR") {
            engine.staging_root = PathBuf::from(root);
        }
        if let Some(days) = parse::<usize>(&vars, "PITR_MAX_CONCURRENT_DAYS")? {
            engine.max_concurrent_days = days.max(1);
        }
        if let Some(flag) = parse_flag(&vars, "PITR_WARM_CACHE")? {
            engine.warm_cache_on_startup = flag;
        }
        if let Some(attempts) = parse::<u32>(&vars, "PITR_RETRY_ATTEMPTS")? {
            engine.retry = RetryPolicy {
                max_attempts: attempts.max(1),
                ..engine.retry.clone()
            };
        }

        config.telegram = match (vars.get("TELEGRAM_BOT_TOKEN"), vars.get("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat)) => Some(TelegramConfig {
                bot_token: token.clone(),
                chat_id: chat.clone(),
            }),
            _ => None,
        };

        Ok(config)
    }
}

fn parse<T>(vars: &HashMap<String, String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    vars.get(key)
        .map(|value| {
            value.parse::<T>().map_err(|err| ConfigError::Invalid {
                key: key.to_string(),
                value: value.clone(),
                reason: err.to_string(),
            })
        })
        .transpose()
}

fn parse_flag(vars: &HashMap<String, String>, key: &str) -> Result<Option<bool>, ConfigError> {
    vars.get(key)
        .map(|value| match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key: key.to_string(),
                value: value.clone(),
                reason: "expected a boolean".to_string(),
            }),
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_vars(Vec::new()).unwrap();
        assert_eq!(config.ship_interval, Duration::from_secs(10));
        assert_eq!(config.notification_pacing, Duration::from_millis(200));
        assert_eq!(config.engine.base_tolerance_ms, 1000);
        assert!(config.telegram.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = ServiceConfig::from_vars(vars(&[
            ("PITR_ARCHIVE_ROOT", "/srv/archive"),
            ("PITR_BASE_TOLERANCE_MS", "2500"),
            ("PITR_LOG_JSON", "true"),
            ("PITR_RETRY_ATTEMPTS", "5"),
            ("TELEGRAM_BOT_TOKEN", " 123:abc \n"),
            ("TELEGRAM_CHAT_ID", "-100200"),
        ]))
        .unwrap();

        assert_eq!(config.archive_root, PathBuf::from("/srv/archive"));
        assert_eq!(config.engine.base_tolerance_ms, 2500);
        assert!(config.log_json);
        assert_eq!(config.engine.retry.max_attempts, 5);
        let telegram = config.telegram.unwrap();
        assert_eq!(telegram.bot_token, "123:abc");
        assert!(!format!("{telegram:?}").contains("123:abc"));
    }

    #[test]
    fn test_telegram_needs_both_values() {
        let config = ServiceConfig::from_vars(vars(&[("TELEGRAM_BOT_TOKEN", "123:abc")])).unwrap();
        assert!(config.telegram.is_none());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = ServiceConfig::from_vars(vars(&[("PITR_SHIP_INTERVAL_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "PITR_SHIP_INTERVAL_SECS"));
        assert!(ServiceConfig::from_vars(vars(&[("PITR_WARM_CACHE", "maybe")])).is_err());
    }
}
