use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Judge client settings.
#[derive(Debug, Deserialize, Clone)]
pub struct JudgeConfig {
    /// Judge API base URL. Default: the Codeforces REST API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Attempts per query before giving up. Default: 5.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Pause after a rate-limit response. Default: 1000 ms.
    #[serde(default = "default_rate_limit_pause_ms")]
    pub rate_limit_pause_ms: u64,
}

/// Session loop cadences.
#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    /// Interval between judge-polling reconciliation passes. Default: 3000 ms.
    #[serde(default = "default_reconcile_interval_ms")]
    pub reconcile_interval_ms: u64,
    /// Interval between countdown ticks. Default: 1000 ms.
    #[serde(default = "default_countdown_interval_ms")]
    pub countdown_interval_ms: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub judge: JudgeConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

fn default_base_url() -> String {
    "https://codeforces.com/api".into()
}
fn default_max_attempts() -> u32 {
    5
}
fn default_rate_limit_pause_ms() -> u64 {
    1000
}
fn default_reconcile_interval_ms() -> u64 {
    3000
}
fn default_countdown_interval_ms() -> u64 {
    1000
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_attempts: default_max_attempts(),
            rate_limit_pause_ms: default_rate_limit_pause_ms(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reconcile_interval_ms: default_reconcile_interval_ms(),
            countdown_interval_ms: default_countdown_interval_ms(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., DUELS__SCHEDULER__RECONCILE_INTERVAL_MS)
            .add_source(Environment::with_prefix("DUELS").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_cadences() {
        let config = AppConfig::default();
        assert_eq!(config.scheduler.reconcile_interval_ms, 3000);
        assert_eq!(config.scheduler.countdown_interval_ms, 1000);
        assert_eq!(config.judge.max_attempts, 5);
        assert_eq!(config.judge.rate_limit_pause_ms, 1000);
        assert_eq!(config.judge.base_url, "https://codeforces.com/api");
    }
}
