//! Configuration record threaded through `FeedCore::initialize()`. Loading
//! this from TOML/environment is a host concern: the library only ever
//! receives an already-built settings struct, never reads one itself.

use serde::Deserialize;

fn default_look_back_days() -> i64 {
    7
}

fn default_sleep_interval_ms() -> u64 {
    100
}

#[derive(Clone, Debug, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_look_back_days")]
    pub max_warmup_history_days_look_back: i64,

    #[serde(default)]
    pub tiingo_auth_token: Option<String>,

    #[serde(default = "default_sleep_interval_ms")]
    pub custom_exchange_sleep_interval_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            max_warmup_history_days_look_back: default_look_back_days(),
            tiingo_auth_token: None,
            custom_exchange_sleep_interval_ms: default_sleep_interval_ms(),
        }
    }
}

impl FeedConfig {
    pub fn max_warmup_look_back(&self) -> chrono::Duration {
        chrono::Duration::days(self.max_warmup_history_days_look_back)
    }

    pub fn custom_exchange_sleep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.custom_exchange_sleep_interval_ms)
    }
}
