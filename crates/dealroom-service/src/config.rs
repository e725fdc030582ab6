//! Service configuration.

use std::time::Duration;

use dealroom_core::store::RetryConfig;
use serde::{Deserialize, Serialize};

/// Configuration for the deal service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Retry policy for transient storage failures.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Governing states whose agreements take a mandatory post-signature
    /// attorney-review hold.
    #[serde(default = "default_review_hold_states")]
    pub review_hold_states: Vec<String>,

    /// Length of the attorney-review hold, in business days.
    #[serde(default = "default_review_hold_business_days")]
    pub review_hold_business_days: u32,

    /// Whether the anti-circumvention filter is applied to messages in
    /// rooms without a fully signed agreement. Disabled only in test
    /// environments.
    #[serde(default = "default_filter_enabled")]
    pub filter_enabled: bool,

    /// How often the periodic sweeps (review-hold release, lock
    /// reconciliation) run.
    #[serde(default = "default_sweep_interval", with = "humantime_serde")]
    pub sweep_interval: Duration,
}

fn default_review_hold_states() -> Vec<String> {
    vec!["NJ".to_string()]
}

const fn default_review_hold_business_days() -> u32 {
    3
}

const fn default_filter_enabled() -> bool {
    true
}

const fn default_sweep_interval() -> Duration {
    Duration::from_secs(60)
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            review_hold_states: default_review_hold_states(),
            review_hold_business_days: default_review_hold_business_days(),
            filter_enabled: default_filter_enabled(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.review_hold_states, vec!["NJ"]);
        assert_eq!(config.review_hold_business_days, 3);
        assert!(config.filter_enabled);
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: ServiceConfig = serde_json::from_str(
            r#"{ "review_hold_states": ["NJ", "NY"], "sweep_interval": "30s" }"#,
        )
        .unwrap();
        assert_eq!(config.review_hold_states, vec!["NJ", "NY"]);
        assert_eq!(config.sweep_interval, Duration::from_secs(30));
        assert_eq!(config.review_hold_business_days, 3);
    }
}
