use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub rules: MarketplaceRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Operational bounds for the search and booking paths.
#[derive(Debug, Deserialize, Clone)]
pub struct MarketplaceRules {
    /// Caps the per-ride reconstruction walk
    #[serde(default = "default_max_waypoints")]
    pub max_waypoints_per_ride: usize,
    /// Caps search pagination
    #[serde(default = "default_max_page_size")]
    pub max_page_size: i64,
    /// How many times a conflicted booking transaction is re-run
    #[serde(default = "default_retry_attempts")]
    pub booking_retry_attempts: u32,
    /// Cap on rides pulled into one search pass
    #[serde(default = "default_max_candidate_rides")]
    pub max_candidate_rides: i64,
}

fn default_max_waypoints() -> usize {
    32
}

fn default_max_page_size() -> i64 {
    50
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_max_candidate_rides() -> i64 {
    500
}

impl Default for MarketplaceRules {
    fn default() -> Self {
        Self {
            max_waypoints_per_ride: default_max_waypoints(),
            max_page_size: default_max_page_size(),
            booking_retry_attempts: default_retry_attempts(),
            max_candidate_rides: default_max_candidate_rides(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file
            // Default to 'development' env
            // Note that this file is _optional_
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of SPUTNIK)
            // Eg.. `SPUTNIK__DATABASE__URL=...` would set the database url
            .add_source(config::Environment::with_prefix("SPUTNIK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_defaults_are_sane() {
        let rules = MarketplaceRules::default();
        assert!(rules.max_waypoints_per_ride >= 2);
        assert!(rules.max_page_size > 0);
        assert!(rules.max_candidate_rides >= rules.max_page_size);
    }
}
