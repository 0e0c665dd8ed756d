//! Invocation configuration read from the Lambda environment.

use std::time::Duration;

use url::Url;

use crate::regions::RegionSet;

pub const SDK_TOKEN_VAR: &str = "TREBLLE_SDK_TOKEN";
pub const SCAN_REGIONS_VAR: &str = "SCAN_REGIONS";
pub const DISCOVERY_URL_VAR: &str = "TREBLLE_DISCOVERY_URL";

pub const DEFAULT_DISCOVERY_URL: &str = "https://autodiscovery.treblle.com/api/v1/aws";
pub const USER_AGENT: &str = "Treblle-AWS-Discovery/1.0";

/// APIs per delivery request.
pub const BATCH_SIZE: usize = 50;
/// Pause between consecutive delivery requests.
pub const BATCH_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
/// Problems that stop an invocation before any scanning starts.
pub enum ConfigError {
    #[error("TREBLLE_SDK_TOKEN environment variable is required")]
    MissingSdkToken,
    #[error("SCAN_REGIONS environment variable is required")]
    MissingScanRegions,
    #[error("No valid regions found in SCAN_REGIONS")]
    NoValidRegions,
    #[error("invalid TREBLLE_DISCOVERY_URL ({url}): {reason}")]
    InvalidDiscoveryUrl { url: String, reason: String },
}

#[derive(Debug, Clone)]
/// Settings for posting inventory batches.
pub struct DeliveryConfig {
    pub endpoint: Url,
    pub api_key: String,
    pub user_agent: String,
    pub batch_size: usize,
    pub batch_delay: Duration,
}

impl DeliveryConfig {
    pub fn new(endpoint: Url, api_key: impl Into<String>) -> Self {
        Self {
            endpoint,
            api_key: api_key.into(),
            user_agent: USER_AGENT.to_string(),
            batch_size: BATCH_SIZE,
            batch_delay: BATCH_DELAY,
        }
    }
}

#[derive(Debug, Clone)]
/// Everything one invocation needs from the environment.
pub struct Config {
    pub regions: RegionSet,
    pub delivery: DeliveryConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let api_key = non_empty(SDK_TOKEN_VAR).ok_or(ConfigError::MissingSdkToken)?;
        let raw_regions = non_empty(SCAN_REGIONS_VAR).ok_or(ConfigError::MissingScanRegions)?;

        let regions = RegionSet::parse(&raw_regions);
        if regions.is_empty() {
            return Err(ConfigError::NoValidRegions);
        }

        let url = non_empty(DISCOVERY_URL_VAR).unwrap_or_else(|| DEFAULT_DISCOVERY_URL.into());
        let endpoint = Url::parse(&url).map_err(|err| ConfigError::InvalidDiscoveryUrl {
            url: url.clone(),
            reason: err.to_string(),
        })?;

        Ok(Self {
            regions,
            delivery: DeliveryConfig::new(endpoint, api_key),
        })
    }
}
