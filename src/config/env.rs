use super::AppConfig;
use crate::error::ConfigError;

/// Apply `VESSEL_FEED_*` environment variables on top of a loaded config.
pub fn apply_env_overrides(config: &mut AppConfig) -> Result<(), ConfigError> {
    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Apply overrides from an arbitrary lookup. Unset keys leave the config as-is.
pub fn apply_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("VESSEL_FEED_ORIGIN") {
        config.client.origin = v;
    }
    if let Some(v) = lookup("VESSEL_FEED_PUSH_URL") {
        config.client.push_url = Some(v);
    }
    if let Some(v) = lookup("VESSEL_FEED_PULL_URL") {
        config.client.pull_url = Some(v);
    }
    if let Some(v) = lookup("VESSEL_FEED_REGION") {
        config.feed.region = v;
    }
    if let Some(v) = lookup("VESSEL_FEED_PAGE_SIZE") {
        config.feed.page_size = v.parse::<u32>().map_err(|e| ConfigError::InvalidValue {
            key: "VESSEL_FEED_PAGE_SIZE",
            reason: e.to_string(),
        })?;
    }
    if let Some(v) = lookup("VESSEL_FEED_LOAD_ALL") {
        config.feed.load_all_vessels = v.parse::<bool>().map_err(|e| ConfigError::InvalidValue {
            key: "VESSEL_FEED_LOAD_ALL",
            reason: e.to_string(),
        })?;
    }
    if let Some(v) = lookup("VESSEL_FEED_BIND") {
        config.server.bind = v;
    }

    Ok(())
}
