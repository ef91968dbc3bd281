use crate::config::ClientConfig;
use crate::error::ConfigError;
use url::Url;

/// Resolved push and pull URLs for one controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub push: Url,
    pub pull: Url,
}

impl Endpoints {
    /// Derive both endpoints from the page origin.
    ///
    /// `http` maps to `ws` and `https` to `wss`; host and port are kept and
    /// the path is replaced.
    pub fn from_origin(origin: &str, push_path: &str, pull_path: &str) -> Result<Self, ConfigError> {
        let base = Url::parse(origin).map_err(|_| ConfigError::InvalidOrigin(origin.to_string()))?;
        if base.host_str().is_none() {
            return Err(ConfigError::InvalidOrigin(origin.to_string()));
        }

        let socket_scheme = match base.scheme() {
            "http" => "ws",
            "https" => "wss",
            _ => return Err(ConfigError::InvalidOrigin(origin.to_string())),
        };

        let mut push = base.clone();
        push.set_scheme(socket_scheme)
            .map_err(|_| ConfigError::InvalidOrigin(origin.to_string()))?;
        push.set_path(push_path);
        push.set_query(None);
        push.set_fragment(None);

        let mut pull = base;
        pull.set_path(pull_path);
        pull.set_query(None);
        pull.set_fragment(None);

        Ok(Self { push, pull })
    }

    /// Resolve endpoints from client config, honouring explicit URL overrides.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        let mut endpoints = Self::from_origin(&config.origin, &config.push_path, &config.pull_path)?;

        if let Some(url) = &config.push_url {
            endpoints.push = parse_with_scheme(url, &["ws", "wss"])?;
        }
        if let Some(url) = &config.pull_url {
            endpoints.pull = parse_with_scheme(url, &["http", "https"])?;
        }

        Ok(endpoints)
    }
}

fn parse_with_scheme(raw: &str, schemes: &[&str]) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("scheme must be one of {}", schemes.join(", ")),
        });
    }
    Ok(url)
}
