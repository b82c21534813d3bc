use std::env;

use epe_common::Secret;
use log::warn;

const DEFAULT_GATEWAY_URL: &str = "https://gateway.example.com";
const DEFAULT_API_VERSION: &str = "v1";

#[derive(Clone, Debug, Default)]
pub struct GatewayConfig {
    /// Base URL of the gateway API, without a trailing slash.
    pub base_url: String,
    pub api_version: String,
    pub secret_key: Secret<String>,
}

impl GatewayConfig {
    pub fn new(base_url: &str, secret_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            secret_key: Secret::new(secret_key.to_string()),
        }
    }

    /// Builds the configuration from the `EPE_GATEWAY_*` environment variables, falling back to
    /// defaults with a logged warning for anything that is not set.
    pub fn from_env_or_default() -> Self {
        let base_url = env::var("EPE_GATEWAY_URL").unwrap_or_else(|_| {
            warn!("🪛️ EPE_GATEWAY_URL is not set. Using the default, {DEFAULT_GATEWAY_URL}.");
            DEFAULT_GATEWAY_URL.into()
        });
        let api_version = env::var("EPE_GATEWAY_API_VERSION").unwrap_or_else(|_| DEFAULT_API_VERSION.into());
        let secret_key = Secret::new(env::var("EPE_GATEWAY_SECRET_KEY").unwrap_or_else(|_| {
            warn!("🪛️ EPE_GATEWAY_SECRET_KEY is not set. Gateway calls will be rejected.");
            String::new()
        }));
        Self { base_url: base_url.trim_end_matches('/').to_string(), api_version, secret_key }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped() {
        let config = GatewayConfig::new("https://gw.test/", "sk_test");
        assert_eq!(config.base_url, "https://gw.test");
        assert_eq!(config.api_version, "v1");
    }
}
