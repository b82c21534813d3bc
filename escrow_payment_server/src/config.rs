use std::env;

use escrow_payment_engine::sqlite::db::db_url;
use gateway_tools::GatewayConfig;
use log::*;

use crate::errors::ServerError;

const DEFAULT_EPS_HOST: &str = "127.0.0.1";
const DEFAULT_EPS_PORT: u16 = 8360;
/// 4.5% platform commission on supplemental billable hours.
const DEFAULT_FEE_BASIS_POINTS: i64 = 450;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Platform fee rate applied by the escrow authorizer, in basis points.
    pub fee_basis_points: i64,
    pub gateway: GatewayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_EPS_HOST.to_string(),
            port: DEFAULT_EPS_PORT,
            database_url: String::default(),
            fee_basis_points: DEFAULT_FEE_BASIS_POINTS,
            gateway: GatewayConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("EPE_HOST").ok().unwrap_or_else(|| DEFAULT_EPS_HOST.into());
        let port = env::var("EPE_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for EPE_PORT. {e} Using the default, {DEFAULT_EPS_PORT}, instead."
                    );
                    DEFAULT_EPS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_EPS_PORT);
        let database_url = db_url();
        let fee_basis_points = env::var("EPE_FEE_BASIS_POINTS")
            .map(|s| {
                s.parse::<i64>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid fee rate for EPE_FEE_BASIS_POINTS. {e} Using the default, \
                         {DEFAULT_FEE_BASIS_POINTS}, instead."
                    );
                    DEFAULT_FEE_BASIS_POINTS
                })
            })
            .ok()
            .unwrap_or(DEFAULT_FEE_BASIS_POINTS);
        let gateway = GatewayConfig::from_env_or_default();
        Self { host, port, database_url, fee_basis_points, gateway }
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        if self.database_url.is_empty() {
            return Err(ServerError::ConfigurationError("EPE_DATABASE_URL must be set".into()));
        }
        if !(0..=10_000).contains(&self.fee_basis_points) {
            return Err(ServerError::ConfigurationError(format!(
                "EPE_FEE_BASIS_POINTS must be between 0 and 10000, got {}",
                self.fee_basis_points
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fee_rate_outside_the_unit_interval_is_rejected() {
        let mut config = ServerConfig { database_url: "sqlite://:memory:".into(), ..Default::default() };
        assert!(config.validate().is_ok());
        config.fee_basis_points = 10_001;
        assert!(config.validate().is_err());
        config.fee_basis_points = -1;
        assert!(config.validate().is_err());
    }
}
