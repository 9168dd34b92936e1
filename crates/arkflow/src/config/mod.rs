use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use rust_decimal::Decimal;

use crate::fleet::money::Money;
use crate::fleet::service::LedgerSettings;
use crate::fleet::settlement::NegativePayoutPolicy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub ledger: LedgerConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            ledger: LedgerConfig::from_env()?,
        })
    }
}

/// Settlement and reporting knobs for the fleet ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub negative_payout: NegativePayoutPolicy,
    /// Directory for the JSON snapshot store; in-memory storage when unset.
    pub data_dir: Option<PathBuf>,
    pub compliance_horizon_days: i64,
    pub default_fast_tag: Money,
    pub default_toll: Money,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        let settings = LedgerSettings::default();
        Self {
            negative_payout: settings.negative_payout,
            data_dir: None,
            compliance_horizon_days: settings.compliance_horizon_days,
            default_fast_tag: settings.default_fast_tag,
            default_toll: settings.default_toll,
        }
    }
}

impl LedgerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let negative_payout = match env::var("ARKFLOW_NEGATIVE_PAYOUT") {
            Ok(raw) => NegativePayoutPolicy::parse(&raw)
                .ok_or(ConfigError::InvalidPayoutPolicy { value: raw })?,
            Err(_) => defaults.negative_payout,
        };

        let data_dir = env::var("ARKFLOW_DATA_DIR")
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);

        let compliance_horizon_days = match env::var("ARKFLOW_COMPLIANCE_HORIZON_DAYS") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map(i64::from)
                .map_err(|_| ConfigError::InvalidHorizon { value: raw })?,
            Err(_) => defaults.compliance_horizon_days,
        };

        Ok(Self {
            negative_payout,
            data_dir,
            compliance_horizon_days,
            default_fast_tag: money_var("ARKFLOW_DEFAULT_FAST_TAG", defaults.default_fast_tag)?,
            default_toll: money_var("ARKFLOW_DEFAULT_TOLL", defaults.default_toll)?,
        })
    }

    pub fn settings(&self) -> LedgerSettings {
        LedgerSettings {
            negative_payout: self.negative_payout,
            compliance_horizon_days: self.compliance_horizon_days,
            default_fast_tag: self.default_fast_tag,
            default_toll: self.default_toll,
        }
    }
}

fn money_var(name: &'static str, default: Money) -> Result<Money, ConfigError> {
    let Ok(raw) = env::var(name) else {
        return Ok(default);
    };
    let amount = raw
        .trim()
        .parse::<Decimal>()
        .map(Money::new)
        .map_err(|_| ConfigError::InvalidAmount {
            name,
            value: raw.clone(),
        })?;
    if amount.is_negative() {
        return Err(ConfigError::InvalidAmount { name, value: raw });
    }
    Ok(amount)
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPayoutPolicy { value: String },
    InvalidHorizon { value: String },
    InvalidAmount { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPayoutPolicy { value } => write!(
                f,
                "ARKFLOW_NEGATIVE_PAYOUT must be 'reject' or 'clamp' (found '{value}')"
            ),
            ConfigError::InvalidHorizon { value } => write!(
                f,
                "ARKFLOW_COMPLIANCE_HORIZON_DAYS must be a whole number of days (found '{value}')"
            ),
            ConfigError::InvalidAmount { name, value } => {
                write!(f, "{name} must be a non-negative amount (found '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidPayoutPolicy { .. }
            | ConfigError::InvalidHorizon { .. }
            | ConfigError::InvalidAmount { .. } => None,
        }
    }
}
