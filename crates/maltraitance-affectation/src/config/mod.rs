use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Region code of the ARS receiving complaints that no routing rule could place.
pub const DEFAULT_FALLBACK_REGION_CODE: &str = "28";

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
    pub affectation: AffectationConfig,
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

        let fallback_region_code = env::var("AFFECTATION_FALLBACK_REGION_CODE")
            .unwrap_or_else(|_| DEFAULT_FALLBACK_REGION_CODE.to_string())
            .trim()
            .to_string();
        if fallback_region_code.is_empty() {
            return Err(ConfigError::EmptyFallbackRegion);
        }

        let communes_csv = optional_path("AFFECTATION_COMMUNES_CSV");
        let entites_csv = optional_path("AFFECTATION_ENTITES_CSV");

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            affectation: AffectationConfig {
                fallback_region_code,
                communes_csv,
                entites_csv,
            },
        })
    }
}

fn optional_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
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

/// Routing engine settings: fallback target and lookup directory sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffectationConfig {
    pub fallback_region_code: String,
    pub communes_csv: Option<PathBuf>,
    pub entites_csv: Option<PathBuf>,
}

impl Default for AffectationConfig {
    fn default() -> Self {
        Self {
            fallback_region_code: DEFAULT_FALLBACK_REGION_CODE.to_string(),
            communes_csv: None,
            entites_csv: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    EmptyFallbackRegion,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::EmptyFallbackRegion => {
                write!(f, "AFFECTATION_FALLBACK_REGION_CODE must not be empty")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::EmptyFallbackRegion => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("AFFECTATION_FALLBACK_REGION_CODE");
        env::remove_var("AFFECTATION_COMMUNES_CSV");
        env::remove_var("AFFECTATION_ENTITES_CSV");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.affectation, AffectationConfig::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_affectation_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("AFFECTATION_FALLBACK_REGION_CODE", " 11 ");
        env::set_var("AFFECTATION_COMMUNES_CSV", "/data/communes.csv");
        env::set_var("AFFECTATION_ENTITES_CSV", "   ");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.affectation.fallback_region_code, "11");
        assert_eq!(
            config.affectation.communes_csv,
            Some(PathBuf::from("/data/communes.csv"))
        );
        assert_eq!(config.affectation.entites_csv, None);
        reset_env();
    }

    #[test]
    fn rejects_blank_fallback_region() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("AFFECTATION_FALLBACK_REGION_CODE", "  ");
        let err = AppConfig::load().expect_err("blank region rejected");
        assert!(matches!(err, ConfigError::EmptyFallbackRegion));
        reset_env();
    }
}
