//! Configuration Module
//!
//! Handles configuration loading from a YAML file, environment variables, and
//! command-line arguments, producing the immutable `ProxyConfig` consumed by
//! the rest of the process. Configuration is resolved once at startup and
//! never mutated afterwards.

use crate::{ProxyError, Result};
use clap::{Arg, ArgMatches, Command};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Custom deserializer for Duration from string format like "30s", "5m", "250ms"
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(crate) fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("Empty duration string".to_string());
        }

        let num_end = s
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(s.len());
        if num_end == 0 {
            return Err(format!("No number found in duration string: {}", s));
        }

        let value: f64 = s[..num_end]
            .parse()
            .map_err(|e| format!("Failed to parse number '{}': {}", &s[..num_end], e))?;

        match s[num_end..].trim() {
            "" | "s" | "sec" | "secs" => Ok(Duration::from_secs_f64(value)),
            "m" | "min" | "mins" => Ok(Duration::from_secs_f64(value * 60.0)),
            "h" | "hr" | "hrs" => Ok(Duration::from_secs_f64(value * 3600.0)),
            "ms" | "millis" => Ok(Duration::from_secs_f64(value / 1000.0)),
            unit => Err(format!("Unknown duration unit: {}", unit)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when RUST_LOG is not set
    pub log_level: String,
    /// Optional directory for daily-rotated application log files
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

/// Immutable proxy configuration, produced once by startup validation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Port the proxy listens on for client connections
    pub listen_port: u16,
    /// Address the listener binds to
    pub bind_address: String,
    /// Hostname of the single upstream origin
    pub origin_host: String,
    /// Origin port; plain-HTTP forwarding only
    pub origin_port: u16,
    /// Timeout for establishing the origin connection
    #[serde(deserialize_with = "duration_serde::deserialize")]
    pub connect_timeout: Duration,
    /// Timeout applied to each socket read (client and origin)
    #[serde(deserialize_with = "duration_serde::deserialize")]
    pub read_timeout: Duration,
    /// Upper bound on concurrently served client sessions
    pub max_concurrent_sessions: usize,
    pub logging: LoggingConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_port: 8080,
            bind_address: "0.0.0.0".to_string(),
            origin_host: String::new(),
            origin_port: 80,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            max_concurrent_sessions: 64,
            logging: LoggingConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Load configuration from file, environment, and command line
    pub fn load() -> Result<Self> {
        let matches = Self::build_cli().get_matches();
        Self::from_matches(&matches)
    }

    /// Resolve configuration from parsed CLI matches (file -> env -> CLI)
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let mut config = Self::default();

        if let Some(config_path) = matches.get_one::<String>("config") {
            config = Self::load_from_file(config_path)?;
        }

        config.apply_env_overrides()?;
        config.apply_cli_overrides(matches)?;
        config.validate()?;

        info!(
            "Proxy configured: listen {}:{} -> origin {}:{}",
            config.bind_address, config.listen_port, config.origin_host, config.origin_port
        );
        debug!("Configuration: {:?}", config);

        Ok(config)
    }

    /// Build CLI argument parser
    pub fn build_cli() -> Command {
        Command::new("caching-proxy")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Forward caching proxy for a single HTTP origin")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path (YAML)"),
            )
            .arg(
                Arg::new("port")
                    .long("port")
                    .value_name("PORT")
                    .help("Port to listen on for client connections"),
            )
            .arg(
                Arg::new("origin")
                    .long("origin")
                    .value_name("URL")
                    .help("Origin URL to forward cache misses to"),
            )
            .arg(
                Arg::new("bind-address")
                    .long("bind-address")
                    .value_name("ADDRESS")
                    .help("Address to bind the listener to (default: 0.0.0.0)"),
            )
            .arg(
                Arg::new("origin-port")
                    .long("origin-port")
                    .value_name("PORT")
                    .help("Origin port (default: 80)"),
            )
            .arg(
                Arg::new("connect-timeout")
                    .long("connect-timeout")
                    .value_name("DURATION")
                    .help("Origin connect timeout, e.g. \"10s\" (default: 10s)"),
            )
            .arg(
                Arg::new("read-timeout")
                    .long("read-timeout")
                    .value_name("DURATION")
                    .help("Per-read socket timeout, e.g. \"30s\" (default: 30s)"),
            )
            .arg(
                Arg::new("max-concurrent-sessions")
                    .long("max-concurrent-sessions")
                    .value_name("COUNT")
                    .help("Maximum number of concurrently served client connections"),
            )
            .arg(
                Arg::new("log-level")
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level when RUST_LOG is not set (default: info)"),
            )
            .arg(
                Arg::new("log-dir")
                    .long("log-dir")
                    .value_name("DIR")
                    .help("Directory for daily-rotated application log files"),
            )
    }

    /// Load configuration from YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::ConfigError(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Self = serde_yaml::from_str(&contents)?;
        debug!("Loaded configuration from {}", path);
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var("CACHING_PROXY_PORT") {
            self.listen_port = parse_port(&port)?;
        }
        if let Ok(origin) = std::env::var("CACHING_PROXY_ORIGIN") {
            self.origin_host = parse_origin(&origin)?;
        }
        if let Ok(level) = std::env::var("CACHING_PROXY_LOG_LEVEL") {
            self.logging.log_level = level;
        }
        Ok(())
    }

    /// Apply command line argument overrides
    fn apply_cli_overrides(&mut self, matches: &ArgMatches) -> Result<()> {
        if let Some(port) = matches.get_one::<String>("port") {
            self.listen_port = parse_port(port)?;
        }
        if let Some(origin) = matches.get_one::<String>("origin") {
            self.origin_host = parse_origin(origin)?;
        }
        if let Some(addr) = matches.get_one::<String>("bind-address") {
            self.bind_address = addr.clone();
        }
        if let Some(port) = matches.get_one::<String>("origin-port") {
            self.origin_port = parse_port(port)?;
        }
        if let Some(timeout) = matches.get_one::<String>("connect-timeout") {
            self.connect_timeout = duration_serde::parse_duration(timeout)
                .map_err(ProxyError::ConfigError)?;
        }
        if let Some(timeout) = matches.get_one::<String>("read-timeout") {
            self.read_timeout = duration_serde::parse_duration(timeout)
                .map_err(ProxyError::ConfigError)?;
        }
        if let Some(count) = matches.get_one::<String>("max-concurrent-sessions") {
            self.max_concurrent_sessions = count.parse().map_err(|_| {
                ProxyError::ConfigError(format!(
                    "max-concurrent-sessions must be a positive integer, got {}",
                    count
                ))
            })?;
        }
        if let Some(level) = matches.get_one::<String>("log-level") {
            self.logging.log_level = level.clone();
        }
        if let Some(dir) = matches.get_one::<String>("log-dir") {
            self.logging.log_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// Validate the resolved configuration
    pub fn validate(&self) -> Result<()> {
        if self.origin_host.is_empty() {
            return Err(ProxyError::ConfigError(
                "An origin must be configured (--origin <url>)".to_string(),
            ));
        }
        if self.bind_address.is_empty() {
            return Err(ProxyError::ConfigError(
                "Bind address cannot be empty".to_string(),
            ));
        }
        if self.max_concurrent_sessions == 0 {
            return Err(ProxyError::ConfigError(
                "max-concurrent-sessions must be at least 1".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() || self.read_timeout.is_zero() {
            return Err(ProxyError::ConfigError(
                "Timeouts must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse a port argument: all-digits, within u16 range
fn parse_port(s: &str) -> Result<u16> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return Err(ProxyError::ConfigError(format!(
            "Port must be a number, got {:?}",
            s
        )));
    }
    s.parse::<u16>().map_err(|_| {
        ProxyError::ConfigError(format!("Port out of range (0-65535): {}", s))
    })
}

/// Parse and validate an origin URL, extracting its host
fn parse_origin(s: &str) -> Result<String> {
    let url = Url::parse(s)
        .map_err(|e| ProxyError::ConfigError(format!("Invalid origin URL {:?}: {}", s, e)))?;
    match url.host_str() {
        Some(host) => Ok(host.to_string()),
        None => Err(ProxyError::ConfigError(format!(
            "Origin URL has no host: {}",
            s
        ))),
    }
}
