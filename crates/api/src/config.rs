use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use domain::services::IntakePolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    /// Email service configuration
    #[serde(default)]
    pub email: EmailConfig,
    /// Event details and intake limits
    #[serde(default)]
    pub event: EventConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Registrations accepted per client IP within the window. 0 disables.
    #[serde(default = "default_register_rate_limit")]
    pub register_rate_limit: u32,

    #[serde(default = "default_register_rate_window")]
    pub register_rate_window_secs: u64,

    /// Reverse proxies whose `X-Forwarded-For` is believed. Empty means the
    /// socket peer is always the client.
    #[serde(default)]
    pub trusted_proxies: Vec<String>,

    /// Send Strict-Transport-Security. Only behind TLS termination.
    #[serde(default)]
    pub hsts_enabled: bool,
}

/// Email service configuration for attendee confirmations and organizer alerts.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Whether email sending is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Email provider: sendgrid, or console (for development)
    #[serde(default = "default_email_provider")]
    pub provider: String,

    /// SendGrid API key (for sendgrid provider)
    #[serde(default)]
    pub sendgrid_api_key: String,

    /// Sender email address (From header)
    #[serde(default = "default_sender_email")]
    pub sender_email: String,

    /// Sender name (From header)
    #[serde(default = "default_sender_name")]
    pub sender_name: String,

    /// Organizer inbox for new-registration alerts
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_email_provider(),
            sendgrid_api_key: String::new(),
            sender_email: default_sender_email(),
            sender_name: default_sender_name(),
            admin_email: default_admin_email(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventConfig {
    #[serde(default = "default_event_name")]
    pub name: String,

    #[serde(default = "default_event_dates")]
    pub dates: String,

    #[serde(default = "default_event_venue")]
    pub venue: String,

    #[serde(default = "default_registration_open")]
    pub registration_open: bool,

    /// 0 means unlimited.
    #[serde(default)]
    pub max_registrations: i64,

    #[serde(default = "default_notification_timeout")]
    pub notification_timeout_secs: u64,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            name: default_event_name(),
            dates: default_event_dates(),
            venue: default_event_venue(),
            registration_open: default_registration_open(),
            max_registrations: 0,
            notification_timeout_secs: default_notification_timeout(),
        }
    }
}

impl SecurityConfig {
    /// Parsed trusted proxies. Unparseable entries are rejected by `validate`.
    pub fn trusted_proxy_addrs(&self) -> Vec<IpAddr> {
        self.trusted_proxies
            .iter()
            .filter_map(|p| p.trim().parse().ok())
            .collect()
    }
}

impl EventConfig {
    pub fn intake_policy(&self) -> IntakePolicy {
        IntakePolicy {
            registration_open: self.registration_open,
            max_registrations: (self.max_registrations > 0).then_some(self.max_registrations),
            notification_timeout: Duration::from_secs(self.notification_timeout_secs),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_body_size() -> usize {
    65_536
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    2
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_register_rate_limit() -> u32 {
    5
}
fn default_register_rate_window() -> u64 {
    15 * 60
}
fn default_email_provider() -> String {
    "console".to_string()
}
fn default_sender_email() -> String {
    "researchweek@dlsmhsi.edu.ph".to_string()
}
fn default_sender_name() -> String {
    "DLSMHSI Research Week".to_string()
}
fn default_admin_email() -> String {
    "researchweek@dlsmhsi.edu.ph".to_string()
}
fn default_event_name() -> String {
    "DLSMHSI Research Week 2025".to_string()
}
fn default_event_dates() -> String {
    "November 10-14, 2025".to_string()
}
fn default_event_venue() -> String {
    "Villarosa Hall, DLSMHSI Angelo King Medical Center".to_string()
}
fn default_registration_open() -> bool {
    true
}
fn default_notification_timeout() -> u64 {
    10
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with REG__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("REG")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("security.cors_origins")
                    .with_list_parse_key("security.trusted_proxies")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds the config from embedded defaults so tests never touch the
    /// file system.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30
            max_body_size = 65536

            [database]
            url = ""
            max_connections = 20
            min_connections = 2
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []
            register_rate_limit = 5
            register_rate_window_secs = 900
            trusted_proxies = []
            hsts_enabled = false

            [email]
            enabled = false
            provider = "console"
            sender_email = "test@example.com"
            sender_name = "Test"
            admin_email = "organizers@example.com"

            [event]
            name = "Test Research Week"
            dates = "November 10-14, 2025"
            venue = "Test Hall"
            registration_open = true
            max_registrations = 0
            notification_timeout_secs = 10
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "REG__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.server.host.parse::<std::net::IpAddr>().is_err() {
            return Err(ConfigValidationError::InvalidValue(format!(
                "Server host '{}' is not an IP address",
                self.server.host
            )));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.security.register_rate_limit > 0 && self.security.register_rate_window_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "register_rate_window_secs must be positive when rate limiting is enabled"
                    .to_string(),
            ));
        }

        if let Some(bad) = self
            .security
            .trusted_proxies
            .iter()
            .find(|p| p.trim().parse::<IpAddr>().is_err())
        {
            return Err(ConfigValidationError::InvalidValue(format!(
                "trusted_proxies entry '{}' is not an IP address",
                bad
            )));
        }

        match self.email.provider.as_str() {
            "console" => {}
            "sendgrid" => {
                if self.email.enabled && self.email.sendgrid_api_key.is_empty() {
                    return Err(ConfigValidationError::MissingRequired(
                        "REG__EMAIL__SENDGRID_API_KEY must be set for the sendgrid provider"
                            .to_string(),
                    ));
                }
            }
            other => {
                return Err(ConfigValidationError::InvalidValue(format!(
                    "Unknown email provider '{}'. Must be one of: console, sendgrid",
                    other
                )));
            }
        }

        if self.event.notification_timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "notification_timeout_secs must be positive".to_string(),
            ));
        }

        if self.event.max_registrations < 0 {
            return Err(ConfigValidationError::InvalidValue(
                "max_registrations cannot be negative".to_string(),
            ));
        }

        Ok(())
    }

    /// Socket address to bind. `validate` guarantees the host parses.
    pub fn socket_addr(&self) -> SocketAddr {
        let ip = self
            .server
            .host
            .parse()
            .unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
        SocketAddr::new(ip, self.server.port)
    }
}
