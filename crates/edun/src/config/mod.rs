use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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

    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub email: EmailConfig,
    pub payments: PaymentConfig,
    pub admin_token: Option<String>,
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
            storage: StorageConfig::load(environment)?,
            email: EmailConfig::load(environment)?,
            payments: PaymentConfig::load(environment),
            admin_token: non_empty_var("ADMIN_API_TOKEN"),
        })
    }
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    DynamoDb,
}

/// Where submissions are persisted.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub endpoint: Option<String>,
    pub contact_table: String,
    pub volunteer_table: String,
    pub donations_table: String,
}

impl StorageConfig {
    fn load(environment: AppEnvironment) -> Result<Self, ConfigError> {
        let backend = match non_empty_var("STORAGE_BACKEND") {
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "memory" => StorageBackend::Memory,
                "dynamodb" | "dynamo" => StorageBackend::DynamoDb,
                _ => return Err(ConfigError::InvalidStorageBackend(value)),
            },
            None if environment.is_production() => StorageBackend::DynamoDb,
            None => StorageBackend::Memory,
        };

        let donations_table = match non_empty_var("DONATIONS_TABLE") {
            Some(table) => table,
            None if backend == StorageBackend::DynamoDb => {
                return Err(ConfigError::MissingVar("DONATIONS_TABLE"))
            }
            None => "Donations".to_string(),
        };

        Ok(Self {
            backend,
            endpoint: non_empty_var("DYNAMODB_ENDPOINT"),
            contact_table: non_empty_var("CONTACT_TABLE")
                .unwrap_or_else(|| "ContactFormSubmissions".to_string()),
            volunteer_table: non_empty_var("VOLUNTEER_TABLE")
                .unwrap_or_else(|| "VolunteerApplications".to_string()),
            donations_table,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailBackend {
    Log,
    Ses,
}

/// Transactional email addresses and transport.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub backend: EmailBackend,
    pub notification_address: String,
    pub from_address: String,
}

impl EmailConfig {
    fn load(environment: AppEnvironment) -> Result<Self, ConfigError> {
        let backend = match non_empty_var("EMAIL_BACKEND") {
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "log" => EmailBackend::Log,
                "ses" => EmailBackend::Ses,
                _ => return Err(ConfigError::InvalidEmailBackend(value)),
            },
            None if environment.is_production() => EmailBackend::Ses,
            None => EmailBackend::Log,
        };

        let notification_address = non_empty_var("NOTIFICATION_EMAIL")
            .unwrap_or_else(|| "notifications@educatenepal.org".to_string());
        let from_address =
            non_empty_var("SES_FROM_EMAIL").unwrap_or_else(|| notification_address.clone());

        Ok(Self {
            backend,
            notification_address,
            from_address,
        })
    }
}

/// Khalti credentials and redirect targets.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub khalti_secret_key: Option<String>,
    pub khalti_sandbox: bool,
    pub return_url: String,
    pub website_url: String,
}

impl PaymentConfig {
    fn load(environment: AppEnvironment) -> Self {
        Self {
            khalti_secret_key: non_empty_var("KHALTI_SECRET_KEY"),
            khalti_sandbox: !environment.is_production(),
            return_url: non_empty_var("KHALTI_RETURN_URL")
                .unwrap_or_else(|| "https://educatenepal.org/donation/success".to_string()),
            website_url: non_empty_var("KHALTI_WEBSITE_URL")
                .unwrap_or_else(|| "https://educatenepal.org".to_string()),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidStorageBackend(String),
    InvalidEmailBackend(String),
    MissingVar(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidStorageBackend(value) => {
                write!(f, "STORAGE_BACKEND must be 'memory' or 'dynamodb', found '{value}'")
            }
            ConfigError::InvalidEmailBackend(value) => {
                write!(f, "EMAIL_BACKEND must be 'log' or 'ses', found '{value}'")
            }
            ConfigError::MissingVar(name) => {
                write!(f, "missing required environment variable: {name}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
