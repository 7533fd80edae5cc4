use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Default body cap for JSON requests (1 MiB)
pub const DEFAULT_MAX_REQUEST_SIZE_BYTES: usize = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiConfig {
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityConfig {
    #[serde(skip)]
    pub signing_secret: SigningSecret,
    pub cors_origins: Vec<String>,
    pub password: PasswordCost,
}

/// Argon2 cost parameters, fixed for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PasswordCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl PasswordCost {
    /// Cheapest parameters argon2 accepts; only for tests.
    pub const MINIMAL: PasswordCost = PasswordCost {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    };

    /// Rejects costs argon2 would refuse at hashing time
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Checked first: argon2 multiplies parallelism by 8 before bounding it
        if self.parallelism > argon2::Params::MAX_P_COST {
            return Err(ConfigError::InvalidValue {
                key: "PASSWORD_PARALLELISM",
                value: self.parallelism.to_string(),
            });
        }
        let Err(err) = argon2::Params::new(self.memory_kib, self.iterations, self.parallelism, None) else {
            return Ok(());
        };
        let (key, value) = match err {
            argon2::Error::TimeTooSmall => ("PASSWORD_ITERATIONS", self.iterations),
            argon2::Error::ThreadsTooFew | argon2::Error::ThreadsTooMany => ("PASSWORD_PARALLELISM", self.parallelism),
            _ => ("PASSWORD_MEMORY_KIB", self.memory_kib),
        };
        Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
    }
}

impl Default for PasswordCost {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

/// Symmetric key used to sign bearer tokens. Never printed.
#[derive(Clone)]
pub struct SigningSecret(String);

impl SigningSecret {
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(ConfigError::Missing("AUTH_SECRET_KEY"));
        }
        Ok(Self(secret))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // The signing key has no default; refusing to start is the only safe option
        let secret = lookup("AUTH_SECRET_KEY").ok_or(ConfigError::Missing("AUTH_SECRET_KEY"))?;
        let secret = SigningSecret::new(secret)?;

        Self::preset(environment, secret).with_overrides(lookup)
    }

    /// Environment defaults with the given signing secret
    pub fn preset(environment: Environment, signing_secret: SigningSecret) -> Self {
        match environment {
            Environment::Production => Self::production(signing_secret),
            Environment::Staging => Self::staging(signing_secret),
            Environment::Development => Self::development(signing_secret),
        }
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(v) = lookup("ANNYNOTES_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("ANNYNOTES_PORT").or_else(|| lookup("PORT")) {
            self.server.port = parse_value("ANNYNOTES_PORT", &v)?;
        }

        // Database overrides
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_value("DATABASE_MAX_CONNECTIONS", &v)?;
        }

        // API overrides
        if let Some(v) = lookup("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = parse_value("API_MAX_REQUEST_SIZE_BYTES", &v)?;
        }

        // Security overrides
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = lookup("PASSWORD_MEMORY_KIB") {
            self.security.password.memory_kib = parse_value("PASSWORD_MEMORY_KIB", &v)?;
        }
        if let Some(v) = lookup("PASSWORD_ITERATIONS") {
            self.security.password.iterations = parse_value("PASSWORD_ITERATIONS", &v)?;
        }
        if let Some(v) = lookup("PASSWORD_PARALLELISM") {
            self.security.password.parallelism = parse_value("PASSWORD_PARALLELISM", &v)?;
        }
        self.security.password.validate()?;

        Ok(self)
    }

    fn development(signing_secret: SigningSecret) -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: "sqlite://annynotes.db".to_string(),
                max_connections: 5,
            },
            api: ApiConfig {
                max_request_size_bytes: DEFAULT_MAX_REQUEST_SIZE_BYTES,
            },
            security: SecurityConfig {
                signing_secret,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                password: PasswordCost::default(),
            },
        }
    }

    fn staging(signing_secret: SigningSecret) -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: "sqlite://annynotes.db".to_string(),
                max_connections: 10,
            },
            api: ApiConfig {
                max_request_size_bytes: DEFAULT_MAX_REQUEST_SIZE_BYTES,
            },
            security: SecurityConfig {
                signing_secret,
                cors_origins: vec!["https://staging.annynotes.example".to_string()],
                password: PasswordCost::default(),
            },
        }
    }

    fn production(signing_secret: SigningSecret) -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: "sqlite://annynotes.db".to_string(),
                max_connections: 20,
            },
            api: ApiConfig {
                max_request_size_bytes: DEFAULT_MAX_REQUEST_SIZE_BYTES,
            },
            security: SecurityConfig {
                signing_secret,
                cors_origins: vec!["https://annynotes.example".to_string()],
                password: PasswordCost {
                    memory_kib: 64 * 1024,
                    iterations: 3,
                    parallelism: 1,
                },
            },
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}
