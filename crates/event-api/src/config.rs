//! # Configuration
//!
//! Process settings are read once at startup, from flags or the environment,
//! into [`ServerArgs`] and then validated into an immutable [`AppConfig`].
//! The config is shared behind an `Arc` and never mutated afterwards.
//!
//! Missing or unusable JWT settings are a startup error: the process refuses
//! to start rather than rejecting every request later.

use std::fmt;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use event_core::InMemoryEventStore;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::cors::DEFAULT_POLICY;

/// Shortest accepted HS256 signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 16;

/// Hosting environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Environment {
    /// Serves API documentation and includes fault details in error bodies.
    Development,
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command-line and environment settings, before validation.
#[derive(Parser)]
#[command(name = "event-api", version, about = "Event API server")]
pub struct ServerArgs {
    /// Port to bind the HTTP listener to.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Hosting environment.
    #[arg(
        long,
        env = "APP_ENVIRONMENT",
        value_enum,
        ignore_case = true,
        default_value_t = Environment::Production
    )]
    pub environment: Environment,

    /// Expected `iss` claim of bearer tokens.
    #[arg(long, env = "JWT_ISSUER")]
    pub jwt_issuer: Option<String>,

    /// Expected `aud` claim of bearer tokens.
    #[arg(long, env = "JWT_AUDIENCE")]
    pub jwt_audience: Option<String>,

    /// Shared HS256 signing secret.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Tolerated clock skew when checking token lifetimes, in seconds.
    #[arg(long, env = "JWT_CLOCK_SKEW_SECS", default_value_t = 60)]
    pub jwt_clock_skew_secs: u64,

    /// Name of the in-memory event database.
    #[arg(long, env = "EVENT_DB_NAME", default_value = InMemoryEventStore::DEFAULT_NAME)]
    pub database_name: String,

    /// CORS policy applied to routes that do not name one.
    #[arg(long, env = "CORS_DEFAULT_POLICY", default_value = DEFAULT_POLICY)]
    pub cors_default_policy: String,
}

/// Invalid startup configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("JWT_SECRET must be at least {min} bytes, got {actual}")]
    WeakSecret { min: usize, actual: usize },
}

/// HS256 signing secret. Redacted in `Debug` output and zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningSecret(String);

impl SigningSecret {
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret {
                min: MIN_SECRET_LEN,
                actual: secret.len(),
            });
        }
        Ok(Self(secret))
    }

    /// Raw key bytes (the UTF-8 encoding of the secret).
    pub fn expose(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret([REDACTED])")
    }
}

/// Token validation parameters.
#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub issuer: String,
    pub audience: String,
    pub secret: SigningSecret,
    pub clock_skew: Duration,
}

impl JwtSettings {
    /// Validate and assemble JWT settings with the default clock skew.
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            issuer: required("JWT_ISSUER", Some(issuer.into()))?,
            audience: required("JWT_AUDIENCE", Some(audience.into()))?,
            secret: SigningSecret::new(secret)?,
            clock_skew: Duration::from_secs(60),
        })
    }
}

/// Validated, immutable application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub environment: Environment,
    pub jwt: JwtSettings,
    pub database_name: String,
    pub cors_default_policy: String,
}

impl AppConfig {
    /// Configuration with default port, database name and CORS policy.
    pub fn new(environment: Environment, jwt: JwtSettings) -> Self {
        Self {
            port: 8080,
            environment,
            jwt,
            database_name: InMemoryEventStore::DEFAULT_NAME.to_string(),
            cors_default_policy: DEFAULT_POLICY.to_string(),
        }
    }

    /// Validate parsed arguments. All three JWT settings are required.
    pub fn from_args(args: ServerArgs) -> Result<Self, ConfigError> {
        let issuer = required("JWT_ISSUER", args.jwt_issuer)?;
        let audience = required("JWT_AUDIENCE", args.jwt_audience)?;
        let secret = args
            .jwt_secret
            .ok_or(ConfigError::Missing("JWT_SECRET"))
            .and_then(SigningSecret::new)?;

        Ok(Self {
            port: args.port,
            environment: args.environment,
            jwt: JwtSettings {
                issuer,
                audience,
                secret,
                clock_skew: Duration::from_secs(args.jwt_clock_skew_secs),
            },
            database_name: args.database_name,
            cors_default_policy: args.cors_default_policy,
        })
    }
}

fn required(key: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(key)),
    }
}
