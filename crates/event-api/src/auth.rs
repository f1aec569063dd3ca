//! # Bearer Token Authentication
//!
//! Validates `Authorization: Bearer <jwt>` headers against the configured
//! issuer, audience, lifetime, and HS256 shared-secret signature.
//!
//! ## CallerIdentity
//!
//! Every authenticated request gets a [`CallerIdentity`] built from the token
//! claims, injected into the request extensions. Handlers extract it via the
//! `FromRequestParts` impl.
//!
//! Failed checks short-circuit with `401 Unauthorized` before routing
//! reaches a handler.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::JwtSettings;
use crate::error::{AppError, ErrorBody};

// ── Claims ──────────────────────────────────────────────────────────────────

/// `aud` may be a single string or an array (RFC 7519 §4.1.3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

/// Registered claims the API reads, plus everything else the issuer put in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub iss: String,
    pub aud: Audience,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller.
#[derive(Debug, Clone, PartialEq)]
pub struct CallerIdentity {
    pub subject: Option<String>,
    pub name: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    /// Claims beyond the registered ones.
    pub claims: serde_json::Map<String, serde_json::Value>,
}

impl TryFrom<Claims> for CallerIdentity {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| AuthError::Malformed("exp out of range".into()))?;
        let issued_at = claims
            .iat
            .map(|iat| {
                DateTime::from_timestamp(iat, 0)
                    .ok_or_else(|| AuthError::Malformed("iat out of range".into()))
            })
            .transpose()?;
        Ok(Self {
            subject: claims.sub,
            name: claims.name,
            issued_at,
            expires_at,
            claims: claims.extra,
        })
    }
}

/// Extracts the identity the auth middleware injected into extensions.
/// Returns 401 if no identity is present.
impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

// ── Errors ──────────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingHeader,

    #[error("authorization header must use Bearer scheme")]
    NotBearer,

    #[error("token expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("invalid token signature")]
    BadSignature,

    #[error("invalid token issuer")]
    WrongIssuer,

    #[error("invalid token audience")]
    WrongAudience,

    #[error("invalid bearer token: {0}")]
    Malformed(String),

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

impl AuthError {
    /// `WWW-Authenticate` challenge for this failure (RFC 6750 §3).
    fn challenge(&self) -> &'static str {
        match self {
            Self::MissingHeader | Self::NotBearer => "Bearer",
            Self::Expired => r#"Bearer error="invalid_token", error_description="The token is expired""#,
            Self::BadSignature => {
                r#"Bearer error="invalid_token", error_description="The signature is invalid""#
            }
            _ => r#"Bearer error="invalid_token""#,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            ErrorKind::InvalidSignature => Self::BadSignature,
            ErrorKind::InvalidIssuer => Self::WrongIssuer,
            ErrorKind::InvalidAudience => Self::WrongAudience,
            _ => Self::Malformed(err.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Encoding(msg) = self {
            return AppError::Internal(msg).into_response();
        }
        let mut response = (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody::new("UNAUTHORIZED", self.to_string())),
        )
            .into_response();
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static(self.challenge()),
        );
        response
    }
}

// ── Validator ───────────────────────────────────────────────────────────────

/// Pre-built HS256 validator. Keys are derived once at startup and shared
/// between requests.
#[derive(Clone)]
pub struct JwtValidator {
    issuer: Arc<str>,
    audience: Arc<str>,
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl std::fmt::Debug for JwtValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtValidator")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl JwtValidator {
    pub fn new(settings: &JwtSettings) -> Self {
        let secret = settings.secret.expose();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_audience(&[settings.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = settings.clock_skew.as_secs();

        Self {
            issuer: Arc::from(settings.issuer.as_str()),
            audience: Arc::from(settings.audience.as_str()),
            encoding_key: Arc::new(EncodingKey::from_secret(secret)),
            decoding_key: Arc::new(DecodingKey::from_secret(secret)),
            validation: Arc::new(validation),
        }
    }

    /// Check signature, issuer, audience and lifetime, and build the caller
    /// identity from the claims.
    pub fn validate(&self, token: &str) -> Result<CallerIdentity, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        CallerIdentity::try_from(data.claims)
    }

    /// Mint a token for `subject` with this validator's issuer and audience.
    /// A negative `ttl` yields an already-expired token.
    pub fn issue_token(&self, subject: &str, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let mut extra = serde_json::Map::new();
        extra.insert("jti".into(), Uuid::new_v4().to_string().into());
        let claims = Claims {
            sub: Some(subject.to_string()),
            iss: self.issuer.to_string(),
            aud: Audience::One(self.audience.to_string()),
            exp: (now + ttl).timestamp(),
            iat: Some(now.timestamp()),
            nbf: None,
            name: None,
            extra,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Encoding(e.to_string()))
    }
}

// ── Middleware ──────────────────────────────────────────────────────────────

fn bearer_credentials(headers: &HeaderMap) -> Result<Authorization<Bearer>, AuthError> {
    if !headers.contains_key(header::AUTHORIZATION) {
        return Err(AuthError::MissingHeader);
    }
    match headers.typed_try_get::<Authorization<Bearer>>() {
        Ok(Some(credentials)) => Ok(credentials),
        _ => Err(AuthError::NotBearer),
    }
}

/// Authentication stage: validate the bearer token and inject the
/// [`CallerIdentity`], or reject with 401.
pub async fn authenticate(
    State(validator): State<JwtValidator>,
    mut request: Request,
    next: Next,
) -> Response {
    let verdict = bearer_credentials(request.headers())
        .and_then(|credentials| validator.validate(credentials.token()));

    match verdict {
        Ok(identity) => {
            tracing::debug!(subject = ?identity.subject, "authenticated caller");
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(
                reason = %err,
                method = %request.method(),
                path = %request.uri().path(),
                "authentication failed"
            );
            err.into_response()
        }
    }
}
