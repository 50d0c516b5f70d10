//! Hub sessions.
//!
//! A session is an HS256 token whose claims carry the signed-in user and the
//! tenant (`hub_id`) every query is scoped to. Handlers receive it through the
//! [`HubSession`] extractor, which redirects to the login page instead of
//! failing when no usable session is present.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AppConfig;

const SESSION_ISSUER: &str = "manufacturing-hub";

/// JWT claims of a hub session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,            // Subject (user ID)
    pub name: Option<String>,   // User's display name
    pub role: Option<String>,   // Role within the hub
    pub hub_id: Option<String>, // Tenant the session is bound to
    pub jti: String,            // Token ID
    pub iat: i64,               // Issued at time
    pub exp: i64,               // Expiration time
    pub iss: String,            // Issuer
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub ttl: Duration,
    pub cookie_name: String,
    pub login_url: String,
}

impl AuthConfig {
    pub fn new(secret: String, ttl: Duration, cookie_name: String, login_url: String) -> Self {
        Self {
            secret,
            ttl,
            cookie_name,
            login_url,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.session_secret.clone(),
            Duration::from_secs(cfg.session_ttl_secs),
            cfg.session_cookie_name.clone(),
            cfg.login_url.clone(),
        )
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing session")]
    MissingSession,

    #[error("Invalid session token")]
    InvalidToken,

    #[error("Session has expired")]
    TokenExpired,

    #[error("Session is not bound to a hub")]
    MissingHub,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),
}

/// Issues and verifies hub session tokens.
#[derive(Debug, Clone)]
pub struct AuthService {
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Mints a session token for `user` bound to `hub_id`.
    pub fn issue_session(
        &self,
        hub_id: Uuid,
        user: &str,
        role: Option<&str>,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.ttl)
                .map_err(|_| AuthError::TokenCreation("Invalid session lifetime".to_string()))?;

        let claims = Claims {
            sub: user.to_string(),
            name: Some(user.to_string()),
            role: role.map(str::to_string),
            hub_id: Some(hub_id.to_string()),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: SESSION_ISSUER.to_string(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[SESSION_ISSUER]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }

    /// Resolves a token into the session it represents.
    pub fn session_from_token(&self, token: &str) -> Result<HubSession, AuthError> {
        let claims = self.validate_token(token)?;
        let hub_id = claims
            .hub_id
            .as_deref()
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or(AuthError::MissingHub)?;

        Ok(HubSession {
            hub_id,
            user: claims.name.unwrap_or(claims.sub),
            role: claims.role,
        })
    }
}

/// The authenticated caller and the hub its requests are scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HubSession {
    pub hub_id: Uuid,
    pub user: String,
    pub role: Option<String>,
}

/// Rejection for requests without a usable session: a 302 to the login page.
#[derive(Debug)]
pub struct LoginRedirect {
    location: String,
}

impl LoginRedirect {
    pub fn new(login_url: &str, next: &str) -> Self {
        let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
        let separator = if login_url.contains('?') { '&' } else { '?' };
        Self {
            location: format!("{}{}next={}", login_url, separator, encoded),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        (StatusCode::FOUND, [(header::LOCATION, self.location)]).into_response()
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn cookie_token<'a>(parts: &'a Parts, cookie_name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim())
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for HubSession
where
    S: Send + Sync,
    Arc<AuthService>: FromRef<S>,
{
    type Rejection = LoginRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<AuthService>::from_ref(state);
        let next = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());
        let redirect = || LoginRedirect::new(&auth.config().login_url, &next);

        let token = cookie_token(parts, &auth.config().cookie_name)
            .or_else(|| bearer_token(parts))
            .ok_or_else(|| {
                debug!(path = %next, "request without session");
                redirect()
            })?;

        auth.session_from_token(token).map_err(|e| {
            warn!(error = %e, path = %next, "rejected session");
            redirect()
        })
    }
}
