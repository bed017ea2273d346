use std::{collections::HashMap, sync::Arc};

use anyhow::anyhow;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{
    axum_http::error_responses::AppError,
    config::config_model::{Auth, JwtKey},
};

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub exp: usize,
    /// Provider specific claims, including the namespaced roles claim.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Caller identity taken from a verified bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub external_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Insufficient permissions".to_string()))
        }
    }
}

/// `Some` when a valid bearer token was sent, `None` when no Authorization header
/// was present. A present but invalid token is still rejected.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<AuthUser>);

pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    roles_claim: String,
}

impl JwtVerifier {
    pub fn from_config(auth: &Auth) -> anyhow::Result<Self> {
        let (decoding_key, algorithm) = match &auth.key {
            JwtKey::Secret(secret) => (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256),
            JwtKey::RsaPublicPem(pem) => (DecodingKey::from_rsa_pem(pem.as_bytes())?, Algorithm::RS256),
        };

        let mut validation = Validation::new(algorithm);
        match auth.audience.as_deref() {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = auth.issuer.as_deref() {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self {
            decoding_key,
            validation,
            roles_claim: auth.roles_claim.clone(),
        })
    }

    pub fn verify(&self, token: &str) -> Result<AuthUser, AppError> {
        let token_data = decode::<IdentityClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| {
                debug!(error = %err, "auth: jwt validation failed");
                AppError::Unauthorized("Invalid or expired token".to_string())
            })?;

        let claims = token_data.claims;
        let roles = extract_roles(&claims.extra, &self.roles_claim);

        Ok(AuthUser {
            external_id: claims.sub,
            email: claims.email.filter(|email| !email.trim().is_empty()),
            name: claims.name,
            picture: claims.picture,
            roles,
        })
    }
}

/// Reads the roles claim as either a list of strings or a single string.
fn extract_roles(extra: &HashMap<String, Value>, roles_claim: &str) -> Vec<String> {
    match extra.get(roles_claim) {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(|value| value.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(role)) => vec![role.clone()],
        _ => Vec::new(),
    }
}

fn verifier_from(parts: &Parts) -> Result<Arc<JwtVerifier>, AppError> {
    parts
        .extensions
        .get::<Arc<JwtVerifier>>()
        .cloned()
        .ok_or_else(|| AppError::Internal(anyhow!("jwt verifier extension is not installed")))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = verifier_from(parts)?;

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    AppError::Unauthorized("Missing or invalid Authorization header".to_string())
                })?;

        verifier.verify(bearer.token())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = verifier_from(parts)?;

        match TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await {
            Ok(TypedHeader(Authorization(bearer))) => {
                verifier.verify(bearer.token()).map(|user| OptionalAuthUser(Some(user)))
            }
            Err(rejection) if rejection.is_missing() => Ok(OptionalAuthUser(None)),
            Err(_) => Err(AppError::Unauthorized(
                "Invalid Authorization header".to_string(),
            )),
        }
    }
}
