use std::{path::PathBuf, str::FromStr};

use anyhow::{Context, Result, bail};

use super::config_model::{
    Auth, BackendServer, Database, DotEnvyConfig, Images, JwtKey, Stripe,
};

pub const DEFAULT_ROLES_CLAIM: &str = "https://example.com/roles";

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    load_from(|key| std::env::var(key).ok())
}

/// Builds the config from an arbitrary lookup so parsing can be exercised without
/// touching the process environment.
pub fn load_from<F>(lookup: F) -> Result<DotEnvyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let backend_server = BackendServer {
        port: parse_or(&get, "SERVER_PORT", 3001)?,
        body_limit: parse_or(&get, "SERVER_BODY_LIMIT", 12)?,
        timeout: parse_or(&get, "SERVER_TIMEOUT", 30)?,
    };

    let database = Database {
        url: get("DATABASE_URL").context("DATABASE_URL is required")?,
        max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
        connect_timeout_secs: parse_or(&get, "DATABASE_CONNECT_TIMEOUT", 10)?,
        connect_retries: parse_or(&get, "DATABASE_CONNECT_RETRIES", 5)?,
        retry_backoff_ms: parse_or(&get, "DATABASE_RETRY_BACKOFF_MS", 1000)?,
    };

    let key = match (get("AUTH_JWT_PUBLIC_KEY_PEM"), get("AUTH_JWT_SECRET")) {
        // Env files usually carry the PEM on one line with escaped newlines.
        (Some(pem), _) => JwtKey::RsaPublicPem(pem.replace("\\n", "\n")),
        (None, Some(secret)) => JwtKey::Secret(secret),
        (None, None) => bail!("AUTH_JWT_PUBLIC_KEY_PEM or AUTH_JWT_SECRET is required"),
    };

    let auth = Auth {
        key,
        audience: get("AUTH_AUDIENCE"),
        issuer: get("AUTH_ISSUER"),
        roles_claim: get("AUTH_ROLES_CLAIM").unwrap_or_else(|| DEFAULT_ROLES_CLAIM.to_string()),
    };

    let stripe = match (get("STRIPE_SECRET_KEY"), get("STRIPE_WEBHOOK_SECRET")) {
        (Some(secret_key), Some(webhook_secret)) => Some(Stripe {
            secret_key,
            webhook_secret,
            webhook_tolerance_secs: parse_or(&get, "STRIPE_WEBHOOK_TOLERANCE_SECS", 300)?,
        }),
        (None, None) => None,
        _ => bail!("STRIPE_SECRET_KEY and STRIPE_WEBHOOK_SECRET must be set together"),
    };

    let images = Images {
        storage_dir: PathBuf::from(
            get("IMAGE_STORAGE_DIR").unwrap_or_else(|| "./uploads".to_string()),
        ),
        max_bytes: parse_or(&get, "IMAGE_MAX_BYTES", 10 * 1024 * 1024)?,
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        auth,
        stripe,
        images,
    })
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} is invalid: {raw}")),
        None => Ok(default),
    }
}
