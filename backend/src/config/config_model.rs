use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub auth: Auth,
    pub stripe: Option<Stripe>,
    pub images: Images,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    /// MiB
    pub body_limit: u64,
    /// Seconds
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
    pub connect_retries: u32,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JwtKey {
    /// HS256 shared secret.
    Secret(String),
    /// RS256 public key of the identity provider.
    RsaPublicPem(String),
}

#[derive(Debug, Clone)]
pub struct Auth {
    pub key: JwtKey,
    pub audience: Option<String>,
    pub issuer: Option<String>,
    pub roles_claim: String,
}

#[derive(Debug, Clone)]
pub struct Stripe {
    pub secret_key: String,
    pub webhook_secret: String,
    pub webhook_tolerance_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Images {
    pub storage_dir: PathBuf,
    pub max_bytes: usize,
}
