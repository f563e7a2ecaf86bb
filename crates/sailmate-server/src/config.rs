use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "your-secret-key",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub token_ttl_days: i64,
}

impl Config {
    /// Read `SAILMATE_*` variables. Call after `dotenvy::dotenv()`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = get("SAILMATE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("SAILMATE_JWT_SECRET is unset or still a placeholder; set it in .env");
        }

        let host = get("SAILMATE_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("SAILMATE_PORT")
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("SAILMATE_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let db_path = get("SAILMATE_DB_PATH").unwrap_or_else(|| "sailmate.db".into()).into();
        let upload_dir = get("SAILMATE_UPLOAD_DIR").unwrap_or_else(|| "./uploads".into()).into();

        let token_ttl_days: i64 = get("SAILMATE_TOKEN_TTL_DAYS")
            .map(|v| v.parse())
            .transpose()
            .context("SAILMATE_TOKEN_TTL_DAYS must be an integer")?
            .unwrap_or(7);
        if token_ttl_days <= 0 {
            bail!("SAILMATE_TOKEN_TTL_DAYS must be positive");
        }

        Ok(Self {
            jwt_secret,
            db_path,
            addr,
            upload_dir,
            token_ttl_days,
        })
    }
}
