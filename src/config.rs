use std::path::PathBuf;

use anyhow::Context;
use axum::http::HeaderValue;

/// Server configuration, read from the environment.
///
/// - `HORIZON_DB`: database file path (defaults to the platform data dir)
/// - `HORIZON_AUTH_SECRET`: HMAC secret for bearer-token verification
/// - `HORIZON_FRONTEND_URL`: allowed CORS origin (permissive when unset)
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: Option<PathBuf>,
    pub auth_secret: String,
    pub frontend_url: Option<HeaderValue>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let auth_secret = std::env::var("HORIZON_AUTH_SECRET")
            .context("HORIZON_AUTH_SECRET must be set")?;
        let db_path = std::env::var("HORIZON_DB").ok().map(PathBuf::from);
        let frontend_url = match std::env::var("HORIZON_FRONTEND_URL") {
            Ok(url) => Some(
                url.parse::<HeaderValue>()
                    .context("HORIZON_FRONTEND_URL is not a valid origin")?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            db_path,
            auth_secret,
            frontend_url,
        })
    }
}
