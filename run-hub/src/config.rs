use anyhow::{anyhow, Result};
use run_hub_core::session::{SessionProvider, StaticSession, TokenSession};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Settings for the command-line hub.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HubConfig {
    /// Directory holding the file store (default `data`)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// HS256 secret used to verify session tokens
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Bearer token of the signed-in user, if any
    #[serde(default)]
    pub token: Option<String>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            jwt_secret: None,
            token: None,
        }
    }
}

impl HubConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            data_dir: non_empty("RUN_HUB_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            jwt_secret: non_empty("RUN_HUB_JWT_SECRET"),
            token: non_empty("RUN_HUB_TOKEN"),
        }
    }

    /// Session source for this configuration. Without a token nobody is
    /// signed in; a token without a secret cannot be verified.
    pub fn sessions(&self) -> Result<Arc<dyn SessionProvider>> {
        match (&self.jwt_secret, &self.token) {
            (Some(secret), token) => Ok(Arc::new(TokenSession::new(secret, token.clone()))),
            (None, Some(_)) => Err(anyhow!(
                "RUN_HUB_TOKEN is set but RUN_HUB_JWT_SECRET is missing"
            )),
            (None, None) => Ok(Arc::new(StaticSession::signed_out())),
        }
    }
}
