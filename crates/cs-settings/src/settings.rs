use std::path::PathBuf;
use std::time::Duration;

use cs_auth::{
    AuthConfig, EncryptedTokenStore, HttpTimeouts, KeyStrategy, RedirectPolicy, StorageStrategy,
};
use serde::{Deserialize, Serialize};

/// Contents of `settings.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub storage: StorageSettings,
    pub routing: RoutingSettings,
    pub csrf: CsrfSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub user_agent: Option<String>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        let timeouts = HttpTimeouts::default();
        Self {
            base_url: "http://localhost:3000/api/".to_string(),
            user_agent: None,
            connect_timeout_secs: timeouts.connect.as_secs(),
            request_timeout_secs: timeouts.request.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    /// Survives between CLI invocations for as long as the session key does
    #[default]
    Encrypted,
    Cookie,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Ephemeral,
    /// Key file in the login session's runtime dir
    #[default]
    Runtime,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub strategy: StorageKind,
    /// Record directory for the encrypted store; platform data dir if unset
    pub dir: Option<PathBuf>,
    pub key: KeyKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    pub login_path: String,
    /// Added to the built-in public prefixes
    pub public_prefixes: Vec<String>,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            login_path: RedirectPolicy::default().login_path,
            public_prefixes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsrfSettings {
    pub header: String,
    pub cookie: String,
}

impl Default for CsrfSettings {
    fn default() -> Self {
        Self {
            header: cs_auth::config::CSRF_HEADER.to_string(),
            cookie: cs_auth::config::CSRF_COOKIE.to_string(),
        }
    }
}

impl Settings {
    /// Map onto the session core configuration
    pub fn to_auth_config(&self) -> cs_auth::Result<AuthConfig> {
        let mut config = AuthConfig::new(&self.api.base_url)?;

        config.http_timeouts = HttpTimeouts {
            connect: Duration::from_secs(self.api.connect_timeout_secs),
            request: Duration::from_secs(self.api.request_timeout_secs),
        };
        if self.api.user_agent.is_some() {
            config.user_agent = self.api.user_agent.clone();
        }

        config.storage = match self.storage.strategy {
            StorageKind::Memory => StorageStrategy::Memory,
            StorageKind::Cookie => StorageStrategy::Cookie,
            StorageKind::Encrypted => {
                let dir = match &self.storage.dir {
                    Some(dir) => dir.clone(),
                    None => EncryptedTokenStore::default_storage_dir()?,
                };
                let keys = match self.storage.key {
                    KeyKind::Ephemeral => KeyStrategy::Ephemeral,
                    KeyKind::Runtime => KeyStrategy::RuntimeDir {
                        fallback_dir: dir.clone(),
                    },
                };
                StorageStrategy::Encrypted { dir, keys }
            }
        };

        let mut redirect = RedirectPolicy {
            login_path: self.routing.login_path.clone(),
            ..RedirectPolicy::default()
        };
        redirect
            .public_prefixes
            .extend(self.routing.public_prefixes.iter().cloned());
        config.redirect = redirect;

        config.csrf_header = self.csrf.header.clone();
        config.csrf_cookie = self.csrf.cookie.clone();

        Ok(config)
    }
}
