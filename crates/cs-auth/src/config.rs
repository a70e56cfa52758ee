use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::errors::{AuthError, Result};
use crate::redirect::{RedirectPolicy, has_path_prefix};

/// Paths of the auth endpoints, relative to the API base URL
pub mod endpoints {
    pub const LOGIN: &str = "auth/login";
    pub const REFRESH: &str = "auth/refresh";
    pub const LOGOUT: &str = "auth/logout";
    pub const ME: &str = "auth/me";
    pub const CSRF: &str = "auth/csrf-token";
}

pub const CSRF_HEADER: &str = "X-CSRF-Token";
pub const CSRF_COOKIE: &str = "csrf_token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPaths {
    pub login: String,
    pub refresh: String,
    pub logout: String,
    pub me: String,
    pub csrf: String,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            login: endpoints::LOGIN.to_string(),
            refresh: endpoints::REFRESH.to_string(),
            logout: endpoints::LOGOUT.to_string(),
            me: endpoints::ME.to_string(),
            csrf: endpoints::CSRF.to_string(),
        }
    }
}

impl EndpointPaths {
    /// Endpoints whose own 401 must never trigger a refresh
    pub fn is_auth_endpoint(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        has_path_prefix(path, self.refresh.trim_start_matches('/'))
            || has_path_prefix(path, self.login.trim_start_matches('/'))
    }
}

/// HTTP client configuration. The refresh call has no timeout of its own;
/// these bound it.
#[derive(Debug, Clone)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(15),
            request: Duration::from_secs(30),
        }
    }
}

/// Where session keys for the encrypted store come from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KeyStrategy {
    /// Process memory only
    #[default]
    Ephemeral,
    /// Key file in the runtime dir, falling back to this directory
    RuntimeDir { fallback_dir: PathBuf },
}

/// Token storage strategy, chosen per deployment
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StorageStrategy {
    #[default]
    Memory,
    /// Memory plus encrypted records on disk
    Encrypted { dir: PathBuf, keys: KeyStrategy },
    /// httpOnly cookies with in-memory fallback
    Cookie,
}

/// Configuration for [`crate::ApiClient`]
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// API root; endpoint and request paths are joined onto it
    pub base_url: Url,

    pub endpoints: EndpointPaths,

    pub http_timeouts: HttpTimeouts,

    pub user_agent: Option<String>,

    pub storage: StorageStrategy,

    /// Decides whether a session loss navigates to login
    pub redirect: RedirectPolicy,

    pub csrf_header: String,

    pub csrf_cookie: String,
}

impl AuthConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(AuthError::InvalidRequest(format!(
                "API base URL cannot have paths joined onto it: {}",
                base_url
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            base_url,
            endpoints: EndpointPaths::default(),
            http_timeouts: HttpTimeouts::default(),
            user_agent: Some(concat!("campus-session/", env!("CARGO_PKG_VERSION")).to_string()),
            storage: StorageStrategy::default(),
            redirect: RedirectPolicy::default(),
            csrf_header: CSRF_HEADER.to_string(),
            csrf_cookie: CSRF_COOKIE.to_string(),
        })
    }

    pub fn with_storage(mut self, storage: StorageStrategy) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_redirect(mut self, redirect: RedirectPolicy) -> Self {
        self.redirect = redirect;
        self
    }

    /// Resolve a request path against the API base
    pub fn url_for(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Scheme and host of the API, used as the cookie jar origin
    pub fn origin(&self) -> Url {
        let mut origin = self.base_url.clone();
        origin.set_path("/");
        origin.set_query(None);
        origin
    }
}
