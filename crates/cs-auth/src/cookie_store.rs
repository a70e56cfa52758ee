use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use url::Url;

use crate::errors::StorageError;
use crate::session::TokenPair;
use crate::store::{CredentialMode, TokenCell, TokenStore};

/// Cookie names the server uses for the httpOnly session pair
pub const SESSION_COOKIES: &[&str] = &["access_token", "refresh_token"];

/// Look up a single cookie value the jar would send to `url`
pub(crate) fn cookie_value(jar: &Jar, url: &Url, name: &str) -> Option<String> {
    let header = jar.cookies(url)?;
    let header = header.to_str().ok()?;

    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

/// Store that delegates the session to httpOnly cookies held by the
/// transport's cookie jar.
///
/// Tokens that the server also returns in a response body (for clients whose
/// cookies get blocked) are kept in memory and sent as a bearer header.
#[derive(Debug)]
pub struct CookieTokenStore {
    jar: Arc<Jar>,
    origin: Url,
    cell: TokenCell,
}

impl CookieTokenStore {
    pub fn new(jar: Arc<Jar>, origin: Url) -> Self {
        Self {
            jar,
            origin,
            cell: TokenCell::default(),
        }
    }

    /// The jar the HTTP client must be built with
    pub fn jar(&self) -> Arc<Jar> {
        self.jar.clone()
    }

    pub fn has_session_cookie(&self) -> bool {
        SESSION_COOKIES
            .iter()
            .any(|name| cookie_value(&self.jar, &self.origin, name).is_some())
    }

    fn expire_session_cookies(&self) {
        for name in SESSION_COOKIES {
            self.jar
                .add_cookie_str(&format!("{}=; Max-Age=0; Path=/", name), &self.origin);
        }
    }
}

#[async_trait::async_trait]
impl TokenStore for CookieTokenStore {
    async fn init(&self) {}

    async fn restore_tokens(&self) -> bool {
        self.cell.get().is_some() || self.has_session_cookie()
    }

    async fn set_tokens(&self, pair: TokenPair) -> Result<(), StorageError> {
        self.cell.replace(Some(pair));
        Ok(())
    }

    async fn clear_tokens(&self) -> Result<(), StorageError> {
        self.cell.replace(None);
        self.expire_session_cookies();
        Ok(())
    }

    fn tokens(&self) -> Option<TokenPair> {
        self.cell.get()
    }

    fn credential_mode(&self) -> CredentialMode {
        CredentialMode::Cookie
    }
}
