use std::sync::{Arc, RwLock};

use reqwest::cookie::Jar;
use url::Url;

use crate::cookie_store::cookie_value;

/// Resolves the anti-CSRF token for state-changing requests.
///
/// Lookup order: a token pinned by the hosting page (the `<meta
/// name="csrf-token">` equivalent), the double-submit cookie, then the last
/// token the server issued. A missing token never blocks a request.
#[derive(Debug)]
pub struct CsrfProvider {
    pinned: RwLock<Option<String>>,
    issued: RwLock<Option<String>>,
    jar: Option<Arc<Jar>>,
    origin: Url,
    cookie_name: String,
}

impl CsrfProvider {
    pub fn new(jar: Option<Arc<Jar>>, origin: Url, cookie_name: impl Into<String>) -> Self {
        Self {
            pinned: RwLock::new(None),
            issued: RwLock::new(None),
            jar,
            origin,
            cookie_name: cookie_name.into(),
        }
    }

    /// Token supplied by the page that embeds the client
    pub fn pin(&self, token: Option<String>) {
        write_slot(&self.pinned, token);
    }

    /// Token the server handed out (response header or csrf endpoint)
    pub fn remember_issued(&self, token: String) {
        write_slot(&self.issued, Some(token));
    }

    pub fn forget_issued(&self) {
        write_slot(&self.issued, None);
    }

    pub fn token(&self) -> Option<String> {
        read_slot(&self.pinned)
            .or_else(|| {
                self.jar
                    .as_ref()
                    .and_then(|jar| cookie_value(jar, &self.origin, &self.cookie_name))
            })
            .or_else(|| read_slot(&self.issued))
    }
}

fn read_slot(slot: &RwLock<Option<String>>) -> Option<String> {
    match slot.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

fn write_slot(slot: &RwLock<Option<String>>, value: Option<String>) {
    match slot.write() {
        Ok(mut guard) => *guard = value,
        Err(poisoned) => *poisoned.into_inner() = value,
    }
}
