use std::sync::{Arc, RwLock};

use futures_util::FutureExt;
use reqwest::cookie::Jar;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::config::{AuthConfig, KeyStrategy, StorageStrategy};
use crate::cookie_store::CookieTokenStore;
use crate::csrf::CsrfProvider;
use crate::errors::{AuthError, RefreshError, Result};
use crate::events::{EventBus, SessionEvent};
use crate::file_store::EncryptedTokenStore;
use crate::key_manager::{EphemeralKeySource, KeySource, RuntimeKeySource};
use crate::models::{
    CsrfTokenResponse, LoginRequest, MeResponse, RefreshRequest, TokenResponse, UserProfile,
};
use crate::refresh::{RefreshCoordinator, RefreshOutcome};
use crate::request::{ApiRequest, RequestInterceptor};
use crate::session::AccessToken;
use crate::store::{CredentialMode, MemoryTokenStore, TokenStore};

const EVENT_CAPACITY: usize = 32;

fn snippet(body: &[u8]) -> String {
    String::from_utf8_lossy(body).chars().take(200).collect()
}

/// Successful API response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Build the token store a deployment asked for
pub fn build_store(config: &AuthConfig, jar: Arc<Jar>) -> Arc<dyn TokenStore> {
    match &config.storage {
        StorageStrategy::Memory => Arc::new(MemoryTokenStore::new()),
        StorageStrategy::Encrypted { dir, keys } => {
            let keys: Arc<dyn KeySource> = match keys {
                KeyStrategy::Ephemeral => Arc::new(EphemeralKeySource::new()),
                KeyStrategy::RuntimeDir { fallback_dir } => {
                    Arc::new(RuntimeKeySource::default_location(fallback_dir))
                }
            };
            Arc::new(EncryptedTokenStore::new(dir, keys))
        }
        StorageStrategy::Cookie => Arc::new(CookieTokenStore::new(jar, config.origin())),
    }
}

/// The one long-lived session object. Owns the token store, the refresh
/// gate and the HTTP transport; every API call goes through it.
///
/// Cheap to clone; clones share the same session.
#[derive(Debug, Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    config: AuthConfig,
    http: Client,
    store: Arc<dyn TokenStore>,
    csrf: CsrfProvider,
    interceptor: RequestInterceptor,
    refresher: RefreshCoordinator,
    events: EventBus,
    current_path: RwLock<String>,
}

impl ApiClient {
    /// Create a client with the storage strategy named in `config`
    pub fn new(config: AuthConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let store = build_store(&config, jar.clone());
        Self::with_store(config, store, jar)
    }

    /// Create a client around an existing store. `jar` must be the jar a
    /// [`CookieTokenStore`] was built with, if that is the store in use.
    pub fn with_store(
        config: AuthConfig,
        store: Arc<dyn TokenStore>,
        jar: Arc<Jar>,
    ) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.http_timeouts.connect)
            .timeout(config.http_timeouts.request)
            .user_agent(config.user_agent.as_deref().unwrap_or("campus-session"))
            .cookie_provider(jar.clone())
            .build()?;

        let csrf = CsrfProvider::new(Some(jar), config.origin(), config.csrf_cookie.clone());
        let interceptor = RequestInterceptor::new(&config.csrf_header)?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                http,
                store,
                csrf,
                interceptor,
                refresher: RefreshCoordinator::new(),
                events: EventBus::new(EVENT_CAPACITY),
                current_path: RwLock::new("/".to_string()),
            }),
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.inner.store
    }

    pub fn csrf(&self) -> &CsrfProvider {
        &self.inner.csrf
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Record where the UI currently is; consulted before asking for a login
    /// redirect
    pub fn set_current_path(&self, path: impl Into<String>) {
        let path = path.into();
        match self.inner.current_path.write() {
            Ok(mut guard) => *guard = path,
            Err(poisoned) => *poisoned.into_inner() = path,
        }
    }

    pub fn current_path(&self) -> String {
        self.inner.current_path()
    }

    pub fn refreshes_started(&self) -> u64 {
        self.inner.refresher.refreshes_started()
    }

    /// Send a request through the full pipeline: decorate, send, and on a
    /// 401 refresh once (shared with every concurrent failure) and replay.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        let inner = &self.inner;

        let access = inner.store.access_token();
        let response = inner.dispatch(&mut request, access.as_ref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return inner.finish(response).await;
        }

        let body_snippet = snippet(&response.bytes().await.unwrap_or_default());

        if request.retried || inner.config.endpoints.is_auth_endpoint(&request.path) {
            debug!("401 on auth endpoint or replayed request, not refreshing");
            return Err(AuthError::Unauthorized { body_snippet });
        }

        let current = inner.store.access_token();
        let fresh = if current.is_some() && current != request.sent_with {
            debug!("Token already replaced since this request was sent, replaying");
            current
        } else if current.is_none()
            && request.sent_with.is_some()
            && inner.store.credential_mode() == CredentialMode::Bearer
        {
            // an earlier refresh failed (or logout ran) and already expired the session
            debug!("Session cleared since this request was sent, not refreshing again");
            return Err(AuthError::SessionExpired(RefreshError::SessionCleared));
        } else {
            match self.refresh().await {
                Ok(pair) => pair
                    .map(|pair| pair.access.clone())
                    .or_else(|| inner.store.access_token()),
                Err(e) => return Err(AuthError::SessionExpired(e)),
            }
        };

        request.retried = true;
        let response = inner.dispatch(&mut request, fresh.as_ref()).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            let body_snippet = snippet(&response.bytes().await.unwrap_or_default());
            debug!("Replayed request still unauthorized");
            return Err(AuthError::Unauthorized { body_snippet });
        }

        inner.finish(response).await
    }

    /// Refresh the session, joining a refresh that is already in flight.
    ///
    /// On failure the tokens are cleared and [`SessionEvent::Expired`] is
    /// emitted before any caller sees the error.
    pub async fn refresh(&self) -> RefreshOutcome {
        let inner = self.inner.clone();
        self.inner
            .refresher
            .run(move || inner.refresh_session().boxed())
            .await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::post(path).json(body)?).await?.json()
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::put(path).json(body)?).await?.json()
    }

    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::patch(path).json(body)?).await?.json()
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.send(ApiRequest::delete(path)).await
    }

    /// Log in with email and password and store the returned tokens
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<UserProfile>> {
        let inner = &self.inner;
        let request = ApiRequest::post(inner.config.endpoints.login.as_str())
            .json(&LoginRequest { email, password })?;

        let response: TokenResponse = self.send(request).await?.json()?;

        if let Some(csrf) = &response.csrf_token {
            inner.csrf.remember_issued(csrf.clone());
        }

        match response.token_pair() {
            Some(pair) => inner.store.set_tokens(pair).await?,
            None if inner.store.credential_mode() == CredentialMode::Cookie => {
                debug!("Login response carried no tokens, relying on session cookies");
            }
            None => {
                return Err(AuthError::InvalidResponse(
                    "Login response carried no access token".to_string(),
                ));
            }
        }

        info!("Logged in");
        inner.events.emit(SessionEvent::Authenticated);
        Ok(response.user)
    }

    /// End the session. The server call is best effort; local state is
    /// always cleared.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let inner = &self.inner;

        let outcome = match ApiRequest::post(inner.config.endpoints.logout.as_str())
            .json(&serde_json::json!({}))
        {
            Ok(mut request) => {
                let access = inner.store.access_token();
                match inner.dispatch(&mut request, access.as_ref()).await {
                    Ok(response) => inner.finish(response).await.map(|_| ()),
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        };

        if let Err(e) = outcome {
            warn!("Server logout failed ({}), clearing local session anyway", e);
        }

        if let Err(e) = inner.store.clear_tokens().await {
            warn!("Failed to clear stored tokens on logout: {}", e);
        }
        inner.csrf.forget_issued();

        info!("Logged out");
        inner.events.emit(SessionEvent::LoggedOut);
    }

    /// Ask the server who the current credentials belong to
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<UserProfile> {
        let me: MeResponse = self
            .get_json(self.inner.config.endpoints.me.as_str())
            .await?;
        Ok(me.into_profile())
    }

    /// Fetch a server-issued CSRF token and cache it
    #[instrument(skip(self))]
    pub async fn fetch_csrf_token(&self) -> Result<String> {
        let response: CsrfTokenResponse = self
            .get_json(self.inner.config.endpoints.csrf.as_str())
            .await?;
        self.inner.csrf.remember_issued(response.csrf_token.clone());
        Ok(response.csrf_token)
    }

    /// Emit `Authenticated` for a session restored by bootstrap
    pub(crate) fn announce_authenticated(&self) {
        self.inner.events.emit(SessionEvent::Authenticated);
    }

    /// Clear a session that failed validation
    pub(crate) async fn discard_session(&self) {
        if let Err(e) = self.inner.store.clear_tokens().await {
            warn!("Failed to clear invalid session: {}", e);
        }
        self.inner.csrf.forget_issued();
    }
}

impl ClientInner {
    fn current_path(&self) -> String {
        match self.current_path.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Decorate and send once. Transport errors come back unchanged.
    async fn dispatch(
        &self,
        request: &mut ApiRequest,
        access: Option<&AccessToken>,
    ) -> Result<reqwest::Response> {
        self.interceptor.decorate(request, access, &self.csrf)?;
        let url = self.config.url_for(&request.path)?;

        debug!(retried = request.retried, "Sending {} {}", request.method, url.path());
        let response = request.to_builder(&self.http, url)?.send().await?;
        self.remember_csrf(response.headers());
        Ok(response)
    }

    async fn finish(&self, response: reqwest::Response) -> Result<ApiResponse> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        if !status.is_success() {
            return Err(AuthError::Http {
                status,
                body_snippet: snippet(&body),
            });
        }

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }

    fn remember_csrf(&self, headers: &HeaderMap) {
        if let Some(token) = headers
            .get(self.config.csrf_header.as_str())
            .and_then(|value| value.to_str().ok())
        {
            self.csrf.remember_issued(token.to_string());
        }
    }

    /// Body of the shared refresh future. Token state is settled (stored or
    /// cleared) before the outcome is returned.
    async fn refresh_session(self: Arc<Self>) -> RefreshOutcome {
        match self.request_new_tokens().await {
            Ok(pair) => {
                info!("Session refreshed");
                self.events.emit(SessionEvent::Refreshed);
                Ok(pair)
            }
            Err(e) => {
                warn!("Token refresh failed: {}", e);
                self.expire_session(e.to_string()).await;
                Err(e)
            }
        }
    }

    #[instrument(skip(self))]
    async fn request_new_tokens(&self) -> RefreshOutcome {
        let previous = self.store.refresh_token();
        let mode = self.store.credential_mode();
        if previous.is_none() && mode == CredentialMode::Bearer {
            return Err(RefreshError::MissingRefreshToken);
        }

        let body = RefreshRequest {
            refresh_token: previous.as_ref().map(|token| token.as_str().to_string()),
        };
        let mut request = ApiRequest::post(self.config.endpoints.refresh.as_str())
            .json(&body)
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;

        // the refresh call carries no bearer token; cookies ride along
        let response = match self.dispatch(&mut request, None).await {
            Ok(response) => response,
            Err(AuthError::Network(e)) => return Err(e.into()),
            Err(e) => return Err(RefreshError::InvalidResponse(e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Rejected { status });
        }

        let bytes = response.bytes().await?;
        let parsed: TokenResponse = if bytes.iter().all(u8::is_ascii_whitespace) {
            TokenResponse::default()
        } else {
            serde_json::from_slice(&bytes)
                .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?
        };

        if let Some(csrf) = &parsed.csrf_token {
            self.csrf.remember_issued(csrf.clone());
        }

        match parsed.token_pair() {
            Some(pair) => {
                let pair = pair.or_refresh(previous);
                self.store
                    .set_tokens(pair.clone())
                    .await
                    .map_err(|e| RefreshError::Storage(e.to_string()))?;
                Ok(Some(pair))
            }
            None if mode == CredentialMode::Cookie => Ok(None),
            None => Err(RefreshError::InvalidResponse(
                "Refresh response carried no access token".to_string(),
            )),
        }
    }

    async fn expire_session(&self, reason: String) {
        if let Err(e) = self.store.clear_tokens().await {
            warn!("Failed to clear tokens after refresh failure: {}", e);
        }
        self.csrf.forget_issued();

        let path = self.current_path();
        let redirect = self.config.redirect.redirect_for(&path);
        info!(
            redirect = redirect.is_some(),
            "Session expired while on {}", path
        );
        self.events.emit(SessionEvent::Expired { redirect, reason });
    }
}
