/// Where the UI should send the user after the session is lost
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    pub login_path: String,
    /// Path the user was on, for returning after login
    pub return_to: String,
}

impl LoginRedirect {
    /// Login path with the return location as a query parameter
    pub fn location(&self) -> String {
        let encoded: String =
            url::form_urlencoded::byte_serialize(self.return_to.as_bytes()).collect();
        format!("{}?returnTo={}", self.login_path, encoded)
    }
}

/// Whether `path` is `prefix` itself or lies below it. A prefix only
/// matches on a segment boundary, so `/login` covers `/login/sso` and
/// `/login?next=/` but not `/loginsights`.
pub(crate) fn has_path_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => {
            prefix.ends_with('/')
                || rest.is_empty()
                || rest.starts_with(['/', '?', '#'])
        }
        None => false,
    }
}

/// Paths that tolerate anonymous access and must never bounce to login
/// because a background request lost its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectPolicy {
    pub login_path: String,
    /// Matched exactly (the landing page `/` would otherwise match everything)
    pub exact_paths: Vec<String>,
    pub public_prefixes: Vec<String>,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            exact_paths: vec!["/".to_string()],
            public_prefixes: [
                "/login",
                "/register",
                "/verify-email",
                "/email-verification",
                "/forgot-password",
                "/reset-password",
                "/terms",
                "/privacy",
                "/auth/",
                "/public/",
                "/portfolio/",
                "/diploma/",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl RedirectPolicy {
    pub fn is_public(&self, path: &str) -> bool {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = if path.is_empty() { "/" } else { path };

        self.exact_paths.iter().any(|exact| exact == path)
            || self
                .public_prefixes
                .iter()
                .any(|prefix| has_path_prefix(path, prefix))
    }

    /// `None` when the current path must not be redirected away from
    pub fn redirect_for(&self, current_path: &str) -> Option<LoginRedirect> {
        if self.is_public(current_path) {
            tracing::debug!("Suppressing login redirect on public path {}", current_path);
            return None;
        }

        Some(LoginRedirect {
            login_path: self.login_path.clone(),
            return_to: current_path.to_string(),
        })
    }
}
