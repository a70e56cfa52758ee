use serde::{Deserialize, Serialize};

use crate::session::TokenPair;

/// `POST /auth/login` body
#[derive(Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

impl std::fmt::Debug for LoginRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// `POST /auth/refresh` body. Empty when the refresh token travels in a cookie.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Token-bearing response from login or refresh.
///
/// Deployments disagree on naming: flat snake_case, camelCase, or nested
/// under `session`. All are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default, alias = "accessToken")]
    pub access_token: Option<String>,
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub session: Option<Box<TokenResponse>>,
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default, alias = "csrfToken")]
    pub csrf_token: Option<String>,
}

impl TokenResponse {
    /// The pair carried by this response, if any. The refresh token may be
    /// absent when the server does not rotate it.
    pub fn token_pair(&self) -> Option<TokenPair> {
        let flat = self.access_token.as_ref().map(|access| TokenPair {
            access: crate::session::AccessToken::new(access.clone()),
            refresh: self
                .refresh_token
                .as_ref()
                .map(|r| crate::session::RefreshToken::new(r.clone())),
        });

        flat.or_else(|| self.session.as_ref().and_then(|s| s.token_pair()))
    }
}

/// Identity returned by the who-am-I endpoint. Owned by the profile layer;
/// the core only carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(default, alias = "lastName")]
    pub last_name: Option<String>,
    #[serde(default, alias = "displayName")]
    pub display_name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserProfile {
    pub fn name(&self) -> String {
        if let Some(display) = &self.display_name {
            return display.clone();
        }
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            _ => self.email.clone().unwrap_or_else(|| self.id.clone()),
        }
    }
}

fn string_or_number<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}

/// `GET /auth/me` response, either bare or wrapped in `user`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MeResponse {
    Wrapped { user: UserProfile },
    Bare(UserProfile),
}

impl MeResponse {
    pub fn into_profile(self) -> UserProfile {
        match self {
            Self::Wrapped { user } => user,
            Self::Bare(user) => user,
        }
    }
}

/// `GET /auth/csrf-token` response
#[derive(Debug, Clone, Deserialize)]
pub struct CsrfTokenResponse {
    #[serde(alias = "csrfToken")]
    pub csrf_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_token_response() {
        let response: TokenResponse =
            serde_json::from_value(json!({"access_token": "A2", "refresh_token": "R2"})).unwrap();
        assert_eq!(response.token_pair(), Some(TokenPair::new("A2", "R2")));
    }

    #[test]
    fn test_camel_case_and_nested_session() {
        let response: TokenResponse = serde_json::from_value(json!({
            "session": {"accessToken": "A3", "refreshToken": "R3"},
            "user": {"id": 7, "email": "kid@school.test", "role": "student"}
        }))
        .unwrap();

        assert_eq!(response.token_pair(), Some(TokenPair::new("A3", "R3")));
        assert_eq!(response.user.unwrap().id, "7");
    }

    #[test]
    fn test_cookie_only_response_has_no_pair() {
        let response: TokenResponse =
            serde_json::from_value(json!({"message": "refreshed"})).unwrap();
        assert!(response.token_pair().is_none());
    }

    #[test]
    fn test_refresh_request_omits_missing_token() {
        let body = serde_json::to_value(RefreshRequest::default()).unwrap();
        assert_eq!(body, json!({}));

        let body = serde_json::to_value(RefreshRequest {
            refresh_token: Some("R1".to_string()),
        })
        .unwrap();
        assert_eq!(body, json!({"refresh_token": "R1"}));
    }

    #[test]
    fn test_me_response_shapes() {
        let wrapped: MeResponse = serde_json::from_value(json!({
            "user": {"id": "u-1", "first_name": "Ada", "last_name": "Park", "grade": 5}
        }))
        .unwrap();
        let profile = wrapped.into_profile();
        assert_eq!(profile.name(), "Ada Park");
        assert_eq!(profile.extra.get("grade"), Some(&json!(5)));

        let bare: MeResponse =
            serde_json::from_value(json!({"id": "u-2", "email": "parent@home.test"})).unwrap();
        assert_eq!(bare.into_profile().name(), "parent@home.test");
    }
}
