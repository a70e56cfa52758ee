use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::csrf::CsrfProvider;
use crate::errors::{AuthError, Result};
use crate::session::AccessToken;

/// One field of a multipart upload
#[derive(Debug, Clone)]
pub enum MultipartPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: Option<String>,
        data: Vec<u8>,
    },
}

/// Request payload. Kept rebuildable so a request can be replayed after a
/// refresh.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Bytes {
        data: Vec<u8>,
        content_type: Option<String>,
    },
    Multipart(Vec<MultipartPart>),
}

/// Outgoing request descriptor
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: RequestBody,
    /// Set once the request has been replayed after a refresh
    pub(crate) retried: bool,
    /// Access token the last attempt carried
    pub(crate) sent_with: Option<AccessToken>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            retried: false,
            sent_with: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn bytes(mut self, data: Vec<u8>, content_type: Option<String>) -> Self {
        self.body = RequestBody::Bytes { data, content_type };
        self
    }

    pub fn multipart(mut self, parts: Vec<MultipartPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| AuthError::InvalidRequest(format!("Invalid header {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| AuthError::InvalidRequest(format!("Invalid header {}: {}", name, e)))?;
        self.headers.insert(header, value);
        Ok(self)
    }

    pub fn is_state_changing(&self) -> bool {
        matches!(
            self.method,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        )
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    /// Build the transport request
    pub(crate) fn to_builder(&self, http: &reqwest::Client, url: Url) -> Result<RequestBuilder> {
        let mut builder = http
            .request(self.method.clone(), url)
            .headers(self.headers.clone());

        if !self.query.is_empty() {
            builder = builder.query(&self.query);
        }

        builder = match &self.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Bytes { data, content_type } => {
                let builder = builder.body(data.clone());
                match content_type {
                    Some(content_type) => builder.header(CONTENT_TYPE, content_type.as_str()),
                    None => builder,
                }
            }
            RequestBody::Multipart(parts) => builder.multipart(build_form(parts)?),
        };

        Ok(builder)
    }
}

fn build_form(parts: &[MultipartPart]) -> Result<reqwest::multipart::Form> {
    let mut form = reqwest::multipart::Form::new();
    for part in parts {
        form = match part {
            MultipartPart::Text { name, value } => form.text(name.clone(), value.clone()),
            MultipartPart::File {
                name,
                file_name,
                mime,
                data,
            } => {
                let mut file = reqwest::multipart::Part::bytes(data.clone())
                    .file_name(file_name.clone());
                if let Some(mime) = mime {
                    file = file.mime_str(mime).map_err(|e| {
                        AuthError::InvalidRequest(format!("Invalid mime type {}: {}", mime, e))
                    })?;
                }
                form.part(name.clone(), file)
            }
        };
    }
    Ok(form)
}

/// Decorates outgoing requests with credentials and the CSRF token.
///
/// Only mutates headers; never blocks or retries.
#[derive(Debug, Clone)]
pub struct RequestInterceptor {
    csrf_header: HeaderName,
}

impl RequestInterceptor {
    pub fn new(csrf_header: &str) -> Result<Self> {
        let csrf_header = HeaderName::from_bytes(csrf_header.as_bytes())
            .map_err(|e| AuthError::InvalidRequest(format!("Invalid CSRF header name: {}", e)))?;
        Ok(Self { csrf_header })
    }

    pub fn decorate(
        &self,
        request: &mut ApiRequest,
        access: Option<&AccessToken>,
        csrf: &CsrfProvider,
    ) -> Result<()> {
        match access {
            Some(token) => {
                let value = HeaderValue::from_str(&token.bearer()).map_err(|_| {
                    AuthError::InvalidRequest("Access token is not a valid header value".to_string())
                })?;
                request.headers.insert(AUTHORIZATION, value);
                request.sent_with = Some(token.clone());
            }
            None => {
                request.headers.remove(AUTHORIZATION);
                request.sent_with = None;
            }
        }

        if request.is_state_changing() {
            match csrf.token() {
                Some(token) => match HeaderValue::from_str(&token) {
                    Ok(value) => {
                        request.headers.insert(self.csrf_header.clone(), value);
                    }
                    Err(_) => debug!("Ignoring CSRF token that is not a valid header value"),
                },
                None => debug!(
                    "No CSRF token available for {} {}, sending without one",
                    request.method, request.path
                ),
            }
        }

        // the transport sets the boundary-bearing content type itself
        if matches!(request.body, RequestBody::Multipart(_)) {
            request.headers.remove(CONTENT_TYPE);
        }

        Ok(())
    }
}
