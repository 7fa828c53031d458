//! Uniform HTTP dispatch for every backend call.
//!
//! The gateway snapshots the session once per request, attaches the bearer
//! credential, and turns every outcome into either a [`Payload`] or a typed
//! [`ClientError`]. A 401 on a credentialed request clears the session before
//! the error is returned. Nothing is retried here.

use reqwest::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, HeaderName, HeaderValue};
use reqwest::{Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use protocol::{CodecError, error_message};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::session::SessionStore;

pub use reqwest::Method;

const USER_AGENT: &str = concat!("clutch-client/", env!("CARGO_PKG_VERSION"));

/// Request body variants the backend accepts.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(Value),
    Multipart(MultipartUpload),
}

impl RequestBody {
    pub fn json<T: Serialize>(body: &T) -> Result<Self> {
        serde_json::to_value(body)
            .map(RequestBody::Json)
            .map_err(|e| ClientError::Validation(format!("Failed to encode request body: {}", e)))
    }
}

/// A single file sent as `multipart/form-data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartUpload {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Whether the session credential is attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Credentials {
    #[default]
    Attach,
    /// Public endpoints (login, register, verify). A 401 here is a plain
    /// rejection and leaves the session alone.
    Omit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseKind {
    #[default]
    Json,
    Binary,
}

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub credentials: Credentials,
    pub response: ResponseKind,
    pub no_store: bool,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn anonymous() -> Self {
        Self {
            credentials: Credentials::Omit,
            ..Self::default()
        }
    }

    pub fn binary() -> Self {
        Self {
            response: ResponseKind::Binary,
            ..Self::default()
        }
    }

    pub fn no_store(mut self) -> Self {
        self.no_store = true;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Successful response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// JSON body; an empty body decodes as `Value::Null`.
    Json(Value),
    Binary {
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
}

impl Payload {
    pub fn into_json(self) -> Result<Value> {
        match self {
            Payload::Json(value) => Ok(value),
            Payload::Binary { .. } => Err(CodecError::NotARecord { found: "binary" }.into()),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Binary { .. } => None,
        }
    }
}

#[derive(Clone)]
pub struct RequestGateway {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl RequestGateway {
    pub fn new(config: &ClientConfig, session: Arc<SessionStore>) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> Result<Payload> {
        let attached = match options.credentials {
            Credentials::Attach => self.session.get().token().map(str::to_string),
            Credentials::Omit => None,
        };
        let authorization = attached.as_deref().map(|token| self.session.header_value(token));

        let mut request = self.http.request(method.clone(), self.url(path));

        if let Some(value) = &authorization {
            request = request.header(AUTHORIZATION, value);
        }
        if options.no_store {
            request = request.header(CACHE_CONTROL, "no-store");
        }
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ClientError::Validation(format!("Invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ClientError::Validation(format!("Invalid header value: {}", e)))?;
            request = request.header(name, value);
        }

        request = match body {
            Some(RequestBody::Json(value)) => request.json(&value),
            Some(RequestBody::Multipart(upload)) => request.multipart(multipart_form(upload)?),
            None => request,
        };

        log::debug!(
            "{} {}{}",
            method,
            path,
            if authorization.is_some() { " (authenticated)" } else { "" }
        );

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                let failure = transport_error(&err);
                log::warn!("{} {} failed: {} ({})", method, path, failure.kind(), err);
                return Err(failure);
            }
        };

        let status = response.status();
        if status.is_success() {
            return read_payload(response, options.response).await.inspect_err(|err| {
                log::warn!("{} {} returned {} but body was unusable: {}", method, path, status, err);
            });
        }

        let message = read_error_message(response, status).await;

        if status == StatusCode::UNAUTHORIZED && options.credentials == Credentials::Attach {
            log::warn!("401 Unauthorized on {} {}, clearing session", method, path);
            match &attached {
                Some(token) => {
                    self.session.clear_if(token);
                }
                None => self.session.clear(),
            }
            return Err(ClientError::AuthExpired);
        }

        let failure = if status.is_server_error() {
            ClientError::Server {
                status: status.as_u16(),
                message,
            }
        } else {
            ClientError::Rejected {
                status: status.as_u16(),
                message,
            }
        };

        log::warn!(
            "{} {} failed: {} ({}): {}",
            method,
            path,
            failure.kind(),
            status.as_u16(),
            failure.user_message()
        );
        Err(failure)
    }

    pub async fn get(&self, path: &str) -> Result<Value> {
        self.send(Method::GET, path, None, RequestOptions::default())
            .await?
            .into_json()
    }

    pub async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Value> {
        self.send(
            Method::POST,
            path,
            Some(RequestBody::json(body)?),
            RequestOptions::default(),
        )
        .await?
        .into_json()
    }

    pub async fn put(&self, path: &str, body: Option<RequestBody>) -> Result<Value> {
        self.send(Method::PUT, path, body, RequestOptions::default())
            .await?
            .into_json()
    }

    pub async fn delete(&self, path: &str, body: Option<RequestBody>) -> Result<Value> {
        self.send(Method::DELETE, path, body, RequestOptions::default())
            .await?
            .into_json()
    }
}

fn multipart_form(upload: MultipartUpload) -> Result<reqwest::multipart::Form> {
    let mut part = reqwest::multipart::Part::bytes(upload.bytes).file_name(upload.file_name);
    if let Some(content_type) = &upload.content_type {
        part = part
            .mime_str(content_type)
            .map_err(|e| ClientError::Validation(format!("Invalid content type '{}': {}", content_type, e)))?;
    }
    Ok(reqwest::multipart::Form::new().part(upload.field, part))
}

fn transport_error(err: &reqwest::Error) -> ClientError {
    let timeout = err.is_timeout();
    let message = if timeout {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("could not reach server: {}", err)
    } else {
        err.to_string()
    };
    ClientError::Network { message, timeout }
}

async fn read_payload(response: Response, kind: ResponseKind) -> Result<Payload> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let bytes = response.bytes().await.map_err(|e| transport_error(&e))?;

    match kind {
        ResponseKind::Binary => Ok(Payload::Binary {
            content_type,
            bytes: bytes.to_vec(),
        }),
        ResponseKind::Json if bytes.iter().all(u8::is_ascii_whitespace) => {
            Ok(Payload::Json(Value::Null))
        }
        ResponseKind::Json => serde_json::from_slice(&bytes)
            .map(Payload::Json)
            .map_err(|e| CodecError::Shape(e).into()),
    }
}

async fn read_error_message(response: Response, status: StatusCode) -> String {
    let fallback = || {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    };

    let text = match response.text().await {
        Ok(text) => text,
        Err(_) => return fallback(),
    };

    match serde_json::from_str::<Value>(&text) {
        Ok(body) => error_message(&body).unwrap_or_else(fallback),
        Err(_) if !text.trim().is_empty() && text.len() <= 200 => text.trim().to_string(),
        Err(_) => fallback(),
    }
}
