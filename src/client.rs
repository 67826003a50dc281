//! Authenticated HTTP client for the console's REST backend.
//!
//! Every call is a single blocking request/response. A `401` with a stored
//! refresh token triggers exactly one `POST /auth/token/refresh/` and one
//! replay of the first request; nothing is retried beyond that.

use std::sync::Arc;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::config::ClientConfig;
use crate::dashboard::{DashboardResponse, UserProfile};
use crate::error::ApiError;
use crate::schema::normalize_endpoint;
use crate::tokens::{TokenStore, Tokens};
use crate::types::{EntityId, ListPage, ListQuery, Record};

const LOGIN_PATH: &str = "/auth/token/";
const REFRESH_PATH: &str = "/auth/token/refresh/";
const ME_PATH: &str = "/auth/me/";
const DASHBOARD_PATH: &str = "/dashboard/";

/// Body of an outgoing request.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Serialized as JSON.
    Json(Value),
    /// Sent url-encoded, never as JSON.
    Form(Vec<(String, String)>),
}

/// A request relative to the configured API prefix.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub headers: HeaderMap,
    /// Attach the bearer token and allow the refresh-on-401 replay.
    pub authenticated: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            headers: HeaderMap::new(),
            authenticated: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn form(mut self, pairs: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(pairs);
        self
    }

    pub fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query = pairs;
        self
    }

    pub fn header(mut self, name: reqwest::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Skip the bearer token and the refresh replay (login/refresh calls).
    pub fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self
    }
}

/// Blocking API client with token management.
#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
    http: Client,
    tokens: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url)
            .field("prefix", &self.config.prefix)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns `ApiError::Transport` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| ApiError::Transport {
            message: e.to_string(),
        })?;
        Ok(Self {
            config,
            http,
            tokens,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether an access token (static or stored) is available.
    pub fn is_authenticated(&self) -> bool {
        self.config.static_token.is_some() || self.tokens.load().is_some()
    }

    /// Convenience wrapper around [`ApiClient::send`].
    pub fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Option<Value>, ApiError> {
        let mut request = ApiRequest::new(method, path);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(&request)
    }

    /// Send a request; `Ok(None)` for 204 and empty bodies.
    ///
    /// # Errors
    ///
    /// - `ApiError::Connect` when no response was obtained
    /// - `ApiError::Unauthorized` for a 401 that the refresh could not fix
    /// - `ApiError::Http` for any other non-2xx status
    /// - `ApiError::InvalidJson` for a 2xx body that isn't JSON
    pub fn send(&self, request: &ApiRequest) -> Result<Option<Value>, ApiError> {
        let stored = if request.authenticated {
            self.tokens.load()
        } else {
            None
        };
        let access = self.access_token(stored.as_ref());
        let response = self.dispatch(request, access.as_deref())?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return self.read_body(request, response);
        }
        if !request.authenticated {
            return Err(self.unauthorized(request, response));
        }

        // Static tokens cannot be refreshed.
        let refresh = match stored {
            Some(tokens) if self.config.static_token.is_none() && !tokens.refresh.is_empty() => {
                tokens.refresh
            }
            _ => {
                self.clear_tokens();
                return Err(self.unauthorized(request, response));
            }
        };

        match self.refresh_access(&refresh) {
            Ok(new_access) => {
                self.tokens.save(&Tokens {
                    access: new_access.clone(),
                    refresh,
                })?;
                debug!(path = %request.path, "access token refreshed, replaying request");
                let replay = self.dispatch(request, Some(&new_access))?;
                if replay.status() == StatusCode::UNAUTHORIZED {
                    warn!(path = %request.path, "replay rejected after refresh, clearing tokens");
                    self.clear_tokens();
                    return Err(self.unauthorized(request, replay));
                }
                self.read_body(request, replay)
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, clearing tokens");
                self.clear_tokens();
                Err(self.unauthorized(request, response))
            }
        }
    }

    /// Send and deserialize a JSON body.
    pub fn send_as<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiError> {
        let value = self.send(request)?.unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| ApiError::UnexpectedShape {
            path: request.path.clone(),
            message: e.to_string(),
        })
    }

    /// `POST /auth/token/` and persist the returned pair.
    pub fn login(&self, username: &str, password: &str) -> Result<Tokens, ApiError> {
        let request = ApiRequest::post(LOGIN_PATH)
            .json(json!({ "username": username, "password": password }))
            .anonymous();
        let tokens: Tokens = self.send_as(&request)?;
        self.tokens.save(&tokens)?;
        info!(username, "logged in");
        Ok(tokens)
    }

    /// Drop stored tokens.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.tokens.clear()
    }

    /// `GET /auth/me/`
    pub fn me(&self) -> Result<UserProfile, ApiError> {
        self.send_as(&ApiRequest::get(ME_PATH))
    }

    /// `GET /dashboard/`
    pub fn dashboard(&self) -> Result<DashboardResponse, ApiError> {
        self.send_as(&ApiRequest::get(DASHBOARD_PATH))
    }

    fn access_token(&self, stored: Option<&Tokens>) -> Option<String> {
        self.config
            .static_token
            .clone()
            .or_else(|| stored.map(|t| t.access.clone()).filter(|a| !a.is_empty()))
    }

    fn refresh_access(&self, refresh: &str) -> Result<String, ApiError> {
        #[derive(serde::Deserialize)]
        struct Refreshed {
            access: String,
        }

        let request = ApiRequest::post(REFRESH_PATH)
            .json(json!({ "refresh": refresh }))
            .anonymous();
        let refreshed: Refreshed = self.send_as(&request)?;
        Ok(refreshed.access)
    }

    fn clear_tokens(&self) {
        if let Err(e) = self.tokens.clear() {
            warn!(error = %e, "could not clear stored tokens");
        }
    }

    fn build(&self, request: &ApiRequest, access: Option<&str>) -> RequestBuilder {
        let url = self.config.url(&request.path);
        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .headers(request.headers.clone());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(token) = access.filter(|_| request.authenticated) {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => {
                if !request.headers.contains_key(CONTENT_TYPE) {
                    builder = builder.header(CONTENT_TYPE, "application/json");
                }
                builder.body(value.to_string())
            }
            RequestBody::Form(pairs) => builder.form(pairs),
        }
    }

    fn dispatch(&self, request: &ApiRequest, access: Option<&str>) -> Result<Response, ApiError> {
        debug!(method = %request.method, path = %request.path, "request");
        let response = self
            .build(request, access)
            .send()
            .map_err(|source| ApiError::Connect {
                url: self.config.url(""),
                source,
            })?;
        debug!(status = response.status().as_u16(), path = %request.path, "response");
        Ok(response)
    }

    fn read_body(&self, request: &ApiRequest, response: Response) -> Result<Option<Value>, ApiError> {
        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let text = response.text().map_err(|source| ApiError::Connect {
            url: self.config.url(&request.path),
            source,
        })?;

        if !status.is_success() {
            let body: Option<Value> = serde_json::from_str(&text).ok();
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: error_message(body.as_ref(), status.as_u16()),
            });
        }

        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| ApiError::InvalidJson {
                path: request.path.clone(),
                source,
            })
    }

    fn unauthorized(&self, request: &ApiRequest, response: Response) -> ApiError {
        let status = response.status().as_u16();
        let body: Option<Value> = response.text().ok().and_then(|t| serde_json::from_str(&t).ok());
        warn!(path = %request.path, "unauthorized");
        ApiError::Unauthorized {
            message: error_message(body.as_ref(), status),
        }
    }
}

/// Human-readable message from an error body.
///
/// Prefers `detail`, then `error`, then the first DRF field error
/// (`{"cpf": ["CPF invalido."]}` becomes `cpf: CPF invalido.`), and falls
/// back to `Request failed (<status>)`.
pub fn error_message(body: Option<&Value>, status: u16) -> String {
    let fallback = || format!("Request failed ({})", status);
    let Some(body) = body else {
        return fallback();
    };

    for key in ["detail", "error"] {
        if let Some(Value::String(message)) = body.get(key) {
            if !message.is_empty() {
                return message.clone();
            }
        }
    }

    match body {
        Value::Object(map) => map
            .iter()
            .find_map(|(field, value)| {
                let message = first_message(value)?;
                if field == "non_field_errors" {
                    Some(message)
                } else {
                    Some(format!("{}: {}", field, message))
                }
            })
            .unwrap_or_else(fallback),
        other => first_message(other).unwrap_or_else(fallback),
    }
}

fn first_message(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(first_message),
        _ => None,
    }
}

impl Backend for ApiClient {
    fn list(&self, endpoint: &str, query: &ListQuery) -> Result<ListPage, ApiError> {
        let path = normalize_endpoint(endpoint);
        let value = self
            .send(&ApiRequest::get(path.clone()).query(query.pairs()))?
            .unwrap_or(Value::Null);
        ListPage::from_value(value).map_err(|e| ApiError::UnexpectedShape {
            path,
            message: e.to_string(),
        })
    }

    fn create(&self, endpoint: &str, payload: &Record) -> Result<Record, ApiError> {
        let request =
            ApiRequest::post(normalize_endpoint(endpoint)).json(Value::Object(payload.clone()));
        Ok(self.send_as::<Option<Record>>(&request)?.unwrap_or_default())
    }

    fn update(&self, endpoint: &str, id: &EntityId, payload: &Record) -> Result<Record, ApiError> {
        let path = format!("{}{}/", normalize_endpoint(endpoint), id);
        let request = ApiRequest::new(Method::PATCH, path).json(Value::Object(payload.clone()));
        Ok(self.send_as::<Option<Record>>(&request)?.unwrap_or_default())
    }

    fn delete(&self, endpoint: &str, id: &EntityId) -> Result<(), ApiError> {
        let path = format!("{}{}/", normalize_endpoint(endpoint), id);
        self.send(&ApiRequest::new(Method::DELETE, path))?;
        Ok(())
    }

    fn action(&self, endpoint: &str, id: &EntityId, action: &str) -> Result<Option<Value>, ApiError> {
        let path = format!("{}{}/{}/", normalize_endpoint(endpoint), id, action);
        self.send(&ApiRequest::post(path))
    }
}
