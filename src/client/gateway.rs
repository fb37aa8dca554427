//! HTTP gateway to the storefront backend
//!
//! [`ApiClient`] is the only place that talks HTTP to the backend. It
//!
//! - attaches the bearer token of the [`Session`] and the master API token,
//! - on a 401 performs a single in-flight token refresh and replays the
//!   request once with the new token,
//! - validates every payload against a typed schema, failing with
//!   [`ParseError`] instead of passing half-parsed data along.
//!
//! # Refresh protocol
//!
//! ```text
//! request ──401──▶ lock(refresh) ──token unchanged?──yes──▶ POST /api/token/refresh/
//!                       │                                       │
//!                       └──no (someone refreshed)──┐      ok ───┤─── rejected
//!                                                  ▼            ▼        │
//!                                            replay request ◀───┘   clear session,
//!                                                                   AuthError
//! ```

use crate::client::session::{LogoutReason, Session, TokenPair};
use crate::config::ApiConfig;
use crate::core::{AuthError, NetworkError, ParseError, Result, StorefrontError};
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Header carrying the master API token
pub const API_KEY_HEADER: &str = "X-API-Key";

const TOKEN_PATH: &str = "/api/token/";
const TOKEN_REFRESH_PATH: &str = "/api/token/refresh/";

/// Remote data gateway
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
    session: Arc<Session>,
    refresh_lock: Mutex<()>,
}

/// Body of a request, already serialized
enum Body {
    Empty,
    Json(Value),
}

impl ApiClient {
    /// Build a client for the configured backend
    pub fn new(config: &ApiConfig, session: Arc<Session>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| NetworkError::transport(&config.base_url, &e))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone().filter(|t| !t.is_empty()),
            session,
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a backend path
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // =========================================================================
    // Verbs
    // =========================================================================

    /// `GET` a typed resource
    pub async fn get<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(Method::GET, path, query, Body::Empty).await?;
        decode(response).await
    }

    /// `POST` a JSON body, decode the typed response
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode(path, body)?;
        let response = self.send(Method::POST, path, &[], body).await?;
        decode(response).await
    }

    /// `PATCH` a JSON body, decode the typed response
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode(path, body)?;
        let response = self.send(Method::PATCH, path, &[], body).await?;
        decode(response).await
    }

    /// `DELETE` a resource; the response body is ignored
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(Method::DELETE, path, &[], Body::Empty).await?;
        Ok(())
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Exchange credentials for a token pair and store it in the session
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let url = self.url(TOKEN_PATH);
        let body = Body::Json(json!({ "email": email, "password": password }));
        let response = self.dispatch(&Method::POST, &url, &[], &body, None).await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST => {
                Err(AuthError::InvalidCredentials.into())
            }
            _ => {
                let tokens: TokenPair = decode(ensure_success(&url, response).await?).await?;
                self.session.login(tokens);
                Ok(())
            }
        }
    }

    /// Drop the session tokens
    pub fn logout(&self) {
        self.session.clear(LogoutReason::UserRequested);
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Body,
    ) -> Result<Response> {
        let url = self.url(path);
        let token = self.session.access_token();
        let response = self
            .dispatch(&method, &url, query, &body, token.as_deref())
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return ensure_success(&url, response).await;
        }

        if token.is_none() || self.session.refresh_token().is_none() {
            return Err(AuthError::Unauthorized {
                message: format!("{} {} requires authentication", method, path),
            }
            .into());
        }

        self.refresh_after(token.as_deref()).await?;

        let token = self.session.access_token();
        let response = self
            .dispatch(&method, &url, query, &body, token.as_deref())
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AuthError::Unauthorized {
                message: format!("{} {} rejected after token refresh", method, path),
            }
            .into());
        }
        ensure_success(&url, response).await
    }

    /// Refresh the access token unless another request already did
    ///
    /// `stale` is the access token the failed request was sent with. Callers
    /// that queue on the lock behind a successful refresh find a different
    /// token and return immediately to replay.
    async fn refresh_after(&self, stale: Option<&str>) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.session.access_token();
        if current.as_deref() != stale {
            return match current {
                Some(_) => Ok(()),
                None => Err(AuthError::RefreshFailed {
                    message: "session was cleared by a concurrent refresh".to_string(),
                }
                .into()),
            };
        }

        let Some(refresh) = self.session.refresh_token() else {
            return Err(AuthError::NotLoggedIn.into());
        };

        let url = self.url(TOKEN_REFRESH_PATH);
        let body = Body::Json(json!({ "refresh": refresh }));
        let response = self.dispatch(&Method::POST, &url, &[], &body, None).await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "Token refresh rejected, clearing session");
            self.session.clear(LogoutReason::SessionExpired);
            return Err(AuthError::RefreshFailed {
                message: format!("refresh endpoint returned {}", status),
            }
            .into());
        }

        #[derive(serde::Deserialize)]
        struct Refreshed {
            access: String,
            refresh: Option<String>,
        }

        let refreshed: Refreshed = decode(response).await?;
        self.session.refreshed(TokenPair {
            access: refreshed.access,
            refresh: refreshed.refresh.unwrap_or(refresh),
        });
        Ok(())
    }

    async fn dispatch(
        &self,
        method: &Method,
        url: &str,
        query: &[(&str, String)],
        body: &Body,
        token: Option<&str>,
    ) -> Result<Response> {
        let mut request = self.http.request(method.clone(), url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Body::Json(value) = body {
            request = request.json(value);
        }
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(value) = self
            .api_token
            .as_deref()
            .and_then(|key| HeaderValue::from_str(key).ok())
        {
            request = request.header(API_KEY_HEADER, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NetworkError::transport(url, &e))?;
        tracing::debug!(%method, url, status = %response.status(), "Backend request");
        Ok(response)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .finish()
    }
}

fn encode<B: Serialize + ?Sized>(path: &str, body: &B) -> Result<Body> {
    serde_json::to_value(body).map(Body::Json).map_err(|e| {
        StorefrontError::Parse(ParseError::Payload {
            url: path.to_string(),
            message: format!("request body: {}", e),
        })
    })
}

async fn ensure_success(url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(NetworkError::Status {
        url: url.to_string(),
        status,
        body,
    }
    .into())
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let url = response.url().to_string();
    let text = response
        .text()
        .await
        .map_err(|e| NetworkError::transport(&url, &e))?;
    serde_json::from_str(&text).map_err(|e| {
        ParseError::Payload {
            url,
            message: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        let config = ApiConfig {
            base_url: base.to_string(),
            ..ApiConfig::default()
        };
        ApiClient::new(&config, Arc::new(Session::new())).unwrap()
    }

    #[test]
    fn test_url_joining() {
        let api = client("http://shop.local/");
        assert_eq!(api.url("/api/cart/carts/current/"), "http://shop.local/api/cart/carts/current/");
        assert_eq!(api.url("api/users/wishlist/"), "http://shop.local/api/users/wishlist/");
        assert_eq!(api.url("https://cdn/x"), "https://cdn/x");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transient_network_error() {
        let api = client("http://127.0.0.1:9");
        let err = api
            .get::<Value>("/api/vendors/products/", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, StorefrontError::Network(NetworkError::Transport { .. })));
        assert!(err.is_transient());
    }
}
