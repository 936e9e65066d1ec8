//! API client for the cinema backend.
//!
//! Every request goes through `ApiClient::execute`, which attaches the current
//! access token and, when the backend rejects it, performs one refresh and
//! one retry before giving up. Login and refresh calls are never retried.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, Request, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::endpoints::{AuthEndpointMatcher, Endpoints};
use super::ApiError;
use crate::auth::{AuthError, AuthGateway, SessionState};
use crate::config::Config;
use crate::models::TokenPair;

/// API client for the cinema backend.
/// Clone is cheap - reqwest::Client and the gateway are reference counted.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    gateway: Arc<AuthGateway>,
    auth_endpoints: AuthEndpointMatcher,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, session: Arc<SessionState>) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let gateway = AuthGateway::new(client.clone(), Endpoints::new(base_url), session);
        Ok(Self {
            client,
            gateway: Arc::new(gateway),
            auth_endpoints: AuthEndpointMatcher::default(),
        })
    }

    pub fn from_config(config: &Config, session: Arc<SessionState>) -> Result<Self> {
        Self::new(&config.api_base_url, config.request_timeout(), session)
    }

    /// Replace the rule deciding which URLs are login/refresh endpoints.
    pub fn with_auth_endpoint_matcher(mut self, matcher: AuthEndpointMatcher) -> Self {
        self.auth_endpoints = matcher;
        self
    }

    pub fn gateway(&self) -> &Arc<AuthGateway> {
        &self.gateway
    }

    pub fn session(&self) -> &Arc<SessionState> {
        self.gateway.session()
    }

    pub fn endpoints(&self) -> &Endpoints {
        self.gateway.endpoints()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        self.gateway.login(username, password).await
    }

    pub fn logout(&self) -> bool {
        self.gateway.logout()
    }

    /// Start a request for an API path (or absolute URL).
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.endpoints().url(path))
    }

    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let request = builder.build()?;
        self.execute(request).await
    }

    /// Send `request` with the current credentials, refreshing and retrying
    /// once if the access token is rejected.
    ///
    /// Requests to any origin other than the backend's are sent unmodified
    /// and never retried. A request that already carries an `Authorization`
    /// header manages its own credentials and is sent as-is, without retry.
    pub async fn execute(&self, request: Request) -> Result<Response, ApiError> {
        let url = request.url().clone();
        if !self.endpoints().is_backend(&url) {
            debug!(url = %url, "Request leaves the backend, sending without credentials");
            let response = self.dispatch(request, None).await?;
            return Self::check_response(response).await;
        }
        if request.headers().contains_key(AUTHORIZATION) {
            let response = self.dispatch(request, None).await?;
            return Self::check_response(response).await;
        }
        let is_auth_endpoint = self.auth_endpoints.matches(&url);

        let retry = if is_auth_endpoint {
            None
        } else {
            let copy = request.try_clone();
            if copy.is_none() {
                warn!(url = %url, "Request body cannot be replayed, a rejection will not be retried");
            }
            copy
        };
        let (sent_token, sent_epoch) = self.session().access_token_with_epoch();

        let response = self.dispatch(request, sent_token.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED || is_auth_endpoint {
            return Self::check_response(response).await;
        }

        debug!(url = %url, "Access token rejected, refreshing");
        let pair = self
            .gateway
            .refresh_after_rejection(sent_token.as_deref(), sent_epoch)
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "Refresh failed, giving up on request");
                e
            })?;

        // Session renewed for later requests, but this one cannot be replayed
        let Some(retry) = retry else {
            return Self::check_response(response).await;
        };

        let response = self.dispatch(retry, Some(&pair.access_token)).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(url = %url, "Request rejected again after refresh");
        }
        Self::check_response(response).await
    }

    async fn dispatch(&self, mut request: Request, token: Option<&str>) -> Result<Response, ApiError> {
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidResponse("access token is not a valid header value".to_string()))?;
            value.set_sensitive(true);
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        debug!(
            method = %request.method(),
            url = %request.url(),
            authenticated = token.is_some(),
            "Dispatching request"
        );
        Ok(self.client.execute(request).await?)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, ApiError> {
        response.json().await.map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::GET, path).query(query)).await?;
        Self::parse(response, path).await
    }

    pub async fn put<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::PUT, path).query(query)).await?;
        Self::parse(response, path).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::POST, path).json(body)).await?;
        Self::parse(response, path).await
    }
}
