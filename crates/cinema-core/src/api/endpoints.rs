//! Backend URL layout and the auth-endpoint predicate.

use std::fmt;
use std::sync::Arc;

use reqwest::Url;

/// Path of the credential exchange endpoint, relative to the API base
pub const LOGIN_PATH: &str = "/auth/login";

/// Path of the token renewal endpoint, relative to the API base
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Header carrying the refresh token on `POST /auth/refresh`
pub const REFRESH_TOKEN_HEADER: &str = "X-Refresh-Token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base_url: String,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path such as `/open/repertoire/movies`.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Whether `url` is served by the backend: same scheme, host and port as
    /// the base URL. Only such requests ever carry the session's tokens.
    pub fn is_backend(&self, url: &Url) -> bool {
        match Url::parse(&self.base_url) {
            Ok(base) => {
                base.scheme() == url.scheme()
                    && base.host_str() == url.host_str()
                    && base.port_or_known_default() == url.port_or_known_default()
            }
            Err(_) => false,
        }
    }

    pub fn login_url(&self) -> String {
        self.url(LOGIN_PATH)
    }

    pub fn refresh_url(&self) -> String {
        self.url(REFRESH_PATH)
    }
}

/// Decides whether a request targets the login or refresh endpoint. Such
/// requests are never wrapped in the refresh-and-retry cycle.
#[derive(Clone)]
pub struct AuthEndpointMatcher(Arc<dyn Fn(&Url) -> bool + Send + Sync>);

impl AuthEndpointMatcher {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Url) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    pub fn matches(&self, url: &Url) -> bool {
        (self.0)(url)
    }
}

/// Matches exactly the paths ending in `/auth/login` or `/auth/refresh`.
/// Other paths under `/auth/` (ticket validation) are ordinary requests.
impl Default for AuthEndpointMatcher {
    fn default() -> Self {
        Self::new(|url| {
            let path = url.path().trim_end_matches('/');
            path.ends_with(LOGIN_PATH) || path.ends_with(REFRESH_PATH)
        })
    }
}

impl fmt::Debug for AuthEndpointMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthEndpointMatcher")
    }
}
