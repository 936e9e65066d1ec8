use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage key for the access token
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// The access/refresh credential bundle.
///
/// Both halves are always present: a session is never half-credentialed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Build a pair from two optional halves, rejecting half pairs and empty values.
    pub fn from_parts(access: Option<String>, refresh: Option<String>) -> Option<Self> {
        match (access, refresh) {
            (Some(a), Some(r)) if !a.is_empty() && !r.is_empty() => Some(Self::new(a, r)),
            _ => None,
        }
    }
}

// Tokens are credentials; keep them out of logs and panic messages.
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &format_args!("<{} bytes>", self.access_token.len()))
            .field("refresh_token", &format_args!("<{} bytes>", self.refresh_token.len()))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    Bearer,
    Refresh,
}

/// Body of a successful `POST /auth/login`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<TokenType>,
}

impl From<LoginResponse> for TokenPair {
    fn from(res: LoginResponse) -> Self {
        TokenPair::new(res.access_token, res.refresh_token)
    }
}

/// Body of a successful `POST /auth/refresh`. The backend may rotate the
/// refresh token; when it doesn't, the one from login stays in use.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<TokenType>,
}

impl RefreshResponse {
    /// Merge with the refresh token that was presented to obtain this response.
    pub fn into_pair(self, presented_refresh: &str) -> TokenPair {
        let refresh = self
            .refresh_token
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| presented_refresh.to_string());
        TokenPair::new(self.access_token, refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_requires_both_halves() {
        assert_eq!(
            TokenPair::from_parts(Some("A1".into()), Some("R1".into())),
            Some(TokenPair::new("A1", "R1"))
        );
        assert_eq!(TokenPair::from_parts(Some("A1".into()), None), None);
        assert_eq!(TokenPair::from_parts(None, Some("R1".into())), None);
        assert_eq!(TokenPair::from_parts(Some(String::new()), Some("R1".into())), None);
        assert_eq!(TokenPair::from_parts(None, None), None);
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let pair = TokenPair::new("secret-access", "secret-refresh");
        let rendered = format!("{:?}", pair);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("13 bytes"));
    }

    #[test]
    fn test_parse_login_response() {
        let json = r#"{"accessToken":"A1","refreshToken":"R1","tokenType":"Bearer"}"#;
        let res: LoginResponse = serde_json::from_str(json).expect("valid login json");
        assert_eq!(res.token_type, Some(TokenType::Bearer));
        assert_eq!(TokenPair::from(res), TokenPair::new("A1", "R1"));
    }

    #[test]
    fn test_refresh_response_keeps_presented_refresh_token() {
        let res: RefreshResponse = serde_json::from_str(r#"{"accessToken":"A2"}"#)
            .expect("valid refresh json");
        assert_eq!(res.into_pair("R1"), TokenPair::new("A2", "R1"));

        let res: RefreshResponse =
            serde_json::from_str(r#"{"accessToken":"A2","refreshToken":"R2"}"#)
                .expect("valid refresh json");
        assert_eq!(res.into_pair("R1"), TokenPair::new("A2", "R2"));
    }

    #[test]
    fn test_refresh_response_ignores_empty_refresh_token() {
        let res: RefreshResponse =
            serde_json::from_str(r#"{"accessToken":"A2","refreshToken":""}"#)
                .expect("valid refresh json");
        assert_eq!(res.into_pair("R1"), TokenPair::new("A2", "R1"));
    }
}
