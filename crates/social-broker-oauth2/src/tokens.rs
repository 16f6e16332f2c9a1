// OAuth2 token types and wire-format parsing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parsed token response from a provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuth2Tokens {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

/// Raw token response (snake_case wire format).
#[derive(Debug, Default, Deserialize)]
struct RawTokenResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    scope: Option<String>,
    id_token: Option<String>,
}

impl OAuth2Tokens {
    /// Parse a raw provider token response. `expires_in` seconds become an
    /// absolute timestamp against the current clock.
    pub fn from_raw(data: &serde_json::Value) -> Self {
        let raw: RawTokenResponse = serde_json::from_value(data.clone()).unwrap_or_default();

        let expires_at = raw
            .expires_in
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs));

        let scopes = raw
            .scope
            .map(|s| s.split(' ').map(String::from).collect())
            .unwrap_or_default();

        Self {
            access_token: raw.access_token,
            token_type: raw.token_type,
            refresh_token: raw.refresh_token,
            access_token_expires_at: expires_at,
            scopes,
            id_token: raw.id_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_token_response() {
        let raw = serde_json::json!({
            "access_token": "ya29.abc",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "1//xyz",
            "scope": "openid email profile",
            "id_token": "ey.jwt.token"
        });

        let tokens = OAuth2Tokens::from_raw(&raw);
        assert_eq!(tokens.access_token.as_deref(), Some("ya29.abc"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("1//xyz"));
        assert_eq!(tokens.scopes, vec!["openid", "email", "profile"]);
        assert!(tokens.access_token_expires_at.is_some());
    }

    #[test]
    fn parses_minimal_token_response() {
        let raw = serde_json::json!({ "access_token": "token123" });
        let tokens = OAuth2Tokens::from_raw(&raw);
        assert_eq!(tokens.access_token.as_deref(), Some("token123"));
        assert!(tokens.refresh_token.is_none());
        assert!(tokens.scopes.is_empty());
        assert!(tokens.access_token_expires_at.is_none());
    }

    #[test]
    fn garbage_response_yields_empty_tokens() {
        let raw = serde_json::json!("not an object");
        let tokens = OAuth2Tokens::from_raw(&raw);
        assert!(tokens.access_token.is_none());
    }
}
