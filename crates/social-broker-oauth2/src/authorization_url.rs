// Authorization URL construction: state, scopes, PKCE challenge, and the
// optional display hint, assembled onto the provider's endpoint.

use social_broker_core::options::ProviderConfig;

use crate::descriptor::ProviderDescriptor;
use crate::pkce::generate_code_challenge;

/// Build the authorization redirect URL for one handshake attempt.
///
/// A scope configured on `ProviderConfig` replaces the descriptor defaults;
/// otherwise the defaults are joined with the descriptor's joiner.
pub fn build_authorization_url(
    descriptor: &ProviderDescriptor,
    config: &ProviderConfig,
    redirect_uri: &str,
    state: &str,
    code_verifier: &str,
) -> Result<url::Url, url::ParseError> {
    let mut url = url::Url::parse(descriptor.authorization_endpoint)?;

    let scope = match &config.scope {
        Some(s) if !s.is_empty() => s.clone(),
        _ => descriptor.default_scopes.join(descriptor.scope_joiner),
    };

    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("response_type", "code");
        pairs.append_pair("client_id", &config.credentials.id);
        pairs.append_pair("state", state);
        if !scope.is_empty() {
            pairs.append_pair("scope", &scope);
        }
        pairs.append_pair("redirect_uri", redirect_uri);
        if let Some(display) = &config.display_mode {
            pairs.append_pair("display", display);
        }
        pairs.append_pair("code_challenge_method", "S256");
        pairs.append_pair("code_challenge", &generate_code_challenge(code_verifier));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor;

    fn query(url: &url::Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn builds_standard_url() {
        let config = ProviderConfig::new("google", "client-1", "secret-1");
        let url = build_authorization_url(
            &descriptor::GOOGLE,
            &config,
            "https://example.com/callback",
            "state-abc",
            "verifier-xyz",
        )
        .unwrap();

        assert!(url.as_str().starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert_eq!(query(&url, "response_type").as_deref(), Some("code"));
        assert_eq!(query(&url, "client_id").as_deref(), Some("client-1"));
        assert_eq!(query(&url, "state").as_deref(), Some("state-abc"));
        assert_eq!(query(&url, "scope").as_deref(), Some("openid email profile"));
        assert_eq!(
            query(&url, "redirect_uri").as_deref(),
            Some("https://example.com/callback")
        );
        assert_eq!(query(&url, "code_challenge_method").as_deref(), Some("S256"));
        assert!(query(&url, "code_challenge").is_some());
        assert!(query(&url, "display").is_none());
    }

    #[test]
    fn scope_override_replaces_defaults() {
        let config = ProviderConfig::new("google", "c", "s").with_scope("email");
        let url = build_authorization_url(
            &descriptor::GOOGLE,
            &config,
            "https://example.com/cb",
            "s",
            "v",
        )
        .unwrap();
        assert_eq!(query(&url, "scope").as_deref(), Some("email"));
    }

    #[test]
    fn display_mode_is_appended() {
        let config = ProviderConfig::new("facebook", "c", "s").with_display_mode("popup");
        let url = build_authorization_url(
            &descriptor::FACEBOOK,
            &config,
            "https://example.com/cb",
            "s",
            "v",
        )
        .unwrap();
        assert_eq!(query(&url, "display").as_deref(), Some("popup"));
    }
}
