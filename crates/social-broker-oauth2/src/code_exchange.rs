// Authorization-code exchange against the provider's token endpoint.
// Failures are translated into the broker taxonomy here: transport
// problems become ProviderUnavailable, endpoint rejections become
// InvalidCredentials. The response body is never echoed into errors.

use social_broker_core::error::{BrokerError, ErrorKind, Result};
use social_broker_core::options::Credentials;

use crate::descriptor::{ProviderDescriptor, TokenAuthMethod};
use crate::tokens::OAuth2Tokens;

/// Parameters for one code exchange.
#[derive(Debug)]
pub struct CodeExchange<'a> {
    pub descriptor: &'a ProviderDescriptor,
    pub credentials: &'a Credentials,
    pub code: &'a str,
    pub redirect_uri: &'a str,
    pub code_verifier: &'a str,
}

/// Exchange an authorization code for tokens.
pub async fn exchange_code(http: &reqwest::Client, req: CodeExchange<'_>) -> Result<OAuth2Tokens> {
    let mut form = vec![
        ("grant_type", "authorization_code"),
        ("code", req.code),
        ("redirect_uri", req.redirect_uri),
        ("code_verifier", req.code_verifier),
    ];

    let mut builder = http.post(req.descriptor.token_endpoint);
    match req.descriptor.token_auth {
        TokenAuthMethod::Basic => {
            builder = builder.basic_auth(&req.credentials.id, Some(&req.credentials.secret));
        }
        TokenAuthMethod::Post => {
            form.push(("client_id", req.credentials.id.as_str()));
            form.push(("client_secret", req.credentials.secret.as_str()));
        }
    }

    let response = builder
        .header("Accept", "application/json")
        .form(&form)
        .send()
        .await
        .map_err(|e| transport_error(req.descriptor.name, &e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(BrokerError::auth(
            ErrorKind::InvalidCredentials,
            format!(
                "token endpoint for '{}' rejected the exchange with status {}",
                req.descriptor.name,
                status.as_u16()
            ),
        ));
    }

    let body: serde_json::Value = response.json().await.map_err(|_| {
        BrokerError::auth(
            ErrorKind::ProviderUnavailable,
            format!("token endpoint for '{}' returned a malformed response", req.descriptor.name),
        )
    })?;

    let tokens = OAuth2Tokens::from_raw(&body);
    if tokens.access_token.is_none() {
        return Err(BrokerError::auth(
            ErrorKind::InvalidCredentials,
            format!("token response for '{}' carried no access token", req.descriptor.name),
        ));
    }

    Ok(tokens)
}

/// Map a reqwest transport failure onto the taxonomy. A timeout is a
/// recoverable provider outage, not a fatal condition.
pub(crate) fn transport_error(provider: &str, err: &reqwest::Error) -> BrokerError {
    let detail = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    BrokerError::auth(
        ErrorKind::ProviderUnavailable,
        format!("provider '{provider}' unreachable: {detail}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor;
    use social_broker_core::options::Credentials;

    #[tokio::test]
    async fn unreachable_endpoint_maps_to_provider_unavailable() {
        // Port 9 is the discard service; nothing answers there.
        let dead = ProviderDescriptor {
            token_endpoint: "http://127.0.0.1:9/token",
            ..descriptor::GOOGLE
        };
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(500))
            .build()
            .unwrap();
        let credentials = Credentials {
            id: "c".into(),
            secret: "s".into(),
        };
        let err = exchange_code(
            &http,
            CodeExchange {
                descriptor: &dead,
                credentials: &credentials,
                code: "code",
                redirect_uri: "https://example.com/cb",
                code_verifier: "v",
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
    }
}
