// Profile normalization: map a provider's raw profile document onto the
// canonical SocialProfile. Pure; tolerates any subset of fields being
// absent. Only the identifier is mandatory.
//
// Field extraction tries the provider descriptor's JSON path first, then
// a short list of conventional aliases, so both native wire documents and
// pre-flattened payloads normalize the same way.

use serde_json::Value;

use social_broker_core::error::{BrokerError, ErrorKind, Result};
use social_broker_core::sanitize::clean_text;
use social_broker_oauth2::descriptor;

use crate::profile::SocialProfile;

/// Normalize a raw profile payload for the named provider.
///
/// Mapping priority:
/// - email: raw `email` if non-empty, else raw `emailVerified`
/// - every free-text field is sanitized (markup stripped, whitespace
///   collapsed, trimmed); empty results are treated as absent
pub fn normalize(provider: &str, raw: &Value) -> Result<SocialProfile> {
    let paths = descriptor::lookup(provider).map(|d| d.profile);

    let identifier = extract_id(raw, paths.map(|p| p.identifier), &["identifier", "id", "sub"])
        .ok_or_else(|| {
            BrokerError::auth(
                ErrorKind::MalformedProfile,
                format!("profile from '{provider}' carries no identifier"),
            )
        })?;

    let email = extract_text(raw, paths.map(|p| p.email), &["email"]).or_else(|| {
        extract_text(
            raw,
            paths.map(|p| p.email_verified),
            &["emailVerified", "email_verified"],
        )
    });

    Ok(SocialProfile {
        identifier,
        provider: provider.to_string(),
        email,
        display_name: extract_text(raw, paths.map(|p| p.display_name), &["displayName", "name"]),
        first_name: extract_text(
            raw,
            paths.map(|p| p.first_name),
            &["firstName", "first_name", "given_name"],
        ),
        last_name: extract_text(
            raw,
            paths.map(|p| p.last_name),
            &["lastName", "last_name", "family_name"],
        ),
        phone: extract_text(raw, None, &["phone", "telephone"]),
        address: extract_text(raw, None, &["address"]),
        city: extract_text(raw, None, &["city"]),
        zip: extract_text(raw, None, &["zip", "postal_code"]),
        country: extract_text(raw, None, &["country"]),
        photo_url: extract_raw_text(
            raw,
            paths.map(|p| p.photo_url),
            &["photoURL", "photoUrl", "picture"],
        ),
    })
}

/// Walk a dot-separated path into a JSON document.
fn walk<'a>(raw: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    let mut current = raw;
    for part in path.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

fn candidate_paths<'a>(primary: Option<&'a str>, aliases: &'a [&'a str]) -> Vec<&'a str> {
    let mut paths = Vec::with_capacity(aliases.len() + 1);
    if let Some(p) = primary.filter(|p| !p.is_empty()) {
        paths.push(p);
    }
    paths.extend_from_slice(aliases);
    paths
}

/// First non-empty string at any candidate path, sanitized. Booleans and
/// numbers never qualify; a verified-email flag must not become an email.
fn extract_text(raw: &Value, primary: Option<&str>, aliases: &[&str]) -> Option<String> {
    for path in candidate_paths(primary, aliases) {
        if let Some(Value::String(s)) = walk(raw, path) {
            let cleaned = clean_text(s);
            if !cleaned.is_empty() {
                return Some(cleaned);
            }
        }
    }
    None
}

/// Like `extract_text` but without sanitation; used for URLs where
/// whitespace collapsing must not alter the value.
fn extract_raw_text(raw: &Value, primary: Option<&str>, aliases: &[&str]) -> Option<String> {
    for path in candidate_paths(primary, aliases) {
        if let Some(Value::String(s)) = walk(raw, path) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// Identifier extraction accepts strings and numbers; some providers send
/// numeric ids.
fn extract_id(raw: &Value, primary: Option<&str>, aliases: &[&str]) -> Option<String> {
    for path in candidate_paths(primary, aliases) {
        match walk(raw, path) {
            Some(Value::String(s)) if !s.trim().is_empty() => {
                return Some(s.trim().to_string());
            }
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_email_falls_back_to_verified_email() {
        let raw = json!({
            "id": "123",
            "email": "",
            "emailVerified": "a@b.com",
            "displayName": "John  Doe"
        });
        let profile = normalize("facebook", &raw).unwrap();
        assert_eq!(profile.email.as_deref(), Some("a@b.com"));
        assert_eq!(profile.display_name.as_deref(), Some("John Doe"));
        assert_eq!(profile.username_seed(), "a@b.com");
    }

    #[test]
    fn display_name_seed_when_no_email() {
        let raw = json!({
            "id": "123",
            "displayName": "John  Doe"
        });
        let profile = normalize("facebook", &raw).unwrap();
        assert!(profile.email.is_none());
        assert_eq!(profile.username_seed(), "johndoe");
    }

    #[test]
    fn missing_identifier_is_malformed() {
        let raw = json!({ "email": "a@b.com" });
        let err = normalize("google", &raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedProfile);
    }

    #[test]
    fn google_wire_document_normalizes() {
        let raw = json!({
            "sub": "110248495921238986420",
            "name": "Ada Lovelace",
            "given_name": "Ada",
            "family_name": "Lovelace",
            "picture": "https://lh3.googleusercontent.com/a/photo.jpg",
            "email": "ada@example.com",
            "email_verified": true
        });
        let profile = normalize("google", &raw).unwrap();
        assert_eq!(profile.identifier, "110248495921238986420");
        assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
        assert_eq!(profile.first_name.as_deref(), Some("Ada"));
        assert_eq!(
            profile.photo_url.as_deref(),
            Some("https://lh3.googleusercontent.com/a/photo.jpg")
        );
    }

    #[test]
    fn boolean_email_verified_never_becomes_an_email() {
        let raw = json!({
            "sub": "9",
            "email": "",
            "email_verified": true
        });
        let profile = normalize("google", &raw).unwrap();
        assert!(profile.email.is_none());
    }

    #[test]
    fn nested_facebook_picture_path() {
        let raw = json!({
            "id": "77",
            "name": "Grace Hopper",
            "picture": { "data": { "url": "https://graph.facebook.com/pic.jpg" } }
        });
        let profile = normalize("facebook", &raw).unwrap();
        assert_eq!(
            profile.photo_url.as_deref(),
            Some("https://graph.facebook.com/pic.jpg")
        );
    }

    #[test]
    fn numeric_identifier_is_stringified() {
        let raw = json!({ "id": 4242 });
        let profile = normalize("facebook", &raw).unwrap();
        assert_eq!(profile.identifier, "4242");
    }

    #[test]
    fn twitter_nested_paths() {
        let raw = json!({
            "data": {
                "id": "271",
                "name": "Katherine Johnson",
                "profile_image_url": "https://pbs.twimg.com/kj.jpg"
            }
        });
        let profile = normalize("twitter", &raw).unwrap();
        assert_eq!(profile.identifier, "271");
        assert_eq!(profile.display_name.as_deref(), Some("Katherine Johnson"));
    }

    #[test]
    fn markup_is_stripped_from_free_text() {
        let raw = json!({
            "id": "5",
            "name": "<script>x</script>Mary   Jackson"
        });
        let profile = normalize("facebook", &raw).unwrap();
        assert_eq!(profile.display_name.as_deref(), Some("xMary Jackson"));
    }

    #[test]
    fn unknown_provider_uses_conventional_aliases() {
        let raw = json!({ "identifier": "abc", "email": "x@y.z" });
        let profile = normalize("acme", &raw).unwrap();
        assert_eq!(profile.identifier, "abc");
        assert_eq!(profile.email.as_deref(), Some("x@y.z"));
    }
}
