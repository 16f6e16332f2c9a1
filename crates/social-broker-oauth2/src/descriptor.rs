// Static descriptors for the supported providers. Adding a provider means
// adding a descriptor here; the generic adapter and the normalizer are
// driven entirely by this table.

/// JSON paths into a provider's raw profile document. Dot-separated for
/// nested fields; an empty path means the provider does not supply the field.
#[derive(Debug, Clone, Copy)]
pub struct ProfilePaths {
    pub identifier: &'static str,
    pub email: &'static str,
    pub email_verified: &'static str,
    pub display_name: &'static str,
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub photo_url: &'static str,
}

/// How client credentials are presented to the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenAuthMethod {
    /// HTTP Basic auth header.
    Basic,
    /// Credentials in the POST body (default).
    #[default]
    Post,
}

/// Static configuration for one provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderDescriptor {
    pub name: &'static str,
    pub display_name: &'static str,
    pub authorization_endpoint: &'static str,
    pub token_endpoint: &'static str,
    pub userinfo_endpoint: &'static str,
    pub default_scopes: &'static [&'static str],
    pub scope_joiner: &'static str,
    pub token_auth: TokenAuthMethod,
    pub profile: ProfilePaths,
    pub extra_userinfo_headers: &'static [(&'static str, &'static str)],
}

pub static FACEBOOK: ProviderDescriptor = ProviderDescriptor {
    name: "facebook",
    display_name: "Facebook",
    authorization_endpoint: "https://www.facebook.com/v24.0/dialog/oauth",
    token_endpoint: "https://graph.facebook.com/v24.0/oauth/access_token",
    userinfo_endpoint:
        "https://graph.facebook.com/me?fields=id,name,email,first_name,last_name,picture",
    default_scopes: &["email", "public_profile"],
    scope_joiner: " ",
    token_auth: TokenAuthMethod::Post,
    profile: ProfilePaths {
        identifier: "id",
        email: "email",
        email_verified: "",
        display_name: "name",
        first_name: "first_name",
        last_name: "last_name",
        photo_url: "picture.data.url",
    },
    extra_userinfo_headers: &[],
};

pub static GOOGLE: ProviderDescriptor = ProviderDescriptor {
    name: "google",
    display_name: "Google",
    authorization_endpoint: "https://accounts.google.com/o/oauth2/v2/auth",
    token_endpoint: "https://oauth2.googleapis.com/token",
    userinfo_endpoint: "https://www.googleapis.com/oauth2/v3/userinfo",
    default_scopes: &["openid", "email", "profile"],
    scope_joiner: " ",
    token_auth: TokenAuthMethod::Post,
    profile: ProfilePaths {
        identifier: "sub",
        email: "email",
        email_verified: "",
        display_name: "name",
        first_name: "given_name",
        last_name: "family_name",
        photo_url: "picture",
    },
    extra_userinfo_headers: &[],
};

pub static TWITTER: ProviderDescriptor = ProviderDescriptor {
    name: "twitter",
    display_name: "Twitter",
    authorization_endpoint: "https://x.com/i/oauth2/authorize",
    token_endpoint: "https://api.x.com/2/oauth2/token",
    userinfo_endpoint: "https://api.x.com/2/users/me?user.fields=profile_image_url",
    default_scopes: &["users.read", "tweet.read", "users.email"],
    scope_joiner: " ",
    token_auth: TokenAuthMethod::Basic,
    profile: ProfilePaths {
        identifier: "data.id",
        email: "data.email",
        email_verified: "",
        display_name: "data.name",
        first_name: "",
        last_name: "",
        photo_url: "data.profile_image_url",
    },
    extra_userinfo_headers: &[],
};

pub static LINKEDIN: ProviderDescriptor = ProviderDescriptor {
    name: "linkedin",
    display_name: "LinkedIn",
    authorization_endpoint: "https://www.linkedin.com/oauth/v2/authorization",
    token_endpoint: "https://www.linkedin.com/oauth/v2/accessToken",
    userinfo_endpoint: "https://api.linkedin.com/v2/userinfo",
    default_scopes: &["openid", "profile", "email"],
    scope_joiner: " ",
    token_auth: TokenAuthMethod::Post,
    profile: ProfilePaths {
        identifier: "sub",
        email: "email",
        email_verified: "",
        display_name: "name",
        first_name: "given_name",
        last_name: "family_name",
        photo_url: "picture",
    },
    extra_userinfo_headers: &[],
};

pub static INSTAGRAM: ProviderDescriptor = ProviderDescriptor {
    name: "instagram",
    display_name: "Instagram",
    authorization_endpoint: "https://api.instagram.com/oauth/authorize",
    token_endpoint: "https://api.instagram.com/oauth/access_token",
    userinfo_endpoint: "https://graph.instagram.com/me?fields=id,username",
    default_scopes: &["user_profile"],
    scope_joiner: " ",
    token_auth: TokenAuthMethod::Post,
    profile: ProfilePaths {
        identifier: "id",
        email: "",
        email_verified: "",
        display_name: "username",
        first_name: "",
        last_name: "",
        photo_url: "",
    },
    extra_userinfo_headers: &[],
};

/// All supported provider names, stable order.
pub const PROVIDER_NAMES: &[&str] = &["facebook", "google", "twitter", "linkedin", "instagram"];

/// Look up a descriptor by provider name.
pub fn lookup(name: &str) -> Option<&'static ProviderDescriptor> {
    match name {
        "facebook" => Some(&FACEBOOK),
        "google" => Some(&GOOGLE),
        "twitter" => Some(&TWITTER),
        "linkedin" => Some(&LINKEDIN),
        "instagram" => Some(&INSTAGRAM),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_providers_resolve() {
        for name in PROVIDER_NAMES {
            let descriptor = lookup(name).unwrap_or_else(|| panic!("missing descriptor: {name}"));
            assert_eq!(descriptor.name, *name);
            assert!(!descriptor.authorization_endpoint.is_empty());
            assert!(!descriptor.token_endpoint.is_empty());
            assert!(!descriptor.userinfo_endpoint.is_empty());
            assert!(!descriptor.profile.identifier.is_empty());
        }
    }

    #[test]
    fn unknown_provider_is_none() {
        assert!(lookup("myspace").is_none());
        assert!(lookup("Google").is_none());
    }

    #[test]
    fn twitter_uses_basic_auth() {
        assert_eq!(TWITTER.token_auth, TokenAuthMethod::Basic);
        assert_eq!(GOOGLE.token_auth, TokenAuthMethod::Post);
    }

    #[test]
    fn instagram_has_no_email_path() {
        assert!(INSTAGRAM.profile.email.is_empty());
        assert_eq!(INSTAGRAM.profile.display_name, "username");
    }
}
