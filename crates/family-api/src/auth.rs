//! OpenID Connect scaffolding.
//!
//! Provider metadata is discovered once at startup. Only the login redirect
//! is served; routes are not guarded.

use family_core::Settings;
use serde::Deserialize;
use url::Url;

pub const SCOPES: [&str; 3] = ["openid", "profile", "email"];

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("OIDC discovery failed: {0}")]
    Discovery(#[from] reqwest::Error),

    #[error("Invalid OIDC URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// The subset of the provider's discovery document we use.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
    #[serde(default)]
    pub jwks_uri: Option<String>,
}

/// OAuth2 client configuration for the login flow.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub provider: ProviderMetadata,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub scopes: Vec<String>,
}

impl AuthConfig {
    /// `{auth_host}/auth/realms/{realm}/.well-known/openid-configuration`
    pub fn discovery_url(auth_host: &str, realm: &str) -> Result<Url, AuthError> {
        let base = auth_host.trim_end_matches('/');
        Ok(Url::parse(&format!(
            "{base}/auth/realms/{realm}/.well-known/openid-configuration"
        ))?)
    }

    /// Fetch provider metadata and build the client configuration.
    pub async fn discover(settings: &Settings) -> Result<Self, AuthError> {
        let url = Self::discovery_url(&settings.auth_host, &settings.oidc_realm)?;
        tracing::debug!(url = %url, "Fetching OIDC provider metadata");

        let metadata = reqwest::get(url)
            .await?
            .error_for_status()?
            .json::<ProviderMetadata>()
            .await?;
        tracing::info!(issuer = %metadata.issuer, "OIDC provider discovered");

        Ok(Self::from_metadata(settings, metadata))
    }

    pub fn from_metadata(settings: &Settings, provider: ProviderMetadata) -> Self {
        Self {
            provider,
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            redirect_url: settings.callback_url.clone(),
            scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Authorization-code request URL carrying `state`.
    pub fn authorization_url(&self, state: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse(&self.provider.authorization_endpoint)?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", state);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ProviderMetadata {
        serde_json::from_value(serde_json::json!({
            "issuer": "https://id.example.com/auth/realms/demo",
            "authorization_endpoint": "https://id.example.com/auth/realms/demo/protocol/openid-connect/auth",
            "token_endpoint": "https://id.example.com/auth/realms/demo/protocol/openid-connect/token",
            "response_types_supported": ["code"]
        }))
        .unwrap()
    }

    #[test]
    fn test_discovery_url() {
        let url = AuthConfig::discovery_url("https://id.example.com/", "demo").unwrap();
        assert_eq!(
            url.as_str(),
            "https://id.example.com/auth/realms/demo/.well-known/openid-configuration"
        );
        assert!(AuthConfig::discovery_url("", "demo").is_err());
    }

    #[test]
    fn test_authorization_url_carries_client_and_state() {
        let settings = Settings {
            client_id: "family".to_string(),
            callback_url: "http://localhost:8088/auth/callback".to_string(),
            ..Settings::default()
        };
        let auth = AuthConfig::from_metadata(&settings, metadata());
        let url = auth.authorization_url("xyz").unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".into(), "family".into())));
        assert!(pairs.contains(&("state".into(), "xyz".into())));
        assert!(pairs.contains(&("scope".into(), "openid profile email".into())));
        assert!(pairs.contains(&(
            "redirect_uri".into(),
            "http://localhost:8088/auth/callback".into()
        )));
        assert!(url.path().ends_with("/openid-connect/auth"));
    }
}
