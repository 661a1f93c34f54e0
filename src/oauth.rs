use serde::Deserialize;
use url::Url;

use crate::error::Error;

const DEFAULT_SCOPES: [&str; 3] = ["openid", "email", "profile"];
const DEFAULT_IDENTITY_PROVIDER: &str = "Google";

/// `OAuth2` settings for the Cognito hosted UI.
///
/// Endpoints are derived from the user-pool domain; each can be overridden,
/// which is mostly useful for pointing the client at a local fake.
///
/// ```rust,ignore
/// use spendbook::OAuthConfig;
///
/// let config = OAuthConfig::new(
///     "my-client-id",
///     "spendbook.auth.ap-northeast-1.amazoncognito.com",
///     "http://localhost:5173/callback".parse()?,
/// )?;
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) client_id: String,
    pub(crate) auth_url: Url,
    pub(crate) token_url: Url,
    pub(crate) logout_url: Url,
    pub(crate) redirect_uri: Url,
    pub(crate) logout_uri: Url,
    pub(crate) scopes: Vec<String>,
    pub(crate) identity_provider: String,
}

impl OAuthConfig {
    /// Create a configuration for the hosted UI served at `domain`.
    ///
    /// The post-logout landing page defaults to `/login` on the redirect URI's origin.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `domain` is empty or does not form valid endpoint URLs.
    pub fn new(
        client_id: impl Into<String>,
        domain: &str,
        redirect_uri: Url,
    ) -> Result<Self, Error> {
        let domain = domain.trim().trim_end_matches('/');
        if domain.is_empty() || domain.contains('/') {
            return Err(Error::Config(format!("invalid identity provider domain: {domain:?}")));
        }
        let endpoint = |path: &str| {
            Url::parse(&format!("https://{domain}{path}"))
                .map_err(|e| Error::Config(format!("{domain}{path}: {e}")))
        };
        let logout_uri = redirect_uri
            .join("/login")
            .map_err(|e| Error::Config(format!("logout URI: {e}")))?;

        Ok(Self {
            client_id: client_id.into(),
            auth_url: endpoint("/oauth2/authorize")?,
            token_url: endpoint("/oauth2/token")?,
            logout_url: endpoint("/logout")?,
            redirect_uri,
            logout_uri,
            scopes: DEFAULT_SCOPES.iter().map(|s| (*s).to_string()).collect(),
            identity_provider: DEFAULT_IDENTITY_PROVIDER.into(),
        })
    }

    /// Override the authorization endpoint.
    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    /// Override the token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    /// Override the provider logout endpoint.
    #[must_use]
    pub fn with_logout_url(mut self, url: Url) -> Self {
        self.logout_url = url;
        self
    }

    /// Where the provider sends the browser after a provider-side logout.
    #[must_use]
    pub fn with_logout_uri(mut self, url: Url) -> Self {
        self.logout_uri = url;
        self
    }

    /// Override the scopes (default: `["openid", "email", "profile"]`).
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Override the `identity_provider` hint (default: `Google`).
    #[must_use]
    pub fn with_identity_provider(mut self, provider: impl Into<String>) -> Self {
        self.identity_provider = provider.into();
        self
    }

    /// App client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Authorization endpoint URL.
    #[must_use]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    /// Token endpoint URL.
    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// Provider logout endpoint URL.
    #[must_use]
    pub fn logout_url(&self) -> &Url {
        &self.logout_url
    }

    /// Registered callback URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// Post-logout landing page.
    #[must_use]
    pub fn logout_uri(&self) -> &Url {
        &self.logout_uri
    }

    /// Requested scopes.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Upstream identity provider hint.
    #[must_use]
    pub fn identity_provider(&self) -> &str {
        &self.identity_provider
    }
}

/// `OAuth2` client for the hosted UI endpoints.
#[derive(Debug, Clone)]
pub struct AuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

/// Token response from the hosted UI token endpoint.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    pub id_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl AuthClient {
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the authorization URL.
    ///
    /// Deterministic: the same configuration always yields the same URL.
    #[must_use]
    pub fn authorization_url(&self) -> Url {
        let scope = self.config.scopes.join(" ");

        let mut url = self.config.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("scope", &scope)
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("identity_provider", &self.config.identity_provider);
        url
    }

    /// Build the provider logout URL.
    #[must_use]
    pub fn logout_url(&self) -> Url {
        let mut url = self.config.logout_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("logout_uri", self.config.logout_uri.as_str());
        url
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, [`Error::OAuth`] if the token
    /// endpoint answers with a non-success status, or [`Error::TokenParse`] if
    /// the body is not a token response.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, Error> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let response = self
            .http
            .post(self.config.token_url.clone())
            .form(&params)
            .send()
            .await?;

        let response = Self::ensure_success(response, "token exchange").await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::TokenParse(format!("token response: {e}")))
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(Error::OAuth {
            operation,
            status: Some(status),
            detail: body,
        })
    }
}
