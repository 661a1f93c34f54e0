use std::path::PathBuf;

use url::Url;

use crate::api::ApiClient;
use crate::error::Error;
use crate::oauth::{AuthClient, OAuthConfig};
use crate::storage::FileStorage;

const DEFAULT_STORAGE_PATH: &str = ".spendbook/session.json";

/// Application configuration.
///
/// Required OAuth fields are constructor parameters. Use
/// [`from_env()`](Config::from_env) for convention-based setup.
#[derive(Debug, Clone)]
pub struct Config {
    oauth: OAuthConfig,
    api_base_url: Option<Url>,
    storage_path: PathBuf,
}

impl Config {
    /// Config with no API backend and the default session file.
    #[must_use]
    pub fn new(oauth: OAuthConfig) -> Self {
        Self {
            oauth,
            api_base_url: None,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `COGNITO_CLIENT_ID`: app client ID
    /// - `COGNITO_DOMAIN`: hosted UI domain, e.g. `myapp.auth.ap-northeast-1.amazoncognito.com`
    /// - `COGNITO_REDIRECT_URI`: callback URI (must be a valid URL)
    ///
    /// # Optional env vars
    /// - `COGNITO_LOGOUT_URI`: post-logout landing page (default: `/login` on the redirect origin)
    /// - `COGNITO_SCOPES`: comma-separated scopes
    /// - `API_BASE_URL`: expense backend base URL
    /// - `SPENDBOOK_STORAGE`: session file path (default: `.spendbook/session.json`)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required env vars are missing or URLs are invalid.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required variables are missing or URLs are invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::Config(format!("{key} is required")))
        };
        let parse_url = |key: &str, value: &str| {
            value
                .parse::<Url>()
                .map_err(|e| Error::Config(format!("{key}: {e}")))
        };

        let client_id = required("COGNITO_CLIENT_ID")?;
        let domain = required("COGNITO_DOMAIN")?;
        let redirect_uri = parse_url("COGNITO_REDIRECT_URI", &required("COGNITO_REDIRECT_URI")?)?;

        let mut oauth = OAuthConfig::new(client_id, &domain, redirect_uri)?;
        if let Some(value) = lookup("COGNITO_LOGOUT_URI") {
            oauth = oauth.with_logout_uri(parse_url("COGNITO_LOGOUT_URI", &value)?);
        }
        if let Some(scopes) = lookup("COGNITO_SCOPES") {
            oauth = oauth.with_scopes(
                scopes
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }

        let mut config = Self::new(oauth);
        if let Some(value) = lookup("API_BASE_URL") {
            config = config.with_api_base_url(parse_url("API_BASE_URL", &value)?);
        }
        if let Some(path) = lookup("SPENDBOOK_STORAGE") {
            config = config.with_storage_path(path);
        }
        Ok(config)
    }

    /// Expense backend base URL.
    #[must_use]
    pub fn with_api_base_url(mut self, url: Url) -> Self {
        self.api_base_url = Some(url);
        self
    }

    /// Session file location.
    #[must_use]
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = path.into();
        self
    }

    #[must_use]
    pub fn oauth(&self) -> &OAuthConfig {
        &self.oauth
    }

    #[must_use]
    pub fn api_base_url(&self) -> Option<&Url> {
        self.api_base_url.as_ref()
    }

    #[must_use]
    pub fn storage_path(&self) -> &std::path::Path {
        &self.storage_path
    }

    /// `OAuth2` client for this config's hosted UI.
    #[must_use]
    pub fn auth_client(&self) -> AuthClient {
        AuthClient::new(self.oauth.clone())
    }

    /// # Errors
    ///
    /// Returns [`Error::Config`] if no API base URL is configured.
    pub fn api_client(&self) -> Result<ApiClient, Error> {
        self.api_base_url
            .clone()
            .map(ApiClient::new)
            .ok_or_else(|| Error::Config("API_BASE_URL is required".into()))
    }

    /// File storage at [`storage_path`](Self::storage_path).
    #[must_use]
    pub fn storage(&self) -> FileStorage {
        FileStorage::new(&self.storage_path)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("COGNITO_CLIENT_ID", "client-1"),
        ("COGNITO_DOMAIN", "spendbook.auth.ap-northeast-1.amazoncognito.com"),
        ("COGNITO_REDIRECT_URI", "http://localhost:8976/callback"),
    ];

    #[test]
    fn required_vars_only() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();

        assert_eq!(config.oauth().client_id(), "client-1");
        assert_eq!(
            config.oauth().token_url().as_str(),
            "https://spendbook.auth.ap-northeast-1.amazoncognito.com/oauth2/token"
        );
        assert!(config.api_base_url().is_none());
        assert!(config.api_client().is_err());
        assert_eq!(config.storage_path(), std::path::Path::new(DEFAULT_STORAGE_PATH));
    }

    #[test]
    fn missing_required_var_is_reported() {
        let err = Config::from_lookup(lookup_from(&REQUIRED[..2])).unwrap_err();
        assert!(err.to_string().contains("COGNITO_REDIRECT_URI"));

        let mut blank = REQUIRED.to_vec();
        blank[0].1 = "  ";
        let err = Config::from_lookup(lookup_from(&blank)).unwrap_err();
        assert!(err.to_string().contains("COGNITO_CLIENT_ID"));
    }

    #[test]
    fn optional_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("COGNITO_LOGOUT_URI", "http://localhost:8976/bye"),
            ("COGNITO_SCOPES", "openid, email"),
            ("API_BASE_URL", "https://api.example.com/prod"),
            ("SPENDBOOK_STORAGE", "/tmp/sb.json"),
        ]);
        let config = Config::from_lookup(lookup_from(&vars)).unwrap();

        assert_eq!(config.oauth().logout_uri().as_str(), "http://localhost:8976/bye");
        assert_eq!(config.oauth().scopes(), &["openid", "email"]);
        assert_eq!(
            config.api_client().unwrap().base_url().as_str(),
            "https://api.example.com/prod"
        );
        assert_eq!(config.storage().path(), std::path::Path::new("/tmp/sb.json"));
    }

    #[test]
    fn invalid_url_is_a_config_error() {
        let mut vars = REQUIRED.to_vec();
        vars[2].1 = "not a url";
        assert!(matches!(
            Config::from_lookup(lookup_from(&vars)),
            Err(Error::Config(_))
        ));
    }
}
