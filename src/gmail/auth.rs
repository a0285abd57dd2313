//! OAuth authentication for the Gmail API
//!
//! Handles:
//! - Loading client credentials
//! - Interactive browser-based consent
//! - Token storage and refresh

use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::error::{AuthError, GmailMcpError, Result};
use crate::gmail::client::TokenSource;

/// Refresh when the access token expires within this window
const REFRESH_MARGIN_MS: i64 = 5 * 60 * 1000;

/// OAuth client credentials
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthKeys {
    pub client_id: String,
    pub client_secret: String,

    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,

    #[serde(default = "default_token_uri")]
    pub token_uri: String,

    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// OAuth keys file format, either "installed" or "web"
#[derive(Debug, Deserialize)]
struct OAuthKeysFile {
    installed: Option<OAuthKeys>,
    web: Option<OAuthKeys>,
}

/// Stored tokens, in the layout Google client libraries write to token.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Expiry timestamp (Unix milliseconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,

    #[serde(default)]
    pub scope: String,

    /// Fields we don't interpret (id_token, ...), kept across refreshes
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl StoredCredentials {
    fn needs_refresh(&self, now_ms: i64) -> bool {
        match self.expiry_date {
            Some(expiry) => expiry - now_ms < REFRESH_MARGIN_MS,
            None => false,
        }
    }

    /// Overlay a token endpoint response, keeping what the response omits
    fn merged_with(&self, response: TokenResponse, now_ms: i64) -> Self {
        let mut merged = self.clone();
        merged.access_token = response.access_token;
        if response.refresh_token.is_some() {
            merged.refresh_token = response.refresh_token;
        }
        if let Some(token_type) = response.token_type {
            merged.token_type = token_type;
        }
        if merged.token_type.is_empty() {
            merged.token_type = default_token_type();
        }
        if let Some(scope) = response.scope {
            merged.scope = scope;
        }
        merged.expiry_date = response.expires_in.map(|secs| now_ms + secs * 1000);
        merged.extra.extend(response.extra);
        merged
    }
}

/// Token response from OAuth token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// OAuth authenticator
pub struct Authenticator {
    config: Config,
    http_client: reqwest::Client,
    keys: OAuthKeys,
    credentials: Arc<RwLock<Option<StoredCredentials>>>,
}

impl Authenticator {
    /// Load client keys and any stored token
    pub async fn new(config: Config) -> Result<Self> {
        config.find_and_copy_oauth_keys()?;

        let keys = load_oauth_keys(&config.oauth_path)?;

        let credentials = if config.token_exists() {
            match load_credentials(&config.token_path).await {
                Ok(creds) => Some(creds),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable token file: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self::from_parts(config, keys, credentials))
    }

    /// Assemble an authenticator from already-loaded pieces
    pub fn from_parts(config: Config, keys: OAuthKeys, credentials: Option<StoredCredentials>) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
            keys,
            credentials: Arc::new(RwLock::new(credentials)),
        }
    }

    /// Check if we hold a token
    pub async fn is_authenticated(&self) -> bool {
        self.credentials.read().await.is_some()
    }

    /// Get a valid access token, refreshing if necessary
    pub async fn get_access_token(&self) -> Result<String> {
        let current = self.credentials.read().await.clone();

        match current {
            Some(creds) if creds.needs_refresh(now_millis()) => self.refresh(creds).await,
            Some(creds) => Ok(creds.access_token),
            None => Err(GmailMcpError::Auth(AuthError::TokenNotFound {
                path: self.config.token_path.display().to_string(),
            })),
        }
    }

    async fn refresh(&self, current: StoredCredentials) -> Result<String> {
        let refresh_token = current.refresh_token.clone().ok_or_else(|| {
            GmailMcpError::Auth(AuthError::TokenRefreshFailed {
                message: "No refresh token available".to_string(),
            })
        })?;

        tracing::debug!("Refreshing Gmail access token");

        let params = [
            ("client_id", self.keys.client_id.as_str()),
            ("client_secret", self.keys.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(&self.keys.token_uri)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GmailMcpError::Auth(AuthError::TokenRefreshFailed { message: text }));
        }

        let token_response: TokenResponse = response.json().await?;
        let updated = current.merged_with(token_response, now_millis());

        // Persisting is best effort; the refreshed token is usable either way
        if let Err(e) = save_credentials(&self.config.token_path, &updated).await {
            tracing::warn!(
                "Failed to persist refreshed token to {}: {}",
                self.config.token_path.display(),
                e
            );
        }

        let access_token = updated.access_token.clone();
        *self.credentials.write().await = Some(updated);
        Ok(access_token)
    }

    /// Generate the consent URL
    pub fn generate_auth_url(&self) -> String {
        let scopes = self.config.scopes.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.keys.auth_uri,
            urlencoding::encode(&self.keys.client_id),
            urlencoding::encode(&self.config.oauth_callback_url),
            urlencoding::encode(&scopes)
        )
    }

    /// Exchange an authorization code for tokens and store them
    pub async fn exchange_code(&self, code: &str) -> Result<StoredCredentials> {
        let params = [
            ("client_id", self.keys.client_id.as_str()),
            ("client_secret", self.keys.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.config.oauth_callback_url.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.keys.token_uri)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GmailMcpError::Auth(AuthError::TokenExchangeFailed { message: text }));
        }

        let token_response: TokenResponse = response.json().await?;
        let credentials = StoredCredentials::default().merged_with(token_response, now_millis());

        save_credentials(&self.config.token_path, &credentials).await?;
        *self.credentials.write().await = Some(credentials.clone());

        Ok(credentials)
    }

    /// Run the interactive consent flow with a local callback server
    pub async fn authenticate_interactive(&self) -> Result<()> {
        use axum::{extract::Query, response::Html, routing::get, Router};
        use std::collections::HashMap;
        use tokio::sync::oneshot;

        let auth_url = self.generate_auth_url();
        eprintln!("\nGmail Filters MCP - one-time authorization\n");
        eprintln!("Open this URL in your browser and grant access:");
        eprintln!("{}\n", auth_url);

        if let Err(e) = open::that(&auth_url) {
            eprintln!("Could not open browser automatically: {}", e);
            eprintln!("Please open the URL manually.");
        }

        let (tx, rx) = oneshot::channel::<String>();
        let tx = Arc::new(std::sync::Mutex::new(Some(tx)));

        let tx_clone = tx.clone();
        let callback_handler = move |Query(params): Query<HashMap<String, String>>| async move {
            match params.get("code") {
                Some(code) => {
                    if let Some(tx) = tx_clone.lock().ok().and_then(|mut guard| guard.take()) {
                        let _ = tx.send(code.clone());
                    }
                    Html("<html><body><h1>Authorization successful!</h1><p>You can close this window.</p></body></html>")
                }
                None => Html("<html><body><h1>Authorization failed</h1><p>No authorization code received.</p></body></html>"),
            }
        };

        let app = Router::new().route("/oauth2callback", get(callback_handler));

        let addr = std::net::SocketAddr::from(([127, 0, 0, 1], self.config.oauth_callback_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;

        eprintln!(
            "Waiting for the authorization callback on port {}...",
            self.config.oauth_callback_port
        );

        let server = axum::serve(listener, app);

        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    return Err(GmailMcpError::Auth(AuthError::CallbackError {
                        message: e.to_string(),
                    }));
                }
            }
            code = rx => {
                let code = code.map_err(|_| GmailMcpError::Auth(AuthError::NoAuthCode))?;
                eprintln!("Received authorization code, exchanging for tokens...");
                self.exchange_code(&code).await?;
                eprintln!("Token saved to {}", self.config.token_path.display());
            }
        }

        Ok(())
    }
}

#[async_trait]
impl TokenSource for Authenticator {
    async fn access_token(&self) -> Result<String> {
        self.get_access_token().await
    }
}

/// Load OAuth client keys
pub fn load_oauth_keys(path: &Path) -> Result<OAuthKeys> {
    if !path.exists() {
        return Err(GmailMcpError::Auth(AuthError::KeysFileNotFound {
            path: path.display().to_string(),
        }));
    }

    let content = std::fs::read_to_string(path)?;
    let keys_file: OAuthKeysFile = serde_json::from_str(&content)?;

    keys_file
        .installed
        .or(keys_file.web)
        .ok_or(GmailMcpError::Auth(AuthError::InvalidKeysFormat))
}

async fn load_credentials(path: &Path) -> Result<StoredCredentials> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

async fn save_credentials(path: &Path, credentials: &StoredCredentials) -> Result<()> {
    let content = serde_json::to_string_pretty(credentials)?;
    tokio::fs::write(path, content).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_keys_deserialize_web() {
        let json = r#"{
            "web": {
                "client_id": "web-client-id",
                "client_secret": "test-secret",
                "redirect_uris": ["http://localhost"]
            }
        }"#;

        let keys_file: OAuthKeysFile = serde_json::from_str(json).unwrap();
        let keys = keys_file.installed.or(keys_file.web).unwrap();
        assert_eq!(keys.client_id, "web-client-id");
        assert_eq!(keys.token_uri, "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn test_stored_credentials_keep_unknown_fields() {
        let json = r#"{"access_token":"a","refresh_token":"r","scope":"s","token_type":"Bearer","expiry_date":1700000000000,"id_token":"jwt"}"#;
        let creds: StoredCredentials = serde_json::from_str(json).unwrap();
        assert_eq!(creds.extra.get("id_token"), Some(&Value::from("jwt")));

        let back = serde_json::to_value(&creds).unwrap();
        assert_eq!(back["id_token"], "jwt");
        assert_eq!(back["expiry_date"], 1700000000000_i64);
    }

    #[test]
    fn test_merge_keeps_refresh_token_when_omitted() {
        let current = StoredCredentials {
            access_token: "old".to_string(),
            refresh_token: Some("refresh".to_string()),
            token_type: "Bearer".to_string(),
            expiry_date: Some(0),
            scope: "scope-a".to_string(),
            extra: Map::new(),
        };
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"new","expires_in":3600}"#).unwrap();

        let merged = current.merged_with(response, 1_000);
        assert_eq!(merged.access_token, "new");
        assert_eq!(merged.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(merged.scope, "scope-a");
        assert_eq!(merged.expiry_date, Some(1_000 + 3_600_000));
    }

    #[test]
    fn test_needs_refresh_window() {
        let creds = StoredCredentials {
            expiry_date: Some(10 * 60 * 1000),
            ..Default::default()
        };
        assert!(!creds.needs_refresh(0));
        assert!(creds.needs_refresh(6 * 60 * 1000));

        let no_expiry = StoredCredentials::default();
        assert!(!no_expiry.needs_refresh(i64::MAX));
    }
}
