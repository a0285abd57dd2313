//! Configuration management for the Gmail filters MCP server
//!
//! Handles paths, environment variables, and configuration loading.

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, GmailMcpError, Result};

/// File name of the OAuth client keys downloaded from Google Cloud Console
pub const OAUTH_KEYS_FILE: &str = "credentials.json";

/// File name of the stored access/refresh tokens
pub const TOKEN_FILE: &str = "token.json";

/// Configuration for the server
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for storing configuration files
    pub config_dir: PathBuf,

    /// Path to OAuth keys file (client credentials)
    pub oauth_path: PathBuf,

    /// Path to stored tokens
    pub token_path: PathBuf,

    /// OAuth callback URL
    pub oauth_callback_url: String,

    /// OAuth callback port
    pub oauth_callback_port: u16,

    /// Gmail API base URL
    pub api_base_url: String,

    /// Gmail API scopes
    pub scopes: Vec<String>,
}

impl Config {
    /// Create a configuration from the environment, creating the config directory if needed
    pub fn new() -> Result<Self> {
        let config_dir = match std::env::var("GMAIL_MCP_CONFIG_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => default_config_dir()?,
        };
        ensure_dir(&config_dir)?;

        let mut config = Self::with_config_dir(config_dir);

        if let Ok(path) = std::env::var("GMAIL_OAUTH_PATH") {
            config.oauth_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("GMAIL_TOKEN_PATH") {
            config.token_path = PathBuf::from(path);
        }
        if let Ok(port) = std::env::var("GMAIL_OAUTH_PORT") {
            let port = port.parse().map_err(|_| {
                GmailMcpError::Config(ConfigError::InvalidEnvVar {
                    var: "GMAIL_OAUTH_PORT".to_string(),
                    value: port.clone(),
                })
            })?;
            config.set_callback_port(port);
        }
        if let Ok(url) = std::env::var("GMAIL_API_BASE_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }

        Ok(config)
    }

    /// Configuration rooted at `config_dir` with default file names, port and endpoint
    pub fn with_config_dir(config_dir: PathBuf) -> Self {
        let oauth_callback_port = 3000;
        Self {
            oauth_path: config_dir.join(OAUTH_KEYS_FILE),
            token_path: config_dir.join(TOKEN_FILE),
            oauth_callback_url: callback_url(oauth_callback_port),
            oauth_callback_port,
            api_base_url: gmail::API_BASE_URL.to_string(),
            scopes: gmail::SCOPES.iter().map(|s| s.to_string()).collect(),
            config_dir,
        }
    }

    fn set_callback_port(&mut self, port: u16) {
        self.oauth_callback_port = port;
        self.oauth_callback_url = callback_url(port);
    }

    /// Check if OAuth keys file exists
    pub fn oauth_keys_exist(&self) -> bool {
        self.oauth_path.exists()
    }

    /// Check if a token file exists
    pub fn token_exists(&self) -> bool {
        self.token_path.exists()
    }

    /// Copy OAuth keys from the current directory into the config dir when missing there
    pub fn find_and_copy_oauth_keys(&self) -> Result<bool> {
        let local_oauth = std::env::current_dir()?.join(OAUTH_KEYS_FILE);

        if local_oauth.exists() && !self.oauth_keys_exist() {
            std::fs::copy(&local_oauth, &self.oauth_path)?;
            tracing::info!(
                "Copied {} into {}",
                local_oauth.display(),
                self.oauth_path.display()
            );
            return Ok(true);
        }

        Ok(false)
    }
}

fn callback_url(port: u16) -> String {
    format!("http://localhost:{}/oauth2callback", port)
}

fn default_config_dir() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .ok_or_else(|| {
            GmailMcpError::Config(ConfigError::DirNotFound {
                path: "~".to_string(),
            })
        })?
        .join(".gmail-filters-mcp"))
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|_| {
            GmailMcpError::Config(ConfigError::DirCreationFailed {
                path: dir.display().to_string(),
            })
        })?;
    }
    Ok(())
}

/// Gmail API constants
pub mod gmail {
    /// Base URL for Gmail API
    pub const API_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

    /// User ID for the authenticated user
    pub const USER_ID: &str = "me";

    /// Scopes needed to manage labels and filters
    pub const SCOPES: &[&str] = &[
        "https://www.googleapis.com/auth/gmail.settings.basic",
        "https://www.googleapis.com/auth/gmail.labels",
        "https://www.googleapis.com/auth/gmail.readonly",
    ];
}
