//! Error types for the Gmail filters MCP server
//!
//! Three failure kinds reach a tool caller: schema validation, semantic
//! preconditions checked inside a handler, and upstream Gmail failures.

use std::fmt;

use thiserror::Error;

/// Main error type for the server
#[derive(Error, Debug)]
pub enum GmailMcpError {
    /// OAuth authentication errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Gmail API errors
    #[error("Gmail API error: {0}")]
    Gmail(#[from] GmailApiError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// OAuth authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("OAuth keys file not found: {path}. Download it from Google Cloud Console")]
    KeysFileNotFound { path: String },

    #[error("Invalid OAuth keys format: expected 'installed' or 'web' credentials")]
    InvalidKeysFormat,

    #[error("Token file not found: {path}. Run the 'auth' command first")]
    TokenNotFound { path: String },

    #[error("Failed to refresh access token: {message}")]
    TokenRefreshFailed { message: String },

    #[error("OAuth callback error: {message}")]
    CallbackError { message: String },

    #[error("No authorization code provided")]
    NoAuthCode,

    #[error("Token exchange failed: {message}")]
    TokenExchangeFailed { message: String },

    #[error("No OAuth configuration available")]
    NotConfigured,
}

/// Failures reported by the Gmail API
#[derive(Error, Debug)]
pub enum GmailApiError {
    #[error("{resource} not found ({id}): {message}")]
    NotFound {
        resource: &'static str,
        id: String,
        message: String,
    },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    #[error("Request failed ({status}): {message}")]
    RequestFailed { status: u16, message: String },
}

impl GmailApiError {
    /// Gmail's own description of the failure
    pub fn message(&self) -> &str {
        match self {
            GmailApiError::NotFound { message, .. }
            | GmailApiError::PermissionDenied { message }
            | GmailApiError::RateLimited { message }
            | GmailApiError::RequestFailed { message, .. } => message,
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found: {path}")]
    DirNotFound { path: String },

    #[error("Failed to create config directory: {path}")]
    DirCreationFailed { path: String },

    #[error("Invalid value for {var}: {value}")]
    InvalidEnvVar { var: String, value: String },
}

/// A single schema violation at a dotted field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub path: String,
    pub message: String,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Validation errors, raised before any upstream call
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid arguments for tool {tool}: {}", join_issues(.issues))]
    Schema { tool: String, issues: Vec<FieldIssue> },

    #[error("{message}")]
    Precondition { message: String },
}

impl ValidationError {
    /// Offending fields of a schema violation
    pub fn issues(&self) -> &[FieldIssue] {
        match self {
            ValidationError::Schema { issues, .. } => issues,
            ValidationError::Precondition { .. } => &[],
        }
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// MCP protocol errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Tool {name} not found")]
    UnknownTool { name: String },

    #[error("Tool {name} registered twice")]
    DuplicateTool { name: String },

    #[error("Invalid tool arguments: {message}")]
    InvalidArguments { message: String },
}

impl GmailMcpError {
    /// Message shown to the tool caller: Gmail's and validation messages as-is,
    /// everything else with its kind prefix
    pub fn caller_message(&self) -> String {
        match self {
            GmailMcpError::Gmail(e) => e.message().to_string(),
            GmailMcpError::Validation(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, GmailMcpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::KeysFileNotFound {
            path: "/path/to/credentials.json".to_string(),
        };
        assert!(err.to_string().contains("/path/to/credentials.json"));
    }

    #[test]
    fn test_caller_message_keeps_gmail_text_verbatim() {
        let err: GmailMcpError = GmailApiError::RequestFailed {
            status: 400,
            message: "Filter already exists".to_string(),
        }
        .into();
        assert_eq!(err.caller_message(), "Filter already exists");
        assert!(err.to_string().contains("400"));

        let err: GmailMcpError = ValidationError::Precondition {
            message: "At least one action is required (addLabelIds or removeLabelIds).".to_string(),
        }
        .into();
        assert_eq!(
            err.caller_message(),
            "At least one action is required (addLabelIds or removeLabelIds)."
        );

        let err: GmailMcpError = AuthError::NoAuthCode.into();
        assert_eq!(err.caller_message(), "Authentication error: No authorization code provided");
    }

    #[test]
    fn test_error_conversion() {
        let gmail_err: GmailMcpError = AuthError::NoAuthCode.into();
        assert!(matches!(gmail_err, GmailMcpError::Auth(_)));
    }

    #[test]
    fn test_schema_error_lists_every_field() {
        let err = ValidationError::Schema {
            tool: "gmail_create_label".to_string(),
            issues: vec![
                FieldIssue {
                    path: "name".to_string(),
                    message: "is required".to_string(),
                },
                FieldIssue {
                    path: "messageListVisibility".to_string(),
                    message: "must be one of: show, hide".to_string(),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.contains("gmail_create_label"));
        assert!(text.contains("name: is required"));
        assert!(text.contains("messageListVisibility: must be one of: show, hide"));
        assert_eq!(err.issues().len(), 2);
    }

    #[test]
    fn test_precondition_message_is_verbatim() {
        let err = ValidationError::Precondition {
            message: "At least one action is required (addLabelIds or removeLabelIds).".into(),
        };
        assert_eq!(
            err.to_string(),
            "At least one action is required (addLabelIds or removeLabelIds)."
        );
    }
}
