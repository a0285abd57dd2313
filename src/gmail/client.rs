//! Gmail API client
//!
//! `MailboxApi` is the surface the tools need: three label operations and
//! three filter operations. `GmailClient` implements it over HTTP.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{GmailApiError, GmailMcpError, Result};
use crate::gmail::filters::FilterManager;
use crate::gmail::labels::LabelManager;
use crate::gmail::types::{ApiErrorBody, CreateLabelRequest, Filter, FilterAction, FilterCriteria, Label};

/// Remote mailbox operations used by the tool handlers
#[async_trait]
pub trait MailboxApi: Send + Sync {
    async fn list_labels(&self) -> Result<Vec<Label>>;

    async fn create_label(&self, request: &CreateLabelRequest) -> Result<Label>;

    async fn delete_label(&self, label_id: &str) -> Result<()>;

    async fn list_filters(&self) -> Result<Vec<Filter>>;

    async fn create_filter(&self, criteria: &FilterCriteria, action: &FilterAction) -> Result<Filter>;

    async fn delete_filter(&self, filter_id: &str) -> Result<()>;
}

/// Source of bearer tokens for API requests
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Gmail API client
pub struct GmailClient {
    http_client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl GmailClient {
    /// Create a new Gmail client against `base_url`
    pub fn new(tokens: Arc<dyn TokenSource>, base_url: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into(),
            tokens,
        }
    }
}

#[async_trait]
impl MailboxApi for GmailClient {
    async fn list_labels(&self) -> Result<Vec<Label>> {
        let token = self.tokens.access_token().await?;
        LabelManager::new(&self.http_client, &self.base_url, &token)
            .list()
            .await
    }

    async fn create_label(&self, request: &CreateLabelRequest) -> Result<Label> {
        let token = self.tokens.access_token().await?;
        LabelManager::new(&self.http_client, &self.base_url, &token)
            .create(request)
            .await
    }

    async fn delete_label(&self, label_id: &str) -> Result<()> {
        let token = self.tokens.access_token().await?;
        LabelManager::new(&self.http_client, &self.base_url, &token)
            .delete(label_id)
            .await
    }

    async fn list_filters(&self) -> Result<Vec<Filter>> {
        let token = self.tokens.access_token().await?;
        FilterManager::new(&self.http_client, &self.base_url, &token)
            .list()
            .await
    }

    async fn create_filter(&self, criteria: &FilterCriteria, action: &FilterAction) -> Result<Filter> {
        let token = self.tokens.access_token().await?;
        FilterManager::new(&self.http_client, &self.base_url, &token)
            .create(criteria, action)
            .await
    }

    async fn delete_filter(&self, filter_id: &str) -> Result<()> {
        let token = self.tokens.access_token().await?;
        FilterManager::new(&self.http_client, &self.base_url, &token)
            .delete(filter_id)
            .await
    }
}

/// Turn a non-success response into a `GmailApiError`, keeping Gmail's own message
pub(crate) async fn error_from_response(
    response: reqwest::Response,
    resource: &'static str,
    id: Option<&str>,
) -> GmailMcpError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = upstream_message(&text);

    tracing::debug!(status, resource, "Gmail API request failed: {}", message);

    let err = match status {
        404 => GmailApiError::NotFound {
            resource,
            id: id.unwrap_or("-").to_string(),
            message,
        },
        403 => GmailApiError::PermissionDenied { message },
        429 => GmailApiError::RateLimited { message },
        _ => GmailApiError::RequestFailed { status, message },
    };
    GmailMcpError::Gmail(err)
}

fn upstream_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => parsed.error.message,
        _ => body.trim().to_string(),
    }
}
