//! Lazily-built, shared handle to the authorized Gmail client

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::config::Config;
use crate::error::{AuthError, GmailMcpError, Result};
use crate::gmail::auth::Authenticator;
use crate::gmail::client::{GmailClient, MailboxApi};

/// Builds the authorized client on first use and hands out the same one afterwards.
///
/// A failed initialization leaves the cell empty, so the next call tries again
/// (for example after the user has run `auth`).
pub struct ClientAccessor {
    client: OnceCell<Arc<dyn MailboxApi>>,
    config: Option<Config>,
}

impl ClientAccessor {
    /// Accessor that authorizes from the files named in `config`
    pub fn from_config(config: Config) -> Self {
        Self {
            client: OnceCell::new(),
            config: Some(config),
        }
    }

    /// Accessor seeded with an already-built client
    pub fn with_client(client: Arc<dyn MailboxApi>) -> Self {
        Self {
            client: OnceCell::new_with(Some(client)),
            config: None,
        }
    }

    /// The authorized client; fails if no stored token exists
    pub async fn get(&self) -> Result<Arc<dyn MailboxApi>> {
        let client = self
            .client
            .get_or_try_init(|| async {
                let config = self
                    .config
                    .clone()
                    .ok_or(GmailMcpError::Auth(AuthError::NotConfigured))?;
                authorized_client(config).await
            })
            .await?;
        Ok(Arc::clone(client))
    }

    pub fn is_initialized(&self) -> bool {
        self.client.initialized()
    }
}

async fn authorized_client(config: Config) -> Result<Arc<dyn MailboxApi>> {
    let base_url = config.api_base_url.clone();
    let token_path = config.token_path.display().to_string();

    let authenticator = Authenticator::new(config).await?;
    if !authenticator.is_authenticated().await {
        return Err(GmailMcpError::Auth(AuthError::TokenNotFound { path: token_path }));
    }

    tracing::info!("Gmail client initialized");
    Ok(Arc::new(GmailClient::new(Arc::new(authenticator), base_url)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::types::{CreateLabelRequest, Filter, FilterAction, FilterCriteria, Label};
    use async_trait::async_trait;

    struct EmptyMailbox;

    #[async_trait]
    impl MailboxApi for EmptyMailbox {
        async fn list_labels(&self) -> Result<Vec<Label>> {
            Ok(vec![])
        }
        async fn create_label(&self, request: &CreateLabelRequest) -> Result<Label> {
            Ok(Label {
                id: "Label_1".into(),
                name: request.name.clone(),
                label_type: Some("user".into()),
                message_list_visibility: None,
                label_list_visibility: None,
            })
        }
        async fn delete_label(&self, _label_id: &str) -> Result<()> {
            Ok(())
        }
        async fn list_filters(&self) -> Result<Vec<Filter>> {
            Ok(vec![])
        }
        async fn create_filter(&self, criteria: &FilterCriteria, action: &FilterAction) -> Result<Filter> {
            Ok(Filter {
                id: Some("f1".into()),
                criteria: criteria.clone(),
                action: action.clone(),
            })
        }
        async fn delete_filter(&self, _filter_id: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_seeded_accessor_returns_same_client() {
        let accessor = ClientAccessor::with_client(Arc::new(EmptyMailbox));
        assert!(accessor.is_initialized());

        let first = accessor.get().await.unwrap();
        let second = accessor.get().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_missing_keys_fail_and_stay_uninitialized() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::with_config_dir(dir.path().to_path_buf());
        config.oauth_path = dir.path().join("does-not-exist.json");

        let accessor = ClientAccessor::from_config(config);
        let err = accessor.get().await.err().unwrap();
        assert!(matches!(err, GmailMcpError::Auth(_)));
        assert!(!accessor.is_initialized());
    }
}
