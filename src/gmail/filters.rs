//! Filter management for Gmail

use crate::error::{GmailApiError, GmailMcpError, Result};
use crate::gmail::client::error_from_response;
use crate::gmail::types::{Filter, FilterAction, FilterCriteria, FilterList};

/// Filter manager for Gmail operations
pub struct FilterManager<'a> {
    client: &'a reqwest::Client,
    base_url: &'a str,
    access_token: &'a str,
}

impl<'a> FilterManager<'a> {
    /// Create a new filter manager
    pub fn new(client: &'a reqwest::Client, base_url: &'a str, access_token: &'a str) -> Self {
        Self {
            client,
            base_url,
            access_token,
        }
    }

    fn filters_url(&self) -> String {
        format!(
            "{}/users/{}/settings/filters",
            self.base_url,
            crate::config::gmail::USER_ID
        )
    }

    /// Create a new filter
    pub async fn create(&self, criteria: &FilterCriteria, action: &FilterAction) -> Result<Filter> {
        let filter = Filter {
            id: None,
            criteria: criteria.clone(),
            action: action.clone(),
        };

        let response = self
            .client
            .post(self.filters_url())
            .bearer_auth(self.access_token)
            .json(&filter)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(error_from_response(response, "Filter", None).await)
        }
    }

    /// List all filters
    pub async fn list(&self) -> Result<Vec<Filter>> {
        let response = self
            .client
            .get(self.filters_url())
            .bearer_auth(self.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, "Filters", None).await);
        }

        // Gmail answers with an empty body or `{}` when no filters exist
        let text = response.text().await?;
        if text.trim().is_empty() || text.trim() == "{}" {
            return Ok(Vec::new());
        }

        let filter_list: FilterList = serde_json::from_str(&text).map_err(|e| {
            GmailMcpError::Gmail(GmailApiError::RequestFailed {
                status: 200,
                message: format!("Failed to parse filter list: {}", e),
            })
        })?;

        Ok(filter_list.filter)
    }

    /// Delete a filter. Only future mail is affected.
    pub async fn delete(&self, filter_id: &str) -> Result<()> {
        let url = format!("{}/{}", self.filters_url(), urlencoding::encode(filter_id));

        let response = self
            .client
            .delete(&url)
            .bearer_auth(self.access_token)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response, "Filter", Some(filter_id)).await)
        }
    }
}
