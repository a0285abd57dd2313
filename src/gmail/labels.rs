//! Label management for Gmail

use crate::error::Result;
use crate::gmail::client::error_from_response;
use crate::gmail::types::{CreateLabelRequest, Label, LabelList};

/// Label manager for Gmail operations
pub struct LabelManager<'a> {
    client: &'a reqwest::Client,
    base_url: &'a str,
    access_token: &'a str,
}

impl<'a> LabelManager<'a> {
    /// Create a new label manager
    pub fn new(client: &'a reqwest::Client, base_url: &'a str, access_token: &'a str) -> Self {
        Self {
            client,
            base_url,
            access_token,
        }
    }

    fn labels_url(&self) -> String {
        format!(
            "{}/users/{}/labels",
            self.base_url,
            crate::config::gmail::USER_ID
        )
    }

    /// List all labels, in the order Gmail returns them
    pub async fn list(&self) -> Result<Vec<Label>> {
        let response = self
            .client
            .get(self.labels_url())
            .bearer_auth(self.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, "Labels", None).await);
        }

        let label_list: LabelList = response.json().await?;
        Ok(label_list.labels)
    }

    /// Create a new label
    pub async fn create(&self, request: &CreateLabelRequest) -> Result<Label> {
        let response = self
            .client
            .post(self.labels_url())
            .bearer_auth(self.access_token)
            .json(request)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(error_from_response(response, "Label", Some(&request.name)).await)
        }
    }

    /// Delete a label. Gmail refuses system labels; that refusal is returned as-is.
    pub async fn delete(&self, label_id: &str) -> Result<()> {
        let url = format!("{}/{}", self.labels_url(), urlencoding::encode(label_id));

        let response = self
            .client
            .delete(&url)
            .bearer_auth(self.access_token)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response, "Label", Some(label_id)).await)
        }
    }
}
