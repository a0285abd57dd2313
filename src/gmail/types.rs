//! Gmail API type definitions
//!
//! These types mirror the Gmail labels and settings/filters resources.

use serde::{Deserialize, Serialize};

/// A Gmail label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    /// Label ID
    pub id: String,

    /// Label name, "/" separates nesting levels
    pub name: String,

    /// Label type (system or user)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub label_type: Option<String>,

    /// Message list visibility
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_list_visibility: Option<String>,

    /// Label list visibility
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_list_visibility: Option<String>,
}

impl Label {
    pub fn is_user(&self) -> bool {
        self.label_type.as_deref() == Some(label_types::USER)
    }

    pub fn is_system(&self) -> bool {
        self.label_type.as_deref() == Some(label_types::SYSTEM)
    }
}

/// Values of a label's `type` field
pub mod label_types {
    pub const USER: &str = "user";
    pub const SYSTEM: &str = "system";
}

/// List of labels response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelList {
    #[serde(default)]
    pub labels: Vec<Label>,
}

/// Visibility of a label's messages in the message list
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageListVisibility {
    #[default]
    Show,
    Hide,
}

/// Visibility of a label in the label list
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum LabelListVisibility {
    #[default]
    #[serde(rename = "labelShow")]
    Show,
    #[serde(rename = "labelShowIfUnread")]
    ShowIfUnread,
    #[serde(rename = "labelHide")]
    Hide,
}

/// Request to create a label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLabelRequest {
    pub name: String,
    pub message_list_visibility: MessageListVisibility,
    pub label_list_visibility: LabelListVisibility,
}

/// Gmail filter criteria
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    /// Sender to match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Recipient to match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    /// Subject substring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Free-text search query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_attachment: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_chats: Option<bool>,

    // Read back from filters created elsewhere; the tools never set these.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negated_query: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_comparison: Option<String>,
}

/// Gmail filter action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterAction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_label_ids: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_label_ids: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward: Option<String>,
}

/// A Gmail filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Filter ID, assigned by Gmail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub criteria: FilterCriteria,

    #[serde(default)]
    pub action: FilterAction,
}

/// List of filters response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterList {
    #[serde(default)]
    pub filter: Vec<Filter>,
}

/// Error body returned by Google APIs
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: u16,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub status: Option<String>,
}
