//! Dispatch runtime
//!
//! Looks a tool up, checks the raw arguments against its schema and runs the
//! handler with the normalized arguments. Handler errors pass through untouched.

use serde_json::{Map, Value};

use crate::error::{GmailMcpError, McpError, Result, ValidationError};
use crate::gmail::ClientAccessor;
use crate::mcp::catalog::{Catalog, ToolOutput};
use crate::mcp::types::Tool;

/// Runs tool calls against a fixed catalog and a shared client handle
pub struct Dispatcher {
    catalog: Catalog,
    clients: ClientAccessor,
}

impl Dispatcher {
    pub fn new(catalog: Catalog, clients: ClientAccessor) -> Self {
        Self { catalog, clients }
    }

    /// Entries for `tools/list`
    pub fn list_tools(&self) -> Vec<Tool> {
        self.catalog.list_tools()
    }

    /// Invoke `name` with `arguments`.
    ///
    /// Fails with [`McpError::UnknownTool`] for a name the catalog doesn't know and
    /// with [`ValidationError::Schema`] before the handler runs when the arguments
    /// don't match. Absent arguments are treated as an empty object.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> Result<ToolOutput> {
        let tool = self.catalog.get(name).ok_or_else(|| {
            GmailMcpError::Mcp(McpError::UnknownTool {
                name: name.to_string(),
            })
        })?;

        let arguments = match arguments {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        let arguments = tool.input_schema.validate(&arguments).map_err(|issues| {
            tracing::debug!(tool = tool.name, "Rejected arguments: {:?}", issues);
            GmailMcpError::Validation(ValidationError::Schema {
                tool: tool.name.to_string(),
                issues,
            })
        })?;

        tracing::debug!(tool = tool.name, "Dispatching tool call");
        let result = (tool.handler)(&self.clients, arguments).await;
        match &result {
            Ok(_) => tracing::debug!(tool = tool.name, "Tool call finished"),
            Err(e) => tracing::warn!(tool = tool.name, "Tool call failed: {}", e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::error::GmailApiError;
    use crate::gmail::types::{CreateLabelRequest, Filter, FilterAction, FilterCriteria, Label};
    use crate::gmail::MailboxApi;
    use crate::mcp::catalog::build_catalog;

    /// In-memory mailbox that records every call it receives
    #[derive(Default)]
    struct RecordingMailbox {
        calls: Mutex<Vec<String>>,
        labels: Mutex<Vec<Label>>,
        filters: Mutex<Vec<Filter>>,
        /// Subjects whose create_filter call fails
        failing_subjects: Vec<String>,
    }

    impl RecordingMailbox {
        fn with_labels(labels: Vec<Label>) -> Self {
            Self {
                labels: Mutex::new(labels),
                ..Default::default()
            }
        }

        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn label(id: &str, name: &str, label_type: &str) -> Label {
        Label {
            id: id.to_string(),
            name: name.to_string(),
            label_type: Some(label_type.to_string()),
            message_list_visibility: None,
            label_list_visibility: None,
        }
    }

    fn not_found(resource: &'static str, id: &str) -> GmailMcpError {
        GmailMcpError::Gmail(GmailApiError::NotFound {
            resource,
            id: id.to_string(),
            message: "Requested entity was not found.".to_string(),
        })
    }

    #[async_trait]
    impl MailboxApi for RecordingMailbox {
        async fn list_labels(&self) -> Result<Vec<Label>> {
            self.record("list_labels");
            Ok(self.labels.lock().unwrap().clone())
        }

        async fn create_label(&self, request: &CreateLabelRequest) -> Result<Label> {
            self.record("create_label");
            let mut labels = self.labels.lock().unwrap();
            let created = label(&format!("Label_{}", labels.len() + 1), &request.name, "user");
            labels.push(created.clone());
            Ok(created)
        }

        async fn delete_label(&self, label_id: &str) -> Result<()> {
            self.record("delete_label");
            let mut labels = self.labels.lock().unwrap();
            let before = labels.len();
            labels.retain(|l| l.id != label_id);
            if labels.len() == before {
                return Err(not_found("Label", label_id));
            }
            Ok(())
        }

        async fn list_filters(&self) -> Result<Vec<Filter>> {
            self.record("list_filters");
            Ok(self.filters.lock().unwrap().clone())
        }

        async fn create_filter(&self, criteria: &FilterCriteria, action: &FilterAction) -> Result<Filter> {
            self.record("create_filter");
            if let Some(subject) = &criteria.subject {
                if self.failing_subjects.contains(subject) {
                    return Err(GmailMcpError::Gmail(GmailApiError::RequestFailed {
                        status: 400,
                        message: "Filter already exists".to_string(),
                    }));
                }
            }
            let mut filters = self.filters.lock().unwrap();
            let created = Filter {
                id: Some(format!("filter-{}", filters.len() + 1)),
                criteria: criteria.clone(),
                action: action.clone(),
            };
            filters.push(created.clone());
            Ok(created)
        }

        async fn delete_filter(&self, filter_id: &str) -> Result<()> {
            self.record("delete_filter");
            Err(not_found("Filter", filter_id))
        }
    }

    fn dispatcher(mailbox: Arc<RecordingMailbox>) -> Dispatcher {
        Dispatcher::new(build_catalog().unwrap(), ClientAccessor::with_client(mailbox))
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let mailbox = Arc::new(RecordingMailbox::default());
        let err = dispatcher(mailbox.clone())
            .dispatch("send_email", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, GmailMcpError::Mcp(McpError::UnknownTool { .. })));
        assert!(mailbox.calls().is_empty());
    }

    #[tokio::test]
    async fn test_schema_violation_names_fields() {
        let mailbox = Arc::new(RecordingMailbox::default());
        let err = dispatcher(mailbox.clone())
            .dispatch("create_label", json!({"messageListVisibility": "sometimes"}))
            .await
            .unwrap_err();

        let GmailMcpError::Validation(validation) = &err else {
            panic!("expected validation error, got {:?}", err);
        };
        let paths: Vec<&str> = validation.issues().iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["name", "messageListVisibility"]);
        assert!(mailbox.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_filter_without_criteria_or_action_makes_no_calls() {
        let mailbox = Arc::new(RecordingMailbox::default());
        let err = dispatcher(mailbox.clone())
            .dispatch("gmail_create_filter", json!({}))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GmailMcpError::Validation(ValidationError::Precondition { .. })
        ));
        assert!(err.to_string().contains("At least one filter criteria is required"));
        assert!(mailbox.calls().is_empty());
    }

    #[tokio::test]
    async fn test_false_has_attachment_is_a_criterion() {
        let mailbox = Arc::new(RecordingMailbox::default());
        let output = dispatcher(mailbox.clone())
            .dispatch(
                "create_filter",
                json!({"hasAttachment": false, "addLabelIds": ["STARRED"]}),
            )
            .await
            .unwrap();

        assert_eq!(mailbox.calls(), vec!["create_filter"]);
        assert_eq!(output.structured["criteria"], json!({"hasAttachment": false}));
        assert!(output.text.contains("- Criteria: hasAttachment: false"));
    }

    #[tokio::test]
    async fn test_false_has_attachment_alone_fails_on_actions() {
        let mailbox = Arc::new(RecordingMailbox::default());
        let err = dispatcher(mailbox.clone())
            .dispatch("create_filter", json!({"hasAttachment": false}))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("At least one action is required"));
        assert!(mailbox.calls().is_empty());
    }

    #[tokio::test]
    async fn test_list_labels_partitions_by_type() {
        let mailbox = Arc::new(RecordingMailbox::with_labels(vec![
            label("INBOX", "INBOX", "system"),
            label("Label_1", "Work", "user"),
            label("SPAM", "SPAM", "system"),
            label("Label_2", "Receipts", "user"),
            label("TRASH", "TRASH", "system"),
        ]));
        let output = dispatcher(mailbox).dispatch("list_labels", Value::Null).await.unwrap();

        assert!(output.text.contains("## User Labels (2)"));
        assert!(output.text.contains("## System Labels (3)"));

        let labels = output.structured["labels"].as_array().unwrap();
        assert_eq!(labels.len(), 5);
        let user = labels.iter().filter(|l| l["type"] == "user").count();
        let system = labels.iter().filter(|l| l["type"] == "system").count();
        assert_eq!((user, system), (2, 3));
    }

    #[tokio::test]
    async fn test_bulk_isolates_item_failures() {
        let mailbox = Arc::new(RecordingMailbox {
            failing_subjects: vec!["second".to_string()],
            ..Default::default()
        });
        let item = |name: &str, subject: &str| {
            json!({
                "name": name,
                "criteria": {"subject": subject},
                "action": {"addLabelIds": ["STARRED"]}
            })
        };

        let output = dispatcher(mailbox.clone())
            .dispatch(
                "bulk_create_filters",
                json!({"filters": [item("one", "first"), item("two", "second"), item("three", "third")]}),
            )
            .await
            .unwrap();

        assert_eq!(mailbox.calls().len(), 3);
        assert_eq!(output.structured["succeeded"], 2);
        assert_eq!(output.structured["failed"], 1);

        let results = output.structured["results"].as_array().unwrap();
        let names: Vec<&str> = results.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["one", "two", "three"]);
        assert_eq!(results[1]["success"], false);
        assert_eq!(results[1]["error"], "Filter already exists");
        assert_eq!(results[2]["id"], "filter-2");
        assert!(output.text.contains("✅ 2 created, ❌ 1 failed"));
    }

    #[tokio::test]
    async fn test_reserved_label_ids_reach_gmail_unchanged() {
        let mailbox = Arc::new(RecordingMailbox::default());
        dispatcher(mailbox.clone())
            .dispatch(
                "create_filter",
                json!({
                    "query": "unsubscribe",
                    "addLabelIds": ["SPAM", "TRASH", "STARRED"],
                    "removeLabelIds": ["INBOX", "UNREAD"]
                }),
            )
            .await
            .unwrap();

        let filters = mailbox.filters.lock().unwrap().clone();
        assert_eq!(filters.len(), 1);
        assert_eq!(
            filters[0].action.add_label_ids,
            Some(vec!["SPAM".to_string(), "TRASH".to_string(), "STARRED".to_string()])
        );
        assert_eq!(
            filters[0].action.remove_label_ids,
            Some(vec!["INBOX".to_string(), "UNREAD".to_string()])
        );
    }

    #[tokio::test]
    async fn test_bulk_passes_items_through_unchecked() {
        let mailbox = Arc::new(RecordingMailbox::default());
        let output = dispatcher(mailbox.clone())
            .dispatch(
                "bulk_create_filters",
                json!({"filters": [{"name": "bare", "criteria": {}, "action": {}}]}),
            )
            .await
            .unwrap();

        assert_eq!(mailbox.calls(), vec!["create_filter"]);
        assert_eq!(output.structured["succeeded"], 1);
    }

    #[tokio::test]
    async fn test_lists_are_stable() {
        let mailbox = Arc::new(RecordingMailbox::with_labels(vec![
            label("Label_1", "Work", "user"),
            label("INBOX", "INBOX", "system"),
        ]));
        let dispatcher = dispatcher(mailbox);
        dispatcher
            .dispatch("create_filter", json!({"from": "a@example.com", "removeLabelIds": ["INBOX"]}))
            .await
            .unwrap();

        for tool in ["list_labels", "list_filters"] {
            let first = dispatcher.dispatch(tool, json!({})).await.unwrap();
            let second = dispatcher.dispatch(tool, json!({})).await.unwrap();
            assert_eq!(first, second);
        }
    }

    #[tokio::test]
    async fn test_not_found_propagates() {
        let mailbox = Arc::new(RecordingMailbox::default());
        let dispatcher = dispatcher(mailbox);

        let err = dispatcher
            .dispatch("delete_label", json!({"labelId": "Label_404"}))
            .await
            .unwrap_err();
        assert!(matches!(err, GmailMcpError::Gmail(GmailApiError::NotFound { ref id, .. }) if id == "Label_404"));

        let err = dispatcher
            .dispatch("delete_filter", json!({"filterId": "nope"}))
            .await
            .unwrap_err();
        assert!(matches!(err, GmailMcpError::Gmail(GmailApiError::NotFound { resource: "Filter", .. })));
    }

    #[tokio::test]
    async fn test_created_label_appears_in_list() {
        let mailbox = Arc::new(RecordingMailbox::with_labels(vec![label("INBOX", "INBOX", "system")]));
        let dispatcher = dispatcher(mailbox);

        dispatcher
            .dispatch("create_label", json!({"name": "Work/Invoices"}))
            .await
            .unwrap();
        let output = dispatcher.dispatch("list_labels", json!({})).await.unwrap();

        let labels = output.structured["labels"].as_array().unwrap();
        assert!(labels
            .iter()
            .any(|l| l["name"] == "Work/Invoices" && l["type"] == "user"));
        assert!(output.text.contains("- **Work/Invoices**"));
    }
}
