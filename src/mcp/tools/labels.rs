//! Label tools: list, create, delete

use serde::Deserialize;
use serde_json::{json, Value};

use crate::gmail::types::{CreateLabelRequest, Label};
use crate::gmail::ClientAccessor;
use crate::mcp::catalog::{HandlerFuture, ToolDefinition, ToolOutput};
use crate::mcp::schema::{Property, Schema};

use super::{parse_args, ADDITIVE, DESTRUCTIVE, READ_ONLY};

const LIST_LABELS_DESCRIPTION: &str = "List all labels in the Gmail account, including system labels (INBOX, SPAM, etc.) and user-created labels.

Returns:
  Array of labels with id, name, type (system/user), and visibility settings.

Use this to find existing label IDs before creating filters.";

const CREATE_LABEL_DESCRIPTION: &str = "Create a new Gmail label (folder/category).

Args:
  - name (string): Label name, e.g. \"Work/Invoices\" or \"newsletters\". Use \"/\" for nesting.
  - messageListVisibility (string, optional): Whether label shows in message list. \"show\" or \"hide\". Default: \"show\"
  - labelListVisibility (string, optional): Whether label shows in label list. \"labelShow\", \"labelShowIfUnread\", or \"labelHide\". Default: \"labelShow\"

Returns:
  Created label with its ID (needed for filter creation).

Note: Label names are case-sensitive. Nested labels use \"/\" separator.";

const DELETE_LABEL_DESCRIPTION: &str = "Delete a user-created Gmail label. System labels cannot be deleted.

Args:
  - labelId (string): The label ID to delete (get from gmail_list_labels)

Warning: This permanently deletes the label. Messages keep their content but lose this label.";

pub fn list_labels() -> ToolDefinition {
    ToolDefinition {
        name: "gmail_list_labels",
        title: "List Gmail Labels",
        description: LIST_LABELS_DESCRIPTION,
        input_schema: Schema::empty_object(),
        annotations: READ_ONLY,
        handler: handle_list_labels,
    }
}

pub fn create_label() -> ToolDefinition {
    ToolDefinition {
        name: "gmail_create_label",
        title: "Create Gmail Label",
        description: CREATE_LABEL_DESCRIPTION,
        input_schema: Schema::object(vec![
            Property::required(
                "name",
                Schema::string()
                    .min(1)
                    .max(225)
                    .describe("Label name, e.g. \"Work\", \"newsletters\", or \"Work/Invoices\" for nested"),
            ),
            Property::optional(
                "messageListVisibility",
                Schema::enumeration(&["show", "hide"])
                    .describe("Whether messages with this label appear in message list"),
            )
            .with_default("show"),
            Property::optional(
                "labelListVisibility",
                Schema::enumeration(&["labelShow", "labelShowIfUnread", "labelHide"])
                    .describe("Whether label appears in the label list sidebar"),
            )
            .with_default("labelShow"),
        ]),
        annotations: ADDITIVE,
        handler: handle_create_label,
    }
}

pub fn delete_label() -> ToolDefinition {
    ToolDefinition {
        name: "gmail_delete_label",
        title: "Delete Gmail Label",
        description: DELETE_LABEL_DESCRIPTION,
        input_schema: Schema::object(vec![Property::required(
            "labelId",
            Schema::string()
                .min(1)
                .describe("Label ID to delete (from gmail_list_labels)"),
        )]),
        annotations: DESTRUCTIVE,
        handler: handle_delete_label,
    }
}

fn handle_list_labels(clients: &ClientAccessor, _args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let labels = clients.get().await?.list_labels().await?;
        Ok(render_label_list(&labels))
    })
}

fn handle_create_label(clients: &ClientAccessor, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let request: CreateLabelRequest = parse_args(args)?;
        let label = clients.get().await?.create_label(&request).await?;
        tracing::info!(label_id = %label.id, "Created label {}", label.name);
        Ok(render_created_label(&label))
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteLabelArgs {
    label_id: String,
}

fn handle_delete_label(clients: &ClientAccessor, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: DeleteLabelArgs = parse_args(args)?;
        clients.get().await?.delete_label(&args.label_id).await?;
        tracing::info!(label_id = %args.label_id, "Deleted label");
        Ok(render_deleted_label(&args.label_id))
    })
}

/// User labels first, then system labels; labels of any other type only appear in the structured list
pub fn render_label_list(labels: &[Label]) -> ToolOutput {
    let user: Vec<&Label> = labels.iter().filter(|l| l.is_user()).collect();
    let system: Vec<&Label> = labels.iter().filter(|l| l.is_system()).collect();

    let mut lines = vec![format!("## User Labels ({})", user.len())];
    lines.extend(user.iter().map(|l| format!("- **{}** (id: `{}`)", l.name, l.id)));
    lines.push(format!("\n## System Labels ({})", system.len()));
    lines.extend(system.iter().map(|l| format!("- {} (id: `{}`)", l.name, l.id)));

    ToolOutput::new(lines.join("\n"), json!({ "labels": labels }))
}

pub fn render_created_label(label: &Label) -> ToolOutput {
    let text = format!(
        "✅ Label created successfully!\n- Name: **{}**\n- ID: `{}`\n\nUse this ID when creating filters.",
        label.name, label.id
    );
    ToolOutput::new(text, json!({ "id": label.id, "name": label.name }))
}

pub fn render_deleted_label(label_id: &str) -> ToolOutput {
    ToolOutput::new(
        format!("✅ Label `{}` deleted successfully.", label_id),
        json!({ "deleted": true, "labelId": label_id }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(id: &str, name: &str, label_type: &str) -> Label {
        Label {
            id: id.to_string(),
            name: name.to_string(),
            label_type: Some(label_type.to_string()),
            message_list_visibility: None,
            label_list_visibility: None,
        }
    }

    #[test]
    fn test_render_label_list_sections() {
        let labels = vec![
            label("INBOX", "INBOX", "system"),
            label("Label_1", "Work", "user"),
            label("SPAM", "SPAM", "system"),
        ];
        let output = render_label_list(&labels);
        assert_eq!(
            output.text,
            "## User Labels (1)\n- **Work** (id: `Label_1`)\n\n## System Labels (2)\n- INBOX (id: `INBOX`)\n- SPAM (id: `SPAM`)"
        );
        assert_eq!(output.structured["labels"].as_array().unwrap().len(), 3);
        assert_eq!(output.structured["labels"][1]["type"], "user");
        assert!(output.structured["labels"][1].get("messageListVisibility").is_none());
    }

    #[test]
    fn test_render_empty_label_list() {
        let output = render_label_list(&[]);
        assert_eq!(output.text, "## User Labels (0)\n\n## System Labels (0)");
        assert_eq!(output.structured, json!({"labels": []}));
    }

    #[test]
    fn test_render_created_label() {
        let output = render_created_label(&label("Label_9", "Work/Invoices", "user"));
        assert!(output.text.contains("- Name: **Work/Invoices**"));
        assert!(output.text.contains("- ID: `Label_9`"));
        assert_eq!(output.structured, json!({"id": "Label_9", "name": "Work/Invoices"}));
    }

    #[test]
    fn test_render_deleted_label() {
        let output = render_deleted_label("Label_9");
        assert_eq!(output.text, "✅ Label `Label_9` deleted successfully.");
        assert_eq!(output.structured, json!({"deleted": true, "labelId": "Label_9"}));
    }

    #[test]
    fn test_create_label_schema_defaults() {
        let normalized = create_label()
            .input_schema
            .validate(&json!({"name": "Work"}))
            .unwrap();
        let request: CreateLabelRequest = parse_args(normalized).unwrap();
        assert_eq!(request.name, "Work");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"name": "Work", "messageListVisibility": "show", "labelListVisibility": "labelShow"})
        );
    }

    #[test]
    fn test_create_label_name_bounds() {
        let schema = create_label().input_schema;
        assert!(schema.validate(&json!({"name": ""})).is_err());
        assert!(schema.validate(&json!({"name": "x".repeat(225)})).is_ok());
        assert!(schema.validate(&json!({"name": "x".repeat(226)})).is_err());
        assert!(schema.validate(&json!({"name": format!("{}x", "😀".repeat(112))})).is_ok());
        assert!(schema.validate(&json!({"name": "😀".repeat(113)})).is_err());
    }
}
