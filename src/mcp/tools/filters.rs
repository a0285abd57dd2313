//! Filter tools: list, create, delete, bulk create

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{GmailMcpError, ValidationError};
use crate::gmail::types::{Filter, FilterAction, FilterCriteria};
use crate::gmail::ClientAccessor;
use crate::mcp::catalog::{HandlerFuture, ToolDefinition, ToolOutput};
use crate::mcp::schema::{Property, Schema};

use super::{parse_args, ADDITIVE, DESTRUCTIVE, READ_ONLY};

/// Upper bound on filters per bulk call
pub const MAX_BULK_FILTERS: usize = 50;

const LIST_FILTERS_DESCRIPTION: &str = "List all existing Gmail filters/rules.

Returns:
  Array of filters with their criteria (from, to, subject, query, etc.) and actions (apply label, skip inbox, mark read, etc.).

Use this to see what filters already exist before creating new ones.";

const CREATE_FILTER_DESCRIPTION: &str = "Create a new Gmail filter rule that automatically processes incoming emails.

Criteria args (at least one required):
  - from (string, optional): Filter emails from this sender. Supports wildcards, e.g. \"@company.com\"
  - to (string, optional): Filter emails sent to this address
  - subject (string, optional): Filter emails containing this in the subject
  - query (string, optional): Gmail search query string, e.g. \"newsletter OR unsubscribe\"
  - hasAttachment (boolean, optional): Filter emails that have attachments
  - excludeChats (boolean, optional): Exclude Google Chat messages from filter

Action args (at least one required):
  - addLabelIds (string[], optional): Label IDs to apply. Use \"INBOX\", \"SPAM\", \"TRASH\", or custom label IDs from gmail_list_labels
  - removeLabelIds (string[], optional): Label IDs to remove. Use \"INBOX\" to skip inbox (archive), \"UNREAD\" to mark as read

Common patterns:
  - Archive + label newsletter: removeLabelIds=[\"INBOX\"], addLabelIds=[\"<your-label-id>\"]
  - Mark as read: removeLabelIds=[\"UNREAD\"]
  - Move to spam: addLabelIds=[\"SPAM\"]
  - Star important emails: addLabelIds=[\"STARRED\"]

Returns:
  Created filter with its ID.";

const DELETE_FILTER_DESCRIPTION: &str = "Delete an existing Gmail filter rule.

Args:
  - filterId (string): The filter ID to delete (get from gmail_list_filters)

Warning: This permanently deletes the filter. Existing emails are not affected, only future emails.";

const BULK_CREATE_FILTERS_DESCRIPTION: &str = "Create multiple Gmail filters at once. Useful for setting up an entire filtering system in one call.

Args:
  - filters (array): Array of filter objects, each with:
    - name (string): Human-readable name for this filter (for your reference, not stored in Gmail)
    - criteria: { from?, to?, subject?, query?, hasAttachment?, excludeChats? }
    - action: { addLabelIds?, removeLabelIds? }

Returns:
  Summary of created filters with success/failure for each.";

const MISSING_CRITERIA: &str =
    "At least one filter criteria is required (from, to, subject, query, hasAttachment, or excludeChats).";

const MISSING_ACTION: &str = "At least one action is required (addLabelIds or removeLabelIds).";

pub fn list_filters() -> ToolDefinition {
    ToolDefinition {
        name: "gmail_list_filters",
        title: "List Gmail Filters",
        description: LIST_FILTERS_DESCRIPTION,
        input_schema: Schema::empty_object(),
        annotations: READ_ONLY,
        handler: handle_list_filters,
    }
}

pub fn create_filter() -> ToolDefinition {
    let mut properties = criteria_properties(true);
    properties.extend(action_properties(true));

    ToolDefinition {
        name: "gmail_create_filter",
        title: "Create Gmail Filter",
        description: CREATE_FILTER_DESCRIPTION,
        input_schema: Schema::object(properties),
        annotations: ADDITIVE,
        handler: handle_create_filter,
    }
}

pub fn delete_filter() -> ToolDefinition {
    ToolDefinition {
        name: "gmail_delete_filter",
        title: "Delete Gmail Filter",
        description: DELETE_FILTER_DESCRIPTION,
        input_schema: Schema::object(vec![Property::required(
            "filterId",
            Schema::string()
                .min(1)
                .describe("Filter ID to delete (from gmail_list_filters)"),
        )]),
        annotations: DESTRUCTIVE,
        handler: handle_delete_filter,
    }
}

pub fn bulk_create_filters() -> ToolDefinition {
    let item = Schema::object(vec![
        Property::required("name", Schema::string().describe("Human-readable name for reference")),
        Property::required("criteria", Schema::object(criteria_properties(false))),
        Property::required("action", Schema::object(action_properties(false))),
    ]);

    ToolDefinition {
        name: "gmail_bulk_create_filters",
        title: "Bulk Create Gmail Filters",
        description: BULK_CREATE_FILTERS_DESCRIPTION,
        input_schema: Schema::object(vec![Property::required(
            "filters",
            Schema::array(item)
                .min(1)
                .max(MAX_BULK_FILTERS)
                .describe("Array of filters to create"),
        )]),
        annotations: ADDITIVE,
        handler: handle_bulk_create_filters,
    }
}

fn criteria_properties(described: bool) -> Vec<Property> {
    let field = |name: &'static str, schema: Schema, description: &'static str| {
        let schema = if described {
            schema.describe(description)
        } else {
            schema
        };
        Property::optional(name, schema)
    };

    vec![
        field(
            "from",
            Schema::string(),
            "Filter emails from this sender, e.g. \"boss@company.com\" or \"@newsletters.com\"",
        ),
        field("to", Schema::string(), "Filter emails sent to this address"),
        field("subject", Schema::string(), "Filter emails with this text in subject"),
        field(
            "query",
            Schema::string(),
            "Gmail search query, e.g. \"newsletter OR unsubscribe\"",
        ),
        field("hasAttachment", Schema::boolean(), "Filter emails with attachments"),
        field("excludeChats", Schema::boolean(), "Exclude Google Chat messages"),
    ]
}

fn action_properties(described: bool) -> Vec<Property> {
    let field = |name: &'static str, description: &'static str| {
        let schema = Schema::array(Schema::string());
        let schema = if described {
            schema.describe(description)
        } else {
            schema
        };
        Property::optional(name, schema)
    };

    vec![
        field(
            "addLabelIds",
            "Label IDs to add, e.g. [\"INBOX\", \"Label_123\"] or custom label IDs",
        ),
        field(
            "removeLabelIds",
            "Label IDs to remove, e.g. [\"INBOX\"] to archive, [\"UNREAD\"] to mark as read",
        ),
    ]
}

fn handle_list_filters(clients: &ClientAccessor, _args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let filters = clients.get().await?.list_filters().await?;
        Ok(render_filter_list(&filters))
    })
}

/// Flat arguments of `gmail_create_filter`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFilterArgs {
    pub from: Option<String>,
    pub to: Option<String>,
    pub subject: Option<String>,
    pub query: Option<String>,
    pub has_attachment: Option<bool>,
    pub exclude_chats: Option<bool>,
    pub add_label_ids: Option<Vec<String>>,
    pub remove_label_ids: Option<Vec<String>>,
}

/// Check the "at least one criterion, at least one action" rule and build the request.
///
/// Criteria are checked first. Empty strings don't count as criteria; booleans
/// count whenever present, `false` included. Only what counts is sent to Gmail.
pub fn prepare_filter(
    args: CreateFilterArgs,
) -> std::result::Result<(FilterCriteria, FilterAction), ValidationError> {
    let non_empty = |s: Option<String>| s.filter(|s| !s.is_empty());
    let criteria = FilterCriteria {
        from: non_empty(args.from),
        to: non_empty(args.to),
        subject: non_empty(args.subject),
        query: non_empty(args.query),
        has_attachment: args.has_attachment,
        exclude_chats: args.exclude_chats,
        ..Default::default()
    };

    if criteria_fragments(&criteria).is_empty() {
        return Err(ValidationError::Precondition {
            message: MISSING_CRITERIA.to_string(),
        });
    }

    let non_empty_list = |ids: Option<Vec<String>>| ids.filter(|ids| !ids.is_empty());
    let action = FilterAction {
        add_label_ids: non_empty_list(args.add_label_ids),
        remove_label_ids: non_empty_list(args.remove_label_ids),
        ..Default::default()
    };

    if action.add_label_ids.is_none() && action.remove_label_ids.is_none() {
        return Err(ValidationError::Precondition {
            message: MISSING_ACTION.to_string(),
        });
    }

    Ok((criteria, action))
}

fn handle_create_filter(clients: &ClientAccessor, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: CreateFilterArgs = parse_args(args)?;
        let (criteria, action) = prepare_filter(args)?;

        let filter = clients.get().await?.create_filter(&criteria, &action).await?;
        tracing::info!(filter_id = ?filter.id, "Created filter");
        Ok(render_created_filter(&filter, &criteria, &action))
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteFilterArgs {
    filter_id: String,
}

fn handle_delete_filter(clients: &ClientAccessor, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: DeleteFilterArgs = parse_args(args)?;
        clients.get().await?.delete_filter(&args.filter_id).await?;
        tracing::info!(filter_id = %args.filter_id, "Deleted filter");
        Ok(render_deleted_filter(&args.filter_id))
    })
}

#[derive(Debug, Deserialize)]
struct BulkCreateArgs {
    filters: Vec<BulkFilterItem>,
}

#[derive(Debug, Deserialize)]
struct BulkFilterItem {
    name: String,
    criteria: FilterCriteria,
    action: FilterAction,
}

/// Outcome of one item of a bulk creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkResultEntry {
    pub name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BulkResultEntry {
    fn created(name: String, id: Option<String>) -> Self {
        Self {
            name,
            success: true,
            id,
            error: None,
        }
    }

    fn failed(name: String, error: &GmailMcpError) -> Self {
        Self {
            name,
            success: false,
            id: None,
            error: Some(error.caller_message()),
        }
    }
}

// Items go to Gmail as given: the create_filter criteria/action rule is not applied here.
fn handle_bulk_create_filters(clients: &ClientAccessor, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: BulkCreateArgs = parse_args(args)?;
        let client = clients.get().await?;

        let mut results = Vec::with_capacity(args.filters.len());
        for item in args.filters {
            match client.create_filter(&item.criteria, &item.action).await {
                Ok(filter) => results.push(BulkResultEntry::created(item.name, filter.id)),
                Err(e) => {
                    tracing::warn!(name = %item.name, "Bulk filter creation failed: {}", e);
                    results.push(BulkResultEntry::failed(item.name, &e));
                }
            }
        }

        Ok(render_bulk_results(&results))
    })
}

/// `k: v` fragments for the criteria that are set, in a fixed order
fn criteria_fragments(criteria: &FilterCriteria) -> Vec<String> {
    let strings = [
        ("from", &criteria.from),
        ("to", &criteria.to),
        ("subject", &criteria.subject),
        ("query", &criteria.query),
    ];
    let flags = [
        ("hasAttachment", criteria.has_attachment),
        ("excludeChats", criteria.exclude_chats),
    ];

    strings
        .iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| format!("{}: {}", key, v)))
        .chain(
            flags
                .iter()
                .filter_map(|&(key, value)| value.map(|v| format!("{}: {}", key, v))),
        )
        .collect()
}

fn summary_or_none(parts: Vec<String>) -> String {
    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join(", ")
    }
}

pub fn render_filter_list(filters: &[Filter]) -> ToolOutput {
    if filters.is_empty() {
        return ToolOutput::new(
            "No filters found in this Gmail account.",
            json!({ "filters": [] }),
        );
    }

    let blocks: Vec<String> = filters
        .iter()
        .enumerate()
        .map(|(i, filter)| {
            let criteria = &filter.criteria;
            let texts = [
                ("from", &criteria.from),
                ("to", &criteria.to),
                ("subject", &criteria.subject),
                ("query", &criteria.query),
            ];
            let mut criteria_parts: Vec<String> = texts
                .iter()
                .filter_map(|(key, value)| {
                    value
                        .as_deref()
                        .filter(|v| !v.is_empty())
                        .map(|v| format!("{}: {}", key, v))
                })
                .collect();
            if criteria.has_attachment == Some(true) {
                criteria_parts.push("has attachment".to_string());
            }
            if criteria.exclude_chats == Some(true) {
                criteria_parts.push("exclude chats".to_string());
            }

            let action_parts = label_actions(
                &filter.action,
                |id| format!("add label: {}", id),
                |id| format!("remove label: {}", id),
            );

            format!(
                "**Filter {}** (id: `{}`)\n  Criteria: {}\n  Actions: {}",
                i + 1,
                filter.id.as_deref().unwrap_or_default(),
                summary_or_none(criteria_parts),
                summary_or_none(action_parts)
            )
        })
        .collect();

    ToolOutput::new(
        format!("## Gmail Filters ({})\n\n{}", filters.len(), blocks.join("\n\n")),
        json!({ "filters": filters }),
    )
}

fn label_actions(
    action: &FilterAction,
    add: impl Fn(&str) -> String,
    remove: impl Fn(&str) -> String,
) -> Vec<String> {
    let added = action.add_label_ids.iter().flatten().map(|id| add(id.as_str()));
    let removed = action.remove_label_ids.iter().flatten().map(|id| remove(id.as_str()));
    added.chain(removed).collect()
}

pub fn render_created_filter(
    filter: &Filter,
    criteria: &FilterCriteria,
    action: &FilterAction,
) -> ToolOutput {
    let actions = label_actions(
        action,
        |id| format!("add label \"{}\"", id),
        |id| format!("remove label \"{}\"", id),
    );

    let text = format!(
        "✅ Filter created successfully!\n- ID: `{}`\n- Criteria: {}\n- Actions: {}",
        filter.id.as_deref().unwrap_or_default(),
        criteria_fragments(criteria).join(", "),
        actions.join(", ")
    );

    ToolOutput::new(
        text,
        json!({ "id": filter.id, "criteria": criteria, "action": action }),
    )
}

pub fn render_deleted_filter(filter_id: &str) -> ToolOutput {
    ToolOutput::new(
        format!("✅ Filter `{}` deleted successfully.", filter_id),
        json!({ "deleted": true, "filterId": filter_id }),
    )
}

pub fn render_bulk_results(results: &[BulkResultEntry]) -> ToolOutput {
    let succeeded = results.iter().filter(|r| r.success).count();
    let failed = results.len() - succeeded;

    let mut lines = vec![
        "## Bulk Filter Creation Results".to_string(),
        format!("✅ {} created, ❌ {} failed\n", succeeded, failed),
    ];
    lines.extend(results.iter().map(|r| {
        if r.success {
            format!("✅ **{}** — id: `{}`", r.name, r.id.as_deref().unwrap_or_default())
        } else {
            format!("❌ **{}** — {}", r.name, r.error.as_deref().unwrap_or_default())
        }
    }));

    ToolOutput::new(
        lines.join("\n"),
        json!({ "results": results, "succeeded": succeeded, "failed": failed }),
    )
}
