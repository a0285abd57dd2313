//! Tool catalog
//!
//! An immutable name → definition map built once at startup by [`build_catalog`].

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::error::{GmailMcpError, McpError, Result};
use crate::gmail::ClientAccessor;
use crate::mcp::schema::Schema;
use crate::mcp::tools;
use crate::mcp::types::{CallToolResult, Tool, ToolAnnotations};

/// Prefix of every advertised tool name; the bare remainder is accepted as an alias
pub const TOOL_PREFIX: &str = "gmail_";

/// Successful tool result: prose for the reader and the same data as JSON
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    pub structured: Value,
}

impl ToolOutput {
    pub fn new(text: impl Into<String>, structured: Value) -> Self {
        Self {
            text: text.into(),
            structured,
        }
    }
}

impl From<ToolOutput> for CallToolResult {
    fn from(output: ToolOutput) -> Self {
        CallToolResult::structured(output.text, output.structured)
    }
}

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<ToolOutput>> + Send + 'a>>;

/// Handler invoked with arguments that already passed the tool's schema
pub type Handler = for<'a> fn(&'a ClientAccessor, Value) -> HandlerFuture<'a>;

/// A named, schema-validated operation
#[derive(Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub input_schema: Schema,
    pub annotations: ToolAnnotations,
    pub handler: Handler,
}

impl ToolDefinition {
    /// The `tools/list` entry for this definition
    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.to_string(),
            title: self.title.to_string(),
            description: self.description.to_string(),
            input_schema: self.input_schema.to_json_schema(),
            annotations: self.annotations,
        }
    }
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("title", &self.title)
            .field("annotations", &self.annotations)
            .finish_non_exhaustive()
    }
}

/// Read-only registry of tool definitions, in declaration order
#[derive(Debug)]
pub struct Catalog {
    tools: Vec<ToolDefinition>,
    index: HashMap<&'static str, usize>,
}

impl Catalog {
    /// Build a catalog; names must be unique
    pub fn new(tools: Vec<ToolDefinition>) -> Result<Self> {
        let mut index = HashMap::with_capacity(tools.len());
        for (position, tool) in tools.iter().enumerate() {
            if index.insert(tool.name, position).is_some() {
                return Err(GmailMcpError::Mcp(McpError::DuplicateTool {
                    name: tool.name.to_string(),
                }));
            }
        }
        Ok(Self { tools, index })
    }

    /// Look a tool up by its advertised name or by the name without the `gmail_` prefix
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        if let Some(&position) = self.index.get(name) {
            return Some(&self.tools[position]);
        }
        if name.starts_with(TOOL_PREFIX) {
            return None;
        }
        self.index
            .get(format!("{}{}", TOOL_PREFIX, name).as_str())
            .map(|&position| &self.tools[position])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Entries for `tools/list`
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(ToolDefinition::to_tool).collect()
    }
}

/// The server's full tool set
pub fn build_catalog() -> Result<Catalog> {
    Catalog::new(vec![
        tools::labels::list_labels(),
        tools::labels::create_label(),
        tools::labels::delete_label(),
        tools::filters::list_filters(),
        tools::filters::create_filter(),
        tools::filters::delete_filter(),
        tools::filters::bulk_create_filters(),
    ])
}
