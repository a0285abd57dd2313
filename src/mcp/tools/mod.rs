//! Tool definitions and handlers
//!
//! Each tool module exposes one constructor per tool returning its
//! [`ToolDefinition`](crate::mcp::catalog::ToolDefinition), plus pure render
//! functions that turn Gmail responses into a [`ToolOutput`](crate::mcp::catalog::ToolOutput).

pub mod filters;
pub mod labels;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{GmailMcpError, McpError, Result};
use crate::mcp::types::ToolAnnotations;

/// Bind schema-checked arguments to a handler's argument struct
fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| {
        GmailMcpError::Mcp(McpError::InvalidArguments {
            message: e.to_string(),
        })
    })
}

const READ_ONLY: ToolAnnotations = ToolAnnotations {
    read_only_hint: true,
    destructive_hint: false,
    idempotent_hint: true,
    open_world_hint: false,
};

const ADDITIVE: ToolAnnotations = ToolAnnotations {
    read_only_hint: false,
    destructive_hint: false,
    idempotent_hint: false,
    open_world_hint: false,
};

const DESTRUCTIVE: ToolAnnotations = ToolAnnotations {
    read_only_hint: false,
    destructive_hint: true,
    idempotent_hint: false,
    open_world_hint: false,
};
