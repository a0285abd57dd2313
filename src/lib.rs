//! Gmail Filters MCP Server Library
//!
//! A Model Context Protocol (MCP) server that manages Gmail labels and filters.
//! Every tool answers with readable text plus the same data as structured JSON.

pub mod config;
pub mod error;
pub mod gmail;
pub mod mcp;

pub use config::Config;
pub use error::{GmailMcpError, Result};
