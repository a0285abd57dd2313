//! MCP (Model Context Protocol) module
//!
//! Tool catalog, dispatch runtime and the stdio JSON-RPC server around them.

pub mod catalog;
pub mod dispatch;
pub mod schema;
pub mod server;
pub mod tools;
pub mod types;
