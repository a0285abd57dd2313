//! Gmail API module
//!
//! Types, authentication, and the label/filter client for the Gmail API.

pub mod accessor;
pub mod auth;
pub mod client;
pub mod filters;
pub mod labels;
pub mod types;

pub use accessor::ClientAccessor;
pub use client::{GmailClient, MailboxApi, TokenSource};
