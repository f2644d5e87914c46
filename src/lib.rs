//! Inbox Triage: classifies inbound messages and drafts replies.

pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod triage;
