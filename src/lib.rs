//! Telegram bot that prepares channel posts from PDF uploads.
//!
//! A user supplies a post title and body, uploads PDF documents, names
//! each one by replying to its upload message, and /finish re-sends
//! everything in upload order with a composed caption on the last
//! document.

/// Telegram handlers and commands
pub mod bot;
/// Post caption composition
pub mod caption;
/// Configuration management
pub mod config;
/// Workflow session state machine and attachment registry
pub mod session;
/// Per-user temporary file storage
pub mod storage;
/// Process-wide session store
pub mod store;
pub mod utils;
