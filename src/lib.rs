#![deny(missing_docs)]
//! UI Host Bot
//!
//! A Telegram bot that asks an LLM to generate frontend files and hosts every
//! file the model hands back in an R2/S3 bucket, replying with public links.

/// Tool-use orchestration between the model and the object store
pub mod agent;
/// Telegram bot implementation
pub mod bot;
/// Configuration management
pub mod config;
/// LLM provider and client
pub mod llm;
/// Object storage layer (R2/S3)
pub mod storage;
/// Utility functions
pub mod utils;

#[cfg(test)]
pub mod testing;
