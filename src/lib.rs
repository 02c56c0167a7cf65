//! # SQL Chat Agent
//!
//! A chat service for asking natural-language questions against a SQL database.
//!
//! This library provides:
//! - An HTTP API for chat sessions and message submission
//! - A tool-based agent loop that inspects the schema and executes SQL
//! - Integration with OpenRouter for LLM access
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Receive a user message via the API
//! 2. Build context with system prompt, replayed history, and tool schemas
//! 3. Call LLM, parse response, execute any tool calls against the database
//! 4. Feed results back to LLM, repeat until it produces a final answer
//!
//! ## Example
//!
//! ```rust,ignore
//! use sql_chat_agent::{api, config::Config};
//!
//! let config = Config::from_env()?;
//! api::serve(config).await?;
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod db;
pub mod llm;
pub mod session;
pub mod tools;

pub use config::Config;
