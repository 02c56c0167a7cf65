//! Agent module - the conversational tool-calling core.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Build context with system prompt, replayed history, and the user message
//! 2. Call LLM with available tools
//! 3. If LLM requests tool calls, execute them in order and feed results back
//! 4. Repeat until LLM produces a final answer or the round cap is reached

mod agent_loop;
mod prompt;

pub use agent_loop::{Agent, AgentError};
pub use prompt::build_system_prompt;
