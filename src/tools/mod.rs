//! Tool definitions and registry.
//!
//! Tools are the functions the model may invoke mid-conversation. The
//! registry is built once at startup and not mutated thereafter; the agent
//! loop resolves tool calls by name through [`ToolRegistry::execute`].

mod sql;

pub use sql::{DescribeTables, ListTables, RunQuery};

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::db::SqliteDatabase;

/// A named, schema-described function the model may request to invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name, unique within the registry.
    fn name(&self) -> &str;

    /// Natural-language description, consumed by the model to decide applicability.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's arguments.
    fn parameters_schema(&self) -> Value;

    /// Invoke the tool. Execution failures are rendered as `Ok` text where
    /// the model can recover from them; an `Err` here becomes error text in
    /// the tool result message, never a crash of the loop.
    async fn execute(&self, args: Value) -> anyhow::Result<String>;
}

/// Name and description of a registered tool (for prompt building).
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Fixed, ordered set of tools available to the agent.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Build the registry with the SQL tools bound to the given database.
    pub fn new(db: Arc<SqliteDatabase>) -> Self {
        Self {
            tools: vec![
                Arc::new(ListTables::new(db.clone())),
                Arc::new(DescribeTables::new(db.clone())),
                Arc::new(RunQuery::new(db)),
            ],
        }
    }

    /// Names and descriptions of all tools, in registration order.
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect()
    }

    /// Tool schemas in the chat-completions function format.
    pub fn get_tool_schemas(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name(),
                        "description": t.description(),
                        "parameters": t.parameters_schema(),
                    }
                })
            })
            .collect()
    }

    /// Resolve a tool by name and invoke it.
    ///
    /// An unresolvable name is a contract violation of the model's
    /// tool-calling discipline; it surfaces as an error the caller feeds
    /// back to the model rather than ignoring.
    pub async fn execute(&self, name: &str, args: Value) -> anyhow::Result<String> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| {
                let available = self
                    .tools
                    .iter()
                    .map(|t| t.name())
                    .collect::<Vec<_>>()
                    .join(", ");
                anyhow::anyhow!("Unknown tool: '{}'. Available tools: {}", name, available)
            })?;

        tool.execute(args).await
    }
}
