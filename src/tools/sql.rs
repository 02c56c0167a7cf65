//! SQL tools: table listing, schema description, query execution.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::Tool;
use crate::db::SqliteDatabase;

/// List the tables in the database.
pub struct ListTables {
    db: Arc<SqliteDatabase>,
}

impl ListTables {
    pub fn new(db: Arc<SqliteDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for ListTables {
    fn name(&self) -> &str {
        "list_tables"
    }

    fn description(&self) -> &str {
        "List all table names in the database. Takes no arguments. Use this to discover what data is available."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<String> {
        let tables = self.db.list_tables().await?;
        if tables.is_empty() {
            Ok("(no tables)".to_string())
        } else {
            Ok(tables.join("\n"))
        }
    }
}

/// Describe the columns of one or more tables.
pub struct DescribeTables {
    db: Arc<SqliteDatabase>,
}

impl DescribeTables {
    pub fn new(db: Arc<SqliteDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for DescribeTables {
    fn name(&self) -> &str {
        "describe_tables"
    }

    fn description(&self) -> &str {
        "Given a list of table names, return the column names and types of each table. Unknown tables are reported per name. Always use this before writing SQL against a table."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "tables": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Names of the tables to describe"
                }
            },
            "required": ["tables"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let tables = args["tables"]
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("Missing 'tables' argument (expected array of strings)"))?;

        let names = tables
            .iter()
            .map(|v| {
                v.as_str()
                    .map(|s| s.to_string())
                    .ok_or_else(|| anyhow::anyhow!("'tables' entries must be strings"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        if names.is_empty() {
            return Ok("(no tables requested)".to_string());
        }

        Ok(self.db.describe_tables(&names).await?)
    }
}

/// Execute a SQL statement and return the result as text.
///
/// The only tool with side effects: a write statement mutates the database.
/// No sandboxing beyond what SQLite itself enforces.
pub struct RunQuery {
    db: Arc<SqliteDatabase>,
}

impl RunQuery {
    pub fn new(db: Arc<SqliteDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for RunQuery {
    fn name(&self) -> &str {
        "run_query"
    }

    fn description(&self) -> &str {
        "Execute a SQL query against the database and return the result rows, or an error message if the query is invalid. You may retry with corrected SQL after an error."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sql": {
                    "type": "string",
                    "description": "The SQL statement to execute"
                }
            },
            "required": ["sql"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let sql = args["sql"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'sql' argument"))?;

        if sql.trim().is_empty() {
            return Ok("Error: empty SQL statement".to_string());
        }

        // Execution failures stay on the Ok path: the model must see the
        // error text so it can retry with corrected SQL.
        match self.db.run_query(sql).await {
            Ok(result) => Ok(result),
            Err(e) => Ok(format!("SQL error: {}", e)),
        }
    }
}
