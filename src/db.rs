//! SQLite access: schema inspection and query execution.
//!
//! This is the only place that touches the database. The SQL tools wrap
//! these methods and render any failure as text for the model, so errors
//! here are ordinary `Result`s, not strings.

use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use tokio::sync::Mutex;

/// Maximum rows rendered for a single query result.
const MAX_RESULT_ROWS: usize = 200;

/// Handle to the SQLite database the agent answers questions about.
///
/// rusqlite connections are not `Sync`, so the connection lives behind an
/// async mutex and all access is serialized. That matches the one-turn-at-a-
/// time surface; there is no concurrent query path to optimize for.
pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Open the database file, creating it if it does not exist.
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (tests).
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// List user table names, sorted by name.
    pub async fn list_tables(&self) -> Result<Vec<String>, rusqlite::Error> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Describe each named table: one block per requested name, input order
    /// preserved. Unknown names get a not-found notice instead of failing
    /// the whole call, so the model can self-correct.
    pub async fn describe_tables(&self, names: &[String]) -> Result<String, rusqlite::Error> {
        let conn = self.conn.lock().await;
        let mut blocks = Vec::with_capacity(names.len());

        for name in names {
            let mut stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1)")?;
            let columns = stmt
                .query_map([name], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            if columns.is_empty() {
                blocks.push(format!("Table '{}' not found", name));
            } else {
                let column_lines = columns
                    .iter()
                    .map(|(col, ty)| format!("  {} {}", col, ty))
                    .collect::<Vec<_>>()
                    .join("\n");
                blocks.push(format!("Table '{}':\n{}", name, column_lines));
            }
        }

        Ok(blocks.join("\n\n"))
    }

    /// Execute arbitrary SQL and format the outcome as text.
    ///
    /// SELECT-shaped statements return a header row plus one line per result
    /// row; other statements report the affected row count. Errors propagate
    /// to the caller, which renders them for the model.
    pub async fn run_query(&self, sql: &str) -> Result<String, rusqlite::Error> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(sql)?;

        if stmt.column_count() == 0 {
            // Not a row-returning statement (INSERT/UPDATE/DELETE/DDL).
            let affected = stmt.execute([])?;
            return Ok(format!("OK, {} row(s) affected", affected));
        }

        let column_names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        let mut rows = stmt.query([])?;
        let mut lines = vec![column_names.join(" | ")];
        let mut row_count = 0usize;
        let mut truncated = false;

        while let Some(row) = rows.next()? {
            if row_count >= MAX_RESULT_ROWS {
                truncated = true;
                break;
            }
            let values = (0..column_names.len())
                .map(|i| render_value(row.get_ref(i)))
                .collect::<Result<Vec<_>, _>>()?;
            lines.push(values.join(" | "));
            row_count += 1;
        }

        if row_count == 0 {
            return Ok("(no rows)".to_string());
        }

        let mut result = lines.join("\n");
        if truncated {
            result.push_str(&format!(
                "\n... (showing first {} rows)",
                MAX_RESULT_ROWS
            ));
        }
        Ok(result)
    }
}

fn render_value(value: Result<ValueRef<'_>, rusqlite::Error>) -> Result<String, rusqlite::Error> {
    Ok(match value? {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).to_string(),
        ValueRef::Blob(b) => format!("<{} byte blob>", b.len()),
    })
}
