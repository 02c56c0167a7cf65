//! Core agent loop implementation.

use std::sync::Arc;

use thiserror::Error;

use crate::config::Config;
use crate::db::SqliteDatabase;
use crate::llm::{ChatMessage, LlmClient, LlmError, Role, ToolCall};
use crate::session::Turn;
use crate::tools::ToolRegistry;

use super::prompt::build_system_prompt;

/// Terminal failures of one agent turn. Tool-level failures never appear
/// here: they are rendered as text and fed back to the model.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Talking to the model provider failed. Not recoverable in the loop;
    /// the turn fails and the session history is left unchanged.
    #[error("model provider error: {0}")]
    Provider(#[from] LlmError),

    /// The model produced neither tool calls nor content.
    #[error("model returned an empty response")]
    EmptyResponse,

    /// The tool-dispatch round cap was hit without a final answer.
    #[error("tool round limit ({0}) reached without a final answer")]
    ToolRoundsExhausted(usize),
}

/// The conversational agent: model inference alternating with tool
/// execution until a final natural-language answer is produced.
pub struct Agent {
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    model: String,
    max_tool_rounds: usize,
    system_prompt: String,
}

impl Agent {
    /// Create the agent, precomputing the table list for the system prompt.
    ///
    /// # Errors
    ///
    /// Fails if the database schema cannot be inspected: the system prompt
    /// depends on the table set, so the session cannot proceed without it.
    pub async fn new(
        config: &Config,
        llm: Arc<dyn LlmClient>,
        db: Arc<SqliteDatabase>,
    ) -> anyhow::Result<Self> {
        let tables = db
            .list_tables()
            .await
            .map_err(|e| anyhow::anyhow!("failed to inspect database schema: {}", e))?;
        tracing::info!("Database tables: {:?}", tables);

        let tools = ToolRegistry::new(db);
        let system_prompt = build_system_prompt(&tables, &tools);

        Ok(Self {
            llm,
            tools,
            model: config.default_model.clone(),
            max_tool_rounds: config.max_tool_rounds,
            system_prompt,
        })
    }

    /// Run one user turn and return the final answer.
    ///
    /// The replayed history and the new user message are sent to the model
    /// together with the tool schemas; tool calls are dispatched strictly
    /// sequentially until the model answers in plain text. The caller is
    /// responsible for recording the completed `Turn`.
    pub async fn run_turn(&self, history: &[Turn], user_text: &str) -> Result<String, AgentError> {
        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        messages.push(ChatMessage::text(Role::System, self.system_prompt.clone()));
        for turn in history {
            messages.push(ChatMessage::text(Role::User, turn.user_text.clone()));
            messages.push(ChatMessage::text(Role::Assistant, turn.assistant_text.clone()));
        }
        messages.push(ChatMessage::text(Role::User, user_text));

        let tool_schemas = self.tools.get_tool_schemas();

        // Agent loop
        for round in 0..self.max_tool_rounds {
            tracing::debug!("Agent round {}", round + 1);

            let response = self
                .llm
                .chat_completion(&self.model, &messages, Some(&tool_schemas))
                .await?;

            // Check for tool calls
            if let Some(tool_calls) = &response.tool_calls {
                if !tool_calls.is_empty() {
                    messages.push(ChatMessage::assistant_tool_calls(
                        response.content.clone(),
                        tool_calls.clone(),
                    ));

                    // Execute each tool call; the model sees every result
                    // before deciding its next action.
                    for tool_call in tool_calls {
                        tracing::info!(
                            tool = %tool_call.function.name,
                            args = %tool_call.function.arguments,
                            "Dispatching tool call"
                        );

                        let result = match self.execute_tool_call(tool_call).await {
                            Ok(output) => output,
                            Err(e) => format!("Error: {}", e),
                        };

                        messages.push(ChatMessage::tool_result(tool_call.id.clone(), result));
                    }

                    continue;
                }
            }

            // No tool calls - this is the final answer
            if let Some(content) = response.content {
                return Ok(content);
            }

            return Err(AgentError::EmptyResponse);
        }

        Err(AgentError::ToolRoundsExhausted(self.max_tool_rounds))
    }

    /// Resolve and invoke a single tool call.
    ///
    /// Malformed argument JSON and unknown tool names both end up as error
    /// text in the tool result message, so the model can self-correct.
    async fn execute_tool_call(&self, tool_call: &ToolCall) -> anyhow::Result<String> {
        let args: serde_json::Value = serde_json::from_str(&tool_call.function.arguments)
            .map_err(|e| anyhow::anyhow!("invalid tool arguments: {}", e))?;

        self.tools.execute(&tool_call.function.name, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatResponse, FunctionCall};
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Scripted model client: returns canned responses in order and records
    /// every message sequence it was called with.
    struct FakeLlm {
        script: Mutex<Vec<Result<ChatResponse, LlmError>>>,
        calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl FakeLlm {
        fn new(script: Vec<Result<ChatResponse, LlmError>>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn recorded_calls(&self) -> Vec<Vec<ChatMessage>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for FakeLlm {
        async fn chat_completion(
            &self,
            _model: &str,
            messages: &[ChatMessage],
            _tools: Option<&[serde_json::Value]>,
        ) -> Result<ChatResponse, LlmError> {
            self.calls.lock().unwrap().push(messages.to_vec());
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                // Exhausted scripts keep requesting tools so round-cap tests
                // can run unbounded scenarios.
                return Ok(tool_call_response("list_tables", "{}"));
            }
            script.remove(0)
        }
    }

    fn answer(text: &str) -> Result<ChatResponse, LlmError> {
        Ok(ChatResponse {
            content: Some(text.to_string()),
            tool_calls: None,
        })
    }

    fn tool_call_response(name: &str, arguments: &str) -> ChatResponse {
        ChatResponse {
            content: None,
            tool_calls: Some(vec![ToolCall {
                id: format!("call_{}", name),
                call_type: "function".to_string(),
                function: FunctionCall {
                    name: name.to_string(),
                    arguments: arguments.to_string(),
                },
            }]),
        }
    }

    async fn seeded_db() -> Arc<SqliteDatabase> {
        let db = Arc::new(SqliteDatabase::open_in_memory().expect("open db"));
        db.run_query(
            "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT)",
        )
        .await
        .expect("create customers");
        db.run_query(
            "CREATE TABLE invoices (id INTEGER PRIMARY KEY, customer_id INTEGER, total REAL)",
        )
        .await
        .expect("create invoices");
        db.run_query("INSERT INTO invoices (customer_id, total) VALUES (1, 9.5), (1, 20.0), (2, 3.25)")
            .await
            .expect("seed invoices");
        db
    }

    async fn agent_with(
        llm: Arc<FakeLlm>,
        db: Arc<SqliteDatabase>,
        max_tool_rounds: usize,
    ) -> Agent {
        let mut config = Config::new(
            "test-key".to_string(),
            "test-model".to_string(),
            PathBuf::from(":memory:"),
        );
        config.max_tool_rounds = max_tool_rounds;
        Agent::new(&config, llm, db).await.expect("build agent")
    }

    #[tokio::test]
    async fn test_direct_answer_without_tools() {
        let llm = Arc::new(FakeLlm::new(vec![answer("Hello! Ask me about the data.")]));
        let agent = agent_with(llm.clone(), seeded_db().await, 10).await;

        let result = agent.run_turn(&[], "Hi").await.expect("turn succeeds");
        assert_eq!(result, "Hello! Ask me about the data.");

        let calls = llm.recorded_calls();
        assert_eq!(calls.len(), 1);
        // system prompt + user message, nothing else
        assert_eq!(calls[0].len(), 2);
        assert_eq!(calls[0][0].role, Role::System);
        assert_eq!(calls[0][1].role, Role::User);
        assert_eq!(calls[0][1].content.as_deref(), Some("Hi"));
    }

    #[tokio::test]
    async fn test_system_prompt_embeds_precomputed_tables() {
        let llm = Arc::new(FakeLlm::new(vec![answer("ok")]));
        let agent = agent_with(llm.clone(), seeded_db().await, 10).await;

        agent.run_turn(&[], "Hi").await.expect("turn succeeds");

        let calls = llm.recorded_calls();
        let system = calls[0][0].content.as_deref().unwrap();
        assert!(system.contains("customers, invoices"));
    }

    #[tokio::test]
    async fn test_history_is_replayed_in_order() {
        let llm = Arc::new(FakeLlm::new(vec![answer("again?")]));
        let agent = agent_with(llm.clone(), seeded_db().await, 10).await;

        let history = vec![
            Turn {
                user_text: "What tables are there?".to_string(),
                assistant_text: "There are two tables: customers and invoices.".to_string(),
            },
            Turn {
                user_text: "Thanks".to_string(),
                assistant_text: "You're welcome.".to_string(),
            },
        ];
        agent.run_turn(&history, "And again?").await.expect("turn");

        let messages = &llm.recorded_calls()[0];
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[1].content.as_deref(), Some("What tables are there?"));
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(
            messages[2].content.as_deref(),
            Some("There are two tables: customers and invoices.")
        );
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[5].content.as_deref(), Some("And again?"));
    }

    #[tokio::test]
    async fn test_list_tables_scenario() {
        let llm = Arc::new(FakeLlm::new(vec![
            Ok(tool_call_response("list_tables", "{}")),
            answer("There are two tables: customers and invoices."),
        ]));
        let agent = agent_with(llm.clone(), seeded_db().await, 10).await;

        let result = agent
            .run_turn(&[], "What tables are there?")
            .await
            .expect("turn succeeds");
        assert_eq!(result, "There are two tables: customers and invoices.");

        // Second model call must include the assistant tool-call message and
        // the tool result before the final answer was produced.
        let calls = llm.recorded_calls();
        assert_eq!(calls.len(), 2);
        let second = &calls[1];
        let assistant = &second[second.len() - 2];
        assert_eq!(assistant.role, Role::Assistant);
        assert!(assistant.tool_calls.is_some());
        let tool_result = &second[second.len() - 1];
        assert_eq!(tool_result.role, Role::Tool);
        assert_eq!(tool_result.content.as_deref(), Some("customers\ninvoices"));
        assert_eq!(tool_result.tool_call_id.as_deref(), Some("call_list_tables"));
    }

    #[tokio::test]
    async fn test_describe_then_query_scenario() {
        let llm = Arc::new(FakeLlm::new(vec![
            Ok(tool_call_response(
                "describe_tables",
                r#"{"tables": ["invoices"]}"#,
            )),
            Ok(tool_call_response(
                "run_query",
                r#"{"sql": "SELECT * FROM invoices LIMIT 3"}"#,
            )),
            answer("Here are 3 invoices."),
        ]));
        let agent = agent_with(llm.clone(), seeded_db().await, 10).await;

        let result = agent
            .run_turn(&[], "Show me 3 invoices")
            .await
            .expect("turn succeeds");
        assert_eq!(result, "Here are 3 invoices.");

        // All tool results incorporated, in order, before the final answer.
        let calls = llm.recorded_calls();
        assert_eq!(calls.len(), 3);
        let third = &calls[2];
        let describe_result = third
            .iter()
            .find(|m| m.tool_call_id.as_deref() == Some("call_describe_tables"))
            .expect("describe result present");
        assert!(describe_result
            .content
            .as_deref()
            .unwrap()
            .contains("Table 'invoices':"));
        let query_result = third
            .iter()
            .find(|m| m.tool_call_id.as_deref() == Some("call_run_query"))
            .expect("query result present");
        assert!(query_result.content.as_deref().unwrap().contains("9.5"));
    }

    #[tokio::test]
    async fn test_sql_error_text_does_not_crash_the_loop() {
        let llm = Arc::new(FakeLlm::new(vec![
            Ok(tool_call_response(
                "run_query",
                r#"{"sql": "SELEC * FROM invoices"}"#,
            )),
            answer("That query had a typo; here is the corrected result."),
        ]));
        let agent = agent_with(llm.clone(), seeded_db().await, 10).await;

        let result = agent
            .run_turn(&[], "Show me invoices")
            .await
            .expect("turn succeeds");
        assert_eq!(result, "That query had a typo; here is the corrected result.");

        let calls = llm.recorded_calls();
        let tool_result = calls[1].last().unwrap();
        assert!(tool_result
            .content
            .as_deref()
            .unwrap()
            .starts_with("SQL error:"));
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_error_text() {
        let llm = Arc::new(FakeLlm::new(vec![
            Ok(tool_call_response("send_email", "{}")),
            answer("I can only query the database."),
        ]));
        let agent = agent_with(llm.clone(), seeded_db().await, 10).await;

        let result = agent.run_turn(&[], "Email me").await.expect("turn succeeds");
        assert_eq!(result, "I can only query the database.");

        let calls = llm.recorded_calls();
        let tool_result = calls[1].last().unwrap();
        let text = tool_result.content.as_deref().unwrap();
        assert!(text.starts_with("Error:"));
        assert!(text.contains("Unknown tool: 'send_email'"));
    }

    #[tokio::test]
    async fn test_malformed_arguments_become_error_text() {
        let llm = Arc::new(FakeLlm::new(vec![
            Ok(tool_call_response("run_query", "not json")),
            answer("Let me try that again."),
        ]));
        let agent = agent_with(llm.clone(), seeded_db().await, 10).await;

        agent.run_turn(&[], "Query").await.expect("turn succeeds");

        let calls = llm.recorded_calls();
        let tool_result = calls[1].last().unwrap();
        assert!(tool_result
            .content
            .as_deref()
            .unwrap()
            .contains("invalid tool arguments"));
    }

    #[tokio::test]
    async fn test_round_cap_exhaustion() {
        // Empty script: the fake keeps requesting tools forever.
        let llm = Arc::new(FakeLlm::new(vec![]));
        let agent = agent_with(llm, seeded_db().await, 3).await;

        let err = agent.run_turn(&[], "loop forever").await.unwrap_err();
        assert!(matches!(err, AgentError::ToolRoundsExhausted(3)));
    }

    #[tokio::test]
    async fn test_provider_error_is_terminal() {
        let llm = Arc::new(FakeLlm::new(vec![Err(LlmError::Api {
            status: 401,
            body: "invalid api key".to_string(),
        })]));
        let agent = agent_with(llm, seeded_db().await, 10).await;

        let err = agent.run_turn(&[], "Hi").await.unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
    }

    #[tokio::test]
    async fn test_empty_response_is_error() {
        let llm = Arc::new(FakeLlm::new(vec![Ok(ChatResponse::default())]));
        let agent = agent_with(llm, seeded_db().await, 10).await;

        let err = agent.run_turn(&[], "Hi").await.unwrap_err();
        assert!(matches!(err, AgentError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_agent_new_inspects_schema_at_startup() {
        let db = Arc::new(SqliteDatabase::open_in_memory().expect("open db"));
        let llm: Arc<dyn LlmClient> = Arc::new(FakeLlm::new(vec![]));
        let config = Config::new(
            "test-key".to_string(),
            "test-model".to_string(),
            PathBuf::from(":memory:"),
        );
        let agent = Agent::new(&config, llm, db).await.expect("empty db is fine");
        assert!(agent.system_prompt.contains("tables of: (none)"));
    }
}
