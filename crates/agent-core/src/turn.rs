//! Turn Loop
//!
//! Drives a single user turn from question to final natural-language answer,
//! possibly via multiple rounds of tool invocation. Each round sends the
//! system prompt, prior history, and every message produced so far this turn
//! to the provider; tool-call responses are dispatched and their results
//! appended as tool messages before the next round.
//!
//! A provider failure aborts the turn before anything is handed back, so
//! caller history is never left half-updated. A tool failure is not fatal:
//! it flows back to the model as ordinary tool output.

use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::ChatProvider;
use crate::tool::ToolRegistry;

/// Hard cap on model rounds per turn; guards against a model that never
/// stops calling tools.
pub const DEFAULT_MAX_ROUNDS: usize = 8;

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System prompt sent at the head of every request
    pub system_prompt: String,

    /// Maximum model rounds in a single turn
    pub max_rounds: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful assistant.".into(),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

/// Outcome of one completed user turn
#[derive(Clone, Debug)]
pub struct Turn {
    /// Final natural-language answer
    pub answer: String,

    /// Every message the turn produced, in order: the user message, any
    /// assistant tool-call messages with their tool results, and the final
    /// assistant answer. Callers append this to their conversation state;
    /// dropping the tool messages would silently discard context the model
    /// needs on later turns.
    pub appended: Vec<Message>,
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn ChatProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(provider: Arc<dyn ChatProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self::new(provider, tools, AgentConfig::default())
    }

    /// Run one user turn against the given prior history
    ///
    /// History is borrowed, never mutated; on success the returned
    /// [`Turn::appended`] holds the increment the caller should apply.
    pub async fn run_turn(&self, history: &[Message], user_message: &str) -> Result<Turn> {
        let schemas = self.tools.schemas();
        let mut appended = vec![Message::user(user_message)];
        let mut rounds = 0;

        loop {
            rounds += 1;
            if rounds > self.config.max_rounds {
                return Err(AgentError::MaxRounds(self.config.max_rounds));
            }

            let mut request = Vec::with_capacity(1 + history.len() + appended.len());
            request.push(Message::system(&self.config.system_prompt));
            request.extend_from_slice(history);
            request.extend(appended.iter().cloned());

            let completion = self.provider.complete(&request, &schemas).await?;

            if completion.wants_tools() {
                let calls = completion.tool_calls;
                appended.push(Message::assistant_tool_calls(
                    completion.content.unwrap_or_default(),
                    calls.clone(),
                ));

                for call in &calls {
                    tracing::debug!(tool = %call.name, id = %call.id, "Dispatching tool call");
                    let result = self.tools.dispatch(call).await;
                    appended.push(Message::tool(result.output, call.id.as_str()));
                }

                continue;
            }

            let answer = completion.content.unwrap_or_default();
            appended.push(Message::assistant(&answer));
            return Ok(Turn { answer, appended });
        }
    }

    /// Run a one-off question with no prior history
    pub async fn ask(&self, question: &str) -> Result<String> {
        let turn = self.run_turn(&[], question).await?;
        Ok(turn.answer)
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn ChatProvider>>,
    tools: ToolRegistry,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: ToolRegistry::new(),
            config: AgentConfig::default(),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tool<T: crate::tool::Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn max_rounds(mut self, max: usize) -> Self {
        self.config.max_rounds = max;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        Ok(Agent::new(provider, Arc::new(self.tools), self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use crate::provider::{Completion, FinishReason, ProviderInfo};
    use crate::tool::{ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Plays the model from a fixed script of completions.
    struct ScriptedProvider {
        script: Mutex<Vec<Completion>>,
        fail: bool,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Completion>) -> Self {
            Self {
                script: Mutex::new(script),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                script: Mutex::new(Vec::new()),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        fn info(&self) -> ProviderInfo {
            ProviderInfo {
                name: "Scripted".into(),
                model: "test".into(),
                supports_tools: true,
            }
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(!self.fail)
        }

        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[ToolSchema],
        ) -> Result<Completion> {
            if self.fail {
                return Err(AgentError::Provider("connection refused".into()));
            }
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                // Past the end of the script, keep asking for tools so the
                // round cap can be exercised.
                return Ok(tool_round(vec![call("call_x", "probe")]));
            }
            Ok(script.remove(0))
        }
    }

    struct ProbeTool;

    #[async_trait]
    impl Tool for ProbeTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "probe".into(),
                description: "Probe tool for tests".into(),
                parameters: vec![ParameterSchema::optional_string("target", "Probe target")],
            }
        }

        async fn execute(&self, _call: &ToolCall) -> Result<ToolResult> {
            Ok(ToolResult::success("probe", "{\"status\":\"ok\"}"))
        }
    }

    fn call(id: &str, name: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: name.into(),
            arguments: HashMap::new(),
        }
    }

    fn tool_round(calls: Vec<ToolCall>) -> Completion {
        Completion {
            content: None,
            tool_calls: calls,
            model: "test".into(),
            usage: None,
            finish_reason: Some(FinishReason::ToolCalls),
        }
    }

    fn final_answer(text: &str) -> Completion {
        Completion {
            content: Some(text.into()),
            tool_calls: Vec::new(),
            model: "test".into(),
            usage: None,
            finish_reason: Some(FinishReason::Stop),
        }
    }

    fn agent_with(provider: ScriptedProvider) -> Agent {
        AgentBuilder::new()
            .provider(Arc::new(provider))
            .tool(ProbeTool)
            .system_prompt("You are a factory assistant.")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_direct_answer_turn() {
        let agent = agent_with(ScriptedProvider::new(vec![final_answer("All good.")]));

        let turn = agent.run_turn(&[], "How was production?").await.unwrap();
        assert_eq!(turn.answer, "All good.");
        // user + final assistant
        assert_eq!(turn.appended.len(), 2);
        assert_eq!(turn.appended[0].role, Role::User);
        assert_eq!(turn.appended[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_two_tool_calls_in_one_model_turn() {
        let agent = agent_with(ScriptedProvider::new(vec![
            tool_round(vec![call("call_1", "probe"), call("call_2", "probe")]),
            final_answer("Both probes done."),
        ]));

        let turn = agent.run_turn(&[], "Probe twice").await.unwrap();

        // user, 1 assistant tool-call message, 2 tool results, final answer
        assert_eq!(turn.appended.len(), 5);
        assert!(turn.appended[1].has_tool_calls());
        assert_eq!(turn.appended[2].role, Role::Tool);
        assert_eq!(turn.appended[2].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(turn.appended[3].tool_call_id.as_deref(), Some("call_2"));
        assert_eq!(turn.appended[4].content, "Both probes done.");
    }

    #[tokio::test]
    async fn test_unknown_tool_does_not_abort_turn() {
        let agent = agent_with(ScriptedProvider::new(vec![
            tool_round(vec![call("call_1", "no_such_tool")]),
            final_answer("Sorry, that tool is unavailable."),
        ]));

        let turn = agent.run_turn(&[], "Use the mystery tool").await.unwrap();
        assert_eq!(turn.answer, "Sorry, that tool is unavailable.");

        let tool_msg = &turn.appended[2];
        assert_eq!(tool_msg.role, Role::Tool);
        assert!(tool_msg.content.contains("Unknown tool"));
    }

    #[tokio::test]
    async fn test_provider_error_aborts_turn() {
        let agent = agent_with(ScriptedProvider::failing());

        let err = agent.run_turn(&[], "Hello").await.unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
    }

    #[tokio::test]
    async fn test_round_cap_terminates_adversarial_model() {
        let agent = AgentBuilder::new()
            .provider(Arc::new(ScriptedProvider::new(Vec::new())))
            .tool(ProbeTool)
            .max_rounds(3)
            .build()
            .unwrap();

        let err = agent.run_turn(&[], "Loop forever").await.unwrap_err();
        assert!(matches!(err, AgentError::MaxRounds(3)));
    }

    #[tokio::test]
    async fn test_history_is_only_borrowed() {
        let history = vec![Message::user("earlier"), Message::assistant("noted")];
        let agent = agent_with(ScriptedProvider::new(vec![final_answer("ok")]));

        let turn = agent.run_turn(&history, "again").await.unwrap();
        // Prior history is not replayed inside the increment.
        assert_eq!(turn.appended.len(), 2);
        assert_eq!(history.len(), 2);
    }
}
