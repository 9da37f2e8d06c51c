use anyhow::Result;
use futures::stream::BoxStream;
use futures::TryStreamExt;
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::{AgentError, AgentResult};
use crate::model_id::ModelId;
use crate::models::attachment::Attachment;
use crate::models::content::Content;
use crate::models::message::{Message, MessageContent, ToolRequest};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};
use crate::prompt_template::load_prompt_file;
use crate::providers::base::Provider;
use crate::run::{RunContext, RunEvent, RunResponse, ToolExecution};
use crate::systems::System;

const MARKDOWN_INSTRUCTION: &str = "Use markdown to format your answers.";
const ATTACHMENT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Debug, Serialize)]
struct SystemInfo {
    name: String,
    description: String,
    instructions: String,
}

impl SystemInfo {
    fn new(name: &str, description: &str, instructions: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            instructions: instructions.to_string(),
        }
    }
}

#[derive(Serialize)]
struct PromptContext<'a> {
    add_name: bool,
    name: &'a str,
    description: &'a str,
    goal: &'a str,
    instructions: Vec<&'a str>,
    systems: Vec<SystemInfo>,
    datetime: Option<String>,
    additional_context: Option<&'a str>,
}

/// Agent integrates a foundational LLM with the systems it needs to pilot
///
/// An agent is built for a single run: it carries the caller's user and
/// session binding and is dropped once the run's output has been relayed.
pub struct Agent {
    name: String,
    agent_id: String,
    user_id: Option<String>,
    session_id: Option<String>,
    model: ModelId,
    description: String,
    goal: String,
    instructions: Vec<String>,
    additional_context: Option<String>,
    markdown: bool,
    add_datetime_to_instructions: bool,
    add_name_to_instructions: bool,
    debug_mode: bool,
    systems: Vec<Box<dyn System>>,
    provider: Box<dyn Provider>,
}

impl Agent {
    /// Create a new Agent with the specified provider
    pub fn new<S: Into<String>>(agent_id: S, model: ModelId, provider: Box<dyn Provider>) -> Self {
        let agent_id = agent_id.into();
        Self {
            name: agent_id.clone(),
            agent_id,
            user_id: None,
            session_id: None,
            model,
            description: String::new(),
            goal: String::new(),
            instructions: Vec::new(),
            additional_context: None,
            markdown: false,
            add_datetime_to_instructions: false,
            add_name_to_instructions: false,
            debug_mode: false,
            systems: Vec::new(),
            provider,
        }
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_goal<S: Into<String>>(mut self, goal: S) -> Self {
        self.goal = goal.into();
        self
    }

    pub fn with_instructions<I, S>(mut self, instructions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instructions = instructions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_additional_context(mut self, context: Option<String>) -> Self {
        self.additional_context = context;
        self
    }

    pub fn with_markdown(mut self, markdown: bool) -> Self {
        self.markdown = markdown;
        self
    }

    pub fn with_datetime_in_instructions(mut self, enabled: bool) -> Self {
        self.add_datetime_to_instructions = enabled;
        self
    }

    pub fn with_name_in_instructions(mut self, enabled: bool) -> Self {
        self.add_name_to_instructions = enabled;
        self
    }

    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    /// Add a system to the agent
    pub fn add_system(&mut self, system: Box<dyn System>) {
        self.systems.push(system);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn model(&self) -> ModelId {
        self.model
    }

    pub fn instructions(&self) -> &[String] {
        &self.instructions
    }

    pub fn additional_context(&self) -> Option<&str> {
        self.additional_context.as_deref()
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|system| system.name()).collect()
    }

    /// Get all tools from all systems with proper system prefixing
    fn get_prefixed_tools(&self) -> Vec<Tool> {
        let mut tools = Vec::new();
        for system in &self.systems {
            for tool in system.tools() {
                tools.push(Tool::new(
                    format!("{}__{}", system.name(), tool.name),
                    &tool.description,
                    tool.input_schema.clone(),
                ));
            }
        }
        tools
    }

    /// Find the appropriate system for a tool call based on the prefixed name
    fn get_system_for_tool(&self, prefixed_name: &str) -> Option<&dyn System> {
        let parts: Vec<&str> = prefixed_name.split("__").collect();
        if parts.len() != 2 {
            return None;
        }
        let system_name = parts[0];
        self.systems
            .iter()
            .find(|sys| sys.name() == system_name)
            .map(|v| &**v)
    }

    /// Dispatch a single tool call to the appropriate system
    async fn dispatch_tool_call(
        &self,
        tool_call: AgentResult<ToolCall>,
    ) -> AgentResult<Vec<Content>> {
        let call = tool_call?;
        let system = self
            .get_system_for_tool(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        let tool_name = call
            .name
            .split("__")
            .nth(1)
            .ok_or_else(|| AgentError::InvalidToolName(call.name.clone()))?;
        let system_tool_call = ToolCall::new(tool_name, call.arguments);

        system.call(system_tool_call).await
    }

    fn get_system_prompt(&self) -> AgentResult<String> {
        let mut instructions: Vec<&str> = self.instructions.iter().map(String::as_str).collect();
        if self.markdown {
            instructions.push(MARKDOWN_INSTRUCTION);
        }

        let context = PromptContext {
            add_name: self.add_name_to_instructions,
            name: &self.name,
            description: &self.description,
            goal: &self.goal,
            instructions,
            systems: self
                .systems
                .iter()
                .map(|system| {
                    SystemInfo::new(system.name(), system.description(), system.instructions())
                })
                .collect(),
            datetime: self
                .add_datetime_to_instructions
                .then(|| chrono::Local::now().to_rfc2822()),
            additional_context: self.additional_context.as_deref(),
        };

        load_prompt_file("system.md", &context).map_err(|e| AgentError::Internal(e.to_string()))
    }

    /// Attachments are loaded here, once per run, and carried as inline bytes.
    async fn user_message(
        &self,
        message: &str,
        attachments: Option<Vec<Attachment>>,
    ) -> Result<Message> {
        let mut user_message = Message::user().with_text(message);
        let attachments = attachments.unwrap_or_default();
        if attachments.is_empty() {
            return Ok(user_message);
        }

        let client = Client::builder().timeout(ATTACHMENT_FETCH_TIMEOUT).build()?;
        for attachment in &attachments {
            match attachment.load(&client).await? {
                Some(blob) => user_message = user_message.with_blob(blob),
                None => tracing::warn!("Skipping attachment with no url, content or filepath"),
            }
        }
        Ok(user_message)
    }

    fn run_context(&self) -> RunContext {
        RunContext {
            agent_id: self.agent_id.clone(),
            run_id: uuid::Uuid::new_v4().to_string(),
            session_id: self.session_id.clone(),
            model: self.model,
        }
    }

    /// Create a stream that yields each message as it's generated by the agent.
    /// This includes both the assistant's responses and any tool responses.
    pub async fn reply(&self, messages: &[Message]) -> Result<BoxStream<'_, Result<Message>>> {
        let mut messages = messages.to_vec();
        let tools = self.get_prefixed_tools();
        let system_prompt = self.get_system_prompt()?;

        if self.debug_mode {
            tracing::debug!(agent = %self.agent_id, model = %self.model, "system prompt:\n{}", system_prompt);
        }

        Ok(Box::pin(async_stream::try_stream! {
            loop {
                // Get completion from provider
                let (response, usage) = self.provider.complete(
                    &system_prompt,
                    &messages,
                    &tools,
                ).await?;

                if self.debug_mode {
                    tracing::debug!(agent = %self.agent_id, ?usage, message = ?response, "model response");
                }

                yield response.clone();

                // Let the response reach the consumer before potentially long running tools start
                tokio::task::yield_now().await;

                let tool_requests: Vec<&ToolRequest> = response.tool_requests();

                if tool_requests.is_empty() {
                    // No more tool calls, end the reply loop
                    break;
                }

                // Then dispatch each in parallel
                let futures: Vec<_> = tool_requests
                    .iter()
                    .map(|request| self.dispatch_tool_call(request.tool_call.clone()))
                    .collect();

                // Process all the futures in parallel but wait until all are finished
                let outputs = futures::future::join_all(futures).await;

                // Combine the outputs into tool responses using the original IDs
                let mut message_tool_response = Message::user();
                for (request, output) in tool_requests.iter().zip(outputs.into_iter()) {
                    message_tool_response = message_tool_response.with_tool_response(
                        request.id.clone(),
                        output,
                    );
                }

                if self.debug_mode {
                    tracing::debug!(agent = %self.agent_id, message = ?message_tool_response, "tool responses");
                }

                yield message_tool_response.clone();

                messages.push(response);
                messages.push(message_tool_response);
            }
        }))
    }

    /// Run the agent on a single user message, yielding chunks as they are produced.
    ///
    /// Dropping the stream stops the run before the next model or tool call.
    pub async fn run_stream(
        &self,
        message: &str,
        attachments: Option<Vec<Attachment>>,
    ) -> Result<BoxStream<'_, Result<RunResponse>>> {
        let messages = vec![self.user_message(message, attachments).await?];
        let mut replies = self.reply(&messages).await?;
        let context = self.run_context();

        Ok(Box::pin(async_stream::try_stream! {
            yield context.chunk(RunEvent::RunStarted, None, None);

            let mut pending: HashMap<String, ToolExecution> = HashMap::new();
            let mut executions: Vec<ToolExecution> = Vec::new();
            let mut last_text: Option<String> = None;

            while let Some(message) = replies.try_next().await? {
                match message.role {
                    Role::Assistant => {
                        let text = message.text();
                        if !text.is_empty() {
                            last_text = Some(text.clone());
                            yield context.chunk(RunEvent::RunResponse, Some(text), None);
                        }
                        for request in message.tool_requests() {
                            let (tool_name, tool_args) = match &request.tool_call {
                                Ok(call) => (call.name.clone(), call.arguments.clone()),
                                Err(e) => (e.to_string(), serde_json::Value::Null),
                            };
                            let execution = ToolExecution {
                                tool_call_id: request.id.clone(),
                                tool_name,
                                tool_args,
                                content: None,
                                tool_call_error: false,
                            };
                            pending.insert(request.id.clone(), execution.clone());
                            yield context.chunk(RunEvent::ToolCallStarted, None, Some(vec![execution]));
                        }
                    }
                    Role::User => {
                        for content in &message.content {
                            let MessageContent::ToolResponse(response) = content else {
                                continue;
                            };
                            let mut execution = pending.remove(&response.id).unwrap_or_else(|| ToolExecution {
                                tool_call_id: response.id.clone(),
                                tool_name: String::new(),
                                tool_args: serde_json::Value::Null,
                                content: None,
                                tool_call_error: false,
                            });
                            match &response.tool_result {
                                Ok(_) => {
                                    execution.content = content.as_tool_response_text();
                                }
                                Err(e) => {
                                    execution.content = Some(e.to_string());
                                    execution.tool_call_error = true;
                                }
                            }
                            executions.push(execution.clone());
                            yield context.chunk(
                                RunEvent::ToolCallCompleted,
                                execution.content.clone(),
                                Some(vec![execution]),
                            );
                        }
                    }
                }
            }

            let tools = (!executions.is_empty()).then_some(executions);
            yield context.chunk(RunEvent::RunCompleted, last_text, tools);
        }))
    }

    /// Run the agent to completion and return the final chunk
    pub async fn run(
        &self,
        message: &str,
        attachments: Option<Vec<Attachment>>,
    ) -> Result<RunResponse> {
        let mut stream = self.run_stream(message, attachments).await?;
        let mut last = None;
        while let Some(chunk) = stream.try_next().await? {
            last = Some(chunk);
        }
        last.ok_or_else(|| anyhow::anyhow!("Agent run produced no output"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;
    use async_trait::async_trait;
    use futures::StreamExt;
    use serde_json::json;

    // Mock system for testing
    #[derive(Clone)]
    struct MockSystem {
        name: String,
        tools: Vec<Tool>,
    }

    impl MockSystem {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                tools: vec![Tool::new(
                    "echo",
                    "Echoes back the input",
                    json!({"type": "object", "properties": {"message": {"type": "string"}}, "required": ["message"]}),
                )],
            }
        }
    }

    #[async_trait]
    impl System for MockSystem {
        fn name(&self) -> &str {
            &self.name
        }

        fn description(&self) -> &str {
            "A mock system for testing"
        }

        fn instructions(&self) -> &str {
            "Mock system instructions"
        }

        fn tools(&self) -> &[Tool] {
            &self.tools
        }

        async fn call(&self, tool_call: ToolCall) -> AgentResult<Vec<Content>> {
            match tool_call.name.as_str() {
                "echo" => Ok(vec![Content::text(
                    tool_call.arguments["message"].as_str().unwrap_or(""),
                )]),
                _ => Err(AgentError::ToolNotFound(tool_call.name)),
            }
        }
    }

    fn agent_with(provider: MockProvider) -> Agent {
        let mut agent = Agent::new("test-agent", ModelId::default(), Box::new(provider));
        agent.add_system(Box::new(MockSystem::new("test")));
        agent
    }

    #[tokio::test]
    async fn test_simple_response() -> Result<()> {
        let response = Message::assistant().with_text("Hello!");
        let provider = MockProvider::new(vec![response.clone()]);
        let agent = Agent::new("test-agent", ModelId::default(), Box::new(provider));

        let initial_messages = vec![Message::user().with_text("Hi")];

        let mut stream = agent.reply(&initial_messages).await?;
        let mut messages = Vec::new();
        while let Some(msg) = stream.try_next().await? {
            messages.push(msg);
        }

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0], response);
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_call() -> Result<()> {
        let agent = agent_with(MockProvider::new(vec![
            Message::assistant().with_tool_request(
                "1",
                Ok(ToolCall::new("test__echo", json!({"message": "test"}))),
            ),
            Message::assistant().with_text("Done!"),
        ]));

        let initial_messages = vec![Message::user().with_text("Echo test")];

        let mut stream = agent.reply(&initial_messages).await?;
        let mut messages = Vec::new();
        while let Some(msg) = stream.try_next().await? {
            messages.push(msg);
        }

        // Should have three messages: tool request, response, and model text
        assert_eq!(messages.len(), 3);
        assert!(messages[0]
            .content
            .iter()
            .any(|c| matches!(c, MessageContent::ToolRequest(_))));
        assert_eq!(
            messages[1].content[0].as_tool_response_text().as_deref(),
            Some("test")
        );
        assert_eq!(messages[2].content[0], MessageContent::text("Done!"));
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_tool() -> Result<()> {
        let agent = agent_with(MockProvider::new(vec![
            Message::assistant()
                .with_tool_request("1", Ok(ToolCall::new("invalid_tool", json!({})))),
            Message::assistant().with_text("Error occurred"),
        ]));

        let initial_messages = vec![Message::user().with_text("Invalid tool")];

        let mut stream = agent.reply(&initial_messages).await?;
        let mut messages = Vec::new();
        while let Some(msg) = stream.try_next().await? {
            messages.push(msg);
        }

        // Should have three messages: failed tool request, fail response, and model text
        assert_eq!(messages.len(), 3);
        let response = messages[1].content[0].as_tool_response().unwrap();
        assert_eq!(
            response.tool_result,
            Err(AgentError::ToolNotFound("invalid_tool".into()))
        );
        assert_eq!(
            messages[2].content[0],
            MessageContent::text("Error occurred")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_multiple_tool_calls() -> Result<()> {
        let agent = agent_with(MockProvider::new(vec![
            Message::assistant()
                .with_tool_request(
                    "1",
                    Ok(ToolCall::new("test__echo", json!({"message": "first"}))),
                )
                .with_tool_request(
                    "2",
                    Ok(ToolCall::new("test__echo", json!({"message": "second"}))),
                ),
            Message::assistant().with_text("All done!"),
        ]));

        let initial_messages = vec![Message::user().with_text("Multiple calls")];

        let mut stream = agent.reply(&initial_messages).await?;
        let mut messages = Vec::new();
        while let Some(msg) = stream.try_next().await? {
            messages.push(msg);
        }

        assert_eq!(messages.len(), 3);
        // Responses keep the order of the requests
        let ids: Vec<&str> = messages[1]
            .content
            .iter()
            .filter_map(|c| c.as_tool_response().map(|r| r.id.as_str()))
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(messages[2].content[0], MessageContent::text("All done!"));
        Ok(())
    }

    #[tokio::test]
    async fn test_history_grows_between_turns() -> Result<()> {
        let provider = MockProvider::new(vec![
            Message::assistant().with_tool_request(
                "1",
                Ok(ToolCall::new("test__echo", json!({"message": "ping"}))),
            ),
            Message::assistant().with_text("pong"),
        ]);
        let agent = agent_with(provider.clone());

        agent.run("go", None).await?;

        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].len(), 1);
        // user message, tool request, tool response
        assert_eq!(calls[1].len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_run_stream_events_in_order() -> Result<()> {
        let agent = agent_with(MockProvider::new(vec![
            Message::assistant()
                .with_text("Checking.")
                .with_tool_request(
                    "1",
                    Ok(ToolCall::new("test__echo", json!({"message": "hello"}))),
                ),
            Message::assistant().with_text("Finished."),
        ]));

        let chunks: Vec<RunResponse> = agent.run_stream("go", None).await?.try_collect().await?;
        let events: Vec<RunEvent> = chunks.iter().map(|c| c.event).collect();
        assert_eq!(
            events,
            vec![
                RunEvent::RunStarted,
                RunEvent::RunResponse,
                RunEvent::ToolCallStarted,
                RunEvent::ToolCallCompleted,
                RunEvent::RunResponse,
                RunEvent::RunCompleted,
            ]
        );

        let run_id = &chunks[0].run_id;
        assert!(chunks.iter().all(|c| &c.run_id == run_id));
        assert_eq!(chunks[1].content.as_deref(), Some("Checking."));
        assert_eq!(chunks[3].content.as_deref(), Some("hello"));

        let completed = chunks.last().unwrap();
        assert_eq!(completed.content.as_deref(), Some("Finished."));
        let tools = completed.tools.as_ref().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].tool_name, "test__echo");
        assert!(!tools[0].tool_call_error);
        Ok(())
    }

    #[tokio::test]
    async fn test_run_returns_final_content() -> Result<()> {
        let agent = agent_with(MockProvider::new(vec![
            Message::assistant().with_tool_request(
                "1",
                Ok(ToolCall::new("test__missing", json!({}))),
            ),
            Message::assistant().with_text("Report ready."),
        ]));

        let response = agent.run("scan host", None).await?;
        assert_eq!(response.event, RunEvent::RunCompleted);
        assert_eq!(response.content.as_deref(), Some("Report ready."));
        let tools = response.tools.unwrap();
        assert!(tools[0].tool_call_error);
        Ok(())
    }

    struct RewriteSystem {
        path: std::path::PathBuf,
        tools: Vec<Tool>,
    }

    #[async_trait]
    impl System for RewriteSystem {
        fn name(&self) -> &str {
            "files"
        }

        fn description(&self) -> &str {
            "Rewrites a file"
        }

        fn instructions(&self) -> &str {
            ""
        }

        fn tools(&self) -> &[Tool] {
            &self.tools
        }

        async fn call(&self, _tool_call: ToolCall) -> AgentResult<Vec<Content>> {
            tokio::fs::write(&self.path, "changed")
                .await
                .map_err(|e| AgentError::ExecutionError(e.to_string()))?;
            Ok(vec![Content::text("rewritten")])
        }
    }

    #[tokio::test]
    async fn test_file_attachment_is_read_once_per_run() -> Result<()> {
        let file = tempfile::NamedTempFile::new()?;
        std::fs::write(file.path(), "hello")?;

        let provider = MockProvider::new(vec![
            Message::assistant().with_tool_request("1", Ok(ToolCall::new("files__rewrite", json!({})))),
            Message::assistant().with_text("done"),
        ]);
        let mut agent = Agent::new("test-agent", ModelId::default(), Box::new(provider.clone()));
        agent.add_system(Box::new(RewriteSystem {
            path: file.path().to_path_buf(),
            tools: vec![Tool::new("rewrite", "Rewrite the file", json!({"type": "object", "properties": {}}))],
        }));

        let attachment = Attachment::from_filepath(file.path().to_string_lossy());
        agent.run("read this", Some(vec![attachment])).await?;

        assert_eq!(std::fs::read_to_string(file.path())?, "changed");
        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        let expected = MessageContent::blob("aGVsbG8=", "text/plain");
        assert_eq!(calls[0][0].content[1], expected);
        assert_eq!(calls[1][0].content[1], expected);
        Ok(())
    }

    #[tokio::test]
    async fn test_unreadable_attachment_fails_the_run() {
        let agent = agent_with(MockProvider::new(vec![]));
        let attachment = Attachment::from_filepath("/nonexistent/nmap_syn.txt");
        assert!(agent.run_stream("read this", Some(vec![attachment])).await.is_err());
    }

    #[tokio::test]
    async fn test_attachments_reach_the_provider() -> Result<()> {
        let provider = MockProvider::new(vec![Message::assistant().with_text("ok")]);
        let agent = agent_with(provider.clone());

        agent
            .run("read this", Some(vec![Attachment::from_content("10.0.0.0/24")]))
            .await?;
        agent.run("no files", None).await?;

        let calls = provider.calls();
        let with_file = &calls[0][0];
        assert_eq!(
            with_file.content[1],
            MessageContent::blob("MTAuMC4wLjAvMjQ=", "text/plain")
        );
        let without = &calls[1][0];
        assert_eq!(without.content.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_provider_error_ends_stream_with_error() -> Result<()> {
        let agent = agent_with(MockProvider::with_results(vec![Err("quota exceeded".into())]));

        let mut stream = agent.run_stream("go", None).await?;
        let first = stream.next().await.unwrap()?;
        assert_eq!(first.event, RunEvent::RunStarted);
        let second = stream.next().await.unwrap();
        assert!(second.unwrap_err().to_string().contains("quota exceeded"));

        let buffered = agent_with(MockProvider::with_results(vec![Err("quota exceeded".into())]));
        assert!(buffered.run("go", None).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_dropping_stream_stops_the_run() -> Result<()> {
        let provider = MockProvider::new(vec![
            Message::assistant().with_tool_request(
                "1",
                Ok(ToolCall::new("test__echo", json!({"message": "a"}))),
            ),
            Message::assistant().with_text("never requested"),
        ]);
        let agent = agent_with(provider.clone());

        {
            let mut stream = agent.run_stream("go", None).await?;
            // RunStarted, then the first model turn
            stream.next().await;
            stream.next().await;
        }

        assert_eq!(provider.calls().len(), 1);
        Ok(())
    }

    #[test]
    fn test_system_prompt_contents() -> Result<()> {
        let agent = agent_with(MockProvider::new(vec![]))
            .with_name("Tester")
            .with_description("You test things.")
            .with_goal("Find bugs.")
            .with_instructions(["Be concise.", "Use the echo tool."])
            .with_additional_context(Some("<context>user: alice</context>".into()))
            .with_markdown(true)
            .with_name_in_instructions(true)
            .with_datetime_in_instructions(true);

        let prompt = agent.get_system_prompt()?;
        assert!(prompt.contains("Your name is: Tester."));
        assert!(prompt.contains("You test things."));
        assert!(prompt.contains("<your_goal>\nFind bugs.\n</your_goal>"));
        assert!(prompt.contains("- Be concise.\n- Use the echo tool.\n- Use markdown"));
        assert!(prompt.contains("## test\nA mock system for testing"));
        assert!(prompt.contains("The current time is"));
        assert!(prompt.contains("<context>user: alice</context>"));
        Ok(())
    }

    #[test]
    fn test_system_prompt_optional_sections() -> Result<()> {
        let agent = Agent::new("bare", ModelId::default(), Box::new(MockProvider::new(vec![])))
            .with_description("Plain.");
        let prompt = agent.get_system_prompt()?;
        assert!(!prompt.contains("Your name is"));
        assert!(!prompt.contains("<systems>"));
        assert!(!prompt.contains("The current time is"));
        Ok(())
    }

    #[test]
    fn test_prefixed_tools() {
        let agent = agent_with(MockProvider::new(vec![]));
        let tools = agent.get_prefixed_tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "test__echo");
        assert!(agent.get_system_for_tool("test__echo").is_some());
        assert!(agent.get_system_for_tool("other__echo").is_none());
        assert!(agent.get_system_for_tool("test__echo__extra").is_none());
    }
}
