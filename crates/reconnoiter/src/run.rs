//! Chunks produced by an agent run.
//!
//! A streamed run yields one [`RunResponse`] per event; a buffered run
//! returns only the final `RunCompleted` chunk.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::Display;

use crate::model_id::ModelId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum RunEvent {
    RunStarted,
    RunResponse,
    ToolCallStarted,
    ToolCallCompleted,
    RunCompleted,
}

/// One tool invocation made during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecution {
    pub tool_call_id: String,
    pub tool_name: String,
    pub tool_args: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub tool_call_error: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResponse {
    pub event: RunEvent,
    pub content: Option<String>,
    pub content_type: String,
    pub agent_id: String,
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub model: ModelId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolExecution>>,
    pub created_at: i64,
}

impl RunResponse {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Stamps every chunk of one run with the same identity
#[derive(Debug, Clone)]
pub(crate) struct RunContext {
    pub agent_id: String,
    pub run_id: String,
    pub session_id: Option<String>,
    pub model: ModelId,
}

impl RunContext {
    pub fn chunk(
        &self,
        event: RunEvent,
        content: Option<String>,
        tools: Option<Vec<ToolExecution>>,
    ) -> RunResponse {
        RunResponse {
            event,
            content,
            content_type: "str".to_string(),
            agent_id: self.agent_id.clone(),
            run_id: self.run_id.clone(),
            session_id: self.session_id.clone(),
            model: self.model,
            tools,
            created_at: Utc::now().timestamp(),
        }
    }
}
