use anyhow::{anyhow, Result};
use regex::Regex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};

use crate::errors::AgentError;
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};

use super::base::Usage;

/// Convert internal Message format to Gemini's `contents` specification
///
/// Gemini identifies function responses by name rather than by call id, so the
/// names of earlier tool requests are tracked while walking the history.
pub fn messages_to_gemini_spec(messages: &[Message]) -> Result<Vec<Value>> {
    let mut contents = Vec::new();
    let mut tool_names: HashMap<&str, String> = HashMap::new();

    for message in messages {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "model",
        };
        let mut parts = Vec::new();

        for content in &message.content {
            match content {
                MessageContent::Text(text) => {
                    if !text.text.is_empty() {
                        parts.push(json!({ "text": text.text }));
                    }
                }
                MessageContent::Blob(blob) => {
                    parts.push(json!({
                        "inlineData": {
                            "mimeType": blob.mime_type,
                            "data": blob.data,
                        }
                    }));
                }
                MessageContent::ToolRequest(request) => match &request.tool_call {
                    Ok(tool_call) => {
                        let name = sanitize_function_name(&tool_call.name);
                        tool_names.insert(&request.id, name.clone());
                        parts.push(json!({
                            "functionCall": {
                                "name": name,
                                "args": tool_call.arguments,
                            }
                        }));
                    }
                    Err(e) => {
                        parts.push(json!({
                            "text": format!("Tool request {} could not be interpreted: {}", request.id, e)
                        }));
                    }
                },
                MessageContent::ToolResponse(response) => {
                    let Some(name) = tool_names.get(response.id.as_str()) else {
                        // The request was malformed, so there is no function to answer to
                        if let Err(e) = &response.tool_result {
                            parts.push(json!({ "text": format!("Error: {}", e) }));
                        }
                        continue;
                    };
                    match &response.tool_result {
                        Ok(contents) => {
                            let text: Vec<&str> =
                                contents.iter().filter_map(|c| c.as_text()).collect();
                            parts.push(json!({
                                "functionResponse": {
                                    "name": name,
                                    "response": { "result": text.join("\n") },
                                }
                            }));
                        }
                        Err(e) => {
                            parts.push(json!({
                                "functionResponse": {
                                    "name": name,
                                    "response": { "error": e.to_string() },
                                }
                            }));
                        }
                    }
                }
            }
        }

        if !parts.is_empty() {
            contents.push(json!({ "role": role, "parts": parts }));
        }
    }

    Ok(contents)
}

/// Convert internal Tool format to Gemini's `tools` specification
pub fn tools_to_gemini_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = HashSet::new();
    let mut declarations = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        let mut declaration = json!({
            "name": tool.name,
            "description": tool.description,
        });
        // Gemini rejects object schemas without properties
        let has_properties = tool
            .input_schema
            .get("properties")
            .and_then(|p| p.as_object())
            .is_some_and(|p| !p.is_empty());
        if has_properties {
            declaration["parameters"] = tool.input_schema.clone();
        }
        declarations.push(declaration);
    }

    if declarations.is_empty() {
        return Ok(vec![]);
    }
    Ok(vec![json!({ "functionDeclarations": declarations })])
}

/// Convert a Gemini `generateContent` response to internal Message format
pub fn gemini_response_to_message(response: &Value) -> Result<Message> {
    let candidate = response
        .get("candidates")
        .and_then(|c| c.get(0))
        .ok_or_else(|| {
            let reason = response
                .pointer("/promptFeedback/blockReason")
                .and_then(|r| r.as_str())
                .unwrap_or("no candidates returned");
            anyhow!("Gemini returned no response: {}", reason)
        })?;

    let mut content = Vec::new();
    let parts = candidate
        .pointer("/content/parts")
        .and_then(|p| p.as_array())
        .cloned()
        .unwrap_or_default();

    for part in parts {
        if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
            content.push(MessageContent::text(text));
        } else if let Some(call) = part.get("functionCall") {
            let id = call
                .get("id")
                .and_then(|v| v.as_str())
                .map(String::from)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let name = call
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let args = call.get("args").cloned().unwrap_or_else(|| json!({}));

            if !is_valid_function_name(&name) {
                content.push(MessageContent::tool_request(
                    id,
                    Err(AgentError::InvalidToolName(name)),
                ));
            } else if !args.is_object() {
                let error = AgentError::InvalidParameters(format!(
                    "Could not interpret tool use parameters for id {}: expected an object",
                    id
                ));
                content.push(MessageContent::tool_request(id, Err(error)));
            } else {
                content.push(MessageContent::tool_request(id, Ok(ToolCall::new(name, args))));
            }
        }
    }

    Ok(Message {
        role: Role::Assistant,
        created: chrono::Utc::now().timestamp(),
        content,
    })
}

pub fn gemini_usage(response: &Value) -> Usage {
    let metadata = response.get("usageMetadata");
    let count = |key: &str| {
        metadata
            .and_then(|m| m.get(key))
            .and_then(|v| v.as_i64())
            .map(|v| v as i32)
    };

    let input_tokens = count("promptTokenCount");
    let output_tokens = count("candidatesTokenCount");
    let total_tokens = count("totalTokenCount").or(match (input_tokens, output_tokens) {
        (Some(input), Some(output)) => Some(input + output),
        _ => None,
    });

    Usage::new(input_tokens, output_tokens, total_tokens)
}

fn sanitize_function_name(name: &str) -> String {
    let re = Regex::new(r"[^a-zA-Z0-9_.-]").unwrap();
    re.replace_all(name, "_").to_string()
}

fn is_valid_function_name(name: &str) -> bool {
    let re = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_.-]{0,63}$").unwrap();
    re.is_match(name)
}
