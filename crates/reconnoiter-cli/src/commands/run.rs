use anyhow::{anyhow, Context, Result};
use console::style;
use serde_json::Value;
use std::path::PathBuf;

use crate::client::{AttachmentBody, ReconClient, RunBody};

pub struct RunOptions {
    pub agent: String,
    pub model: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub attachments: Vec<PathBuf>,
    pub mime_type: Option<String>,
    pub stream: bool,
    pub raw: bool,
}

/// Attachments travel inline as JSON strings, so only UTF-8 text files can be sent.
async fn read_attachments(
    paths: &[PathBuf],
    mime_type: Option<&str>,
) -> Result<Option<Vec<AttachmentBody>>> {
    if paths.is_empty() {
        return Ok(None);
    }
    let mut attachments = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read attachment {}", path.display()))?;
        let content = String::from_utf8(bytes).map_err(|_| {
            anyhow!(
                "Attachment {} is not UTF-8 text; only text files can be attached",
                path.display()
            )
        })?;
        attachments.push(AttachmentBody {
            content,
            mime_type: mime_type.map(str::to_string),
        });
    }
    Ok(Some(attachments))
}

/// Human readable form of one chunk, or `None` for events with nothing to show
fn render_chunk(chunk: &Value) -> Option<String> {
    let tools = chunk
        .get("tools")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    match chunk.get("event").and_then(Value::as_str)? {
        "RunResponse" => chunk.get("content").and_then(Value::as_str).map(str::to_string),
        "ToolCallStarted" => Some(
            tools
                .iter()
                .map(|tool| {
                    format!(
                        "{} {} {}",
                        style("tool").dim(),
                        style(tool["tool_name"].as_str().unwrap_or("unknown")).magenta(),
                        style(&tool["tool_args"]).dim()
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        "ToolCallCompleted" => tools
            .iter()
            .filter(|tool| tool["tool_call_error"].as_bool().unwrap_or(false))
            .map(|tool| {
                format!(
                    "{} {}",
                    style("tool failed:").red(),
                    tool["content"].as_str().unwrap_or_default()
                )
            })
            .reduce(|a, b| format!("{}\n{}", a, b)),
        _ => None,
    }
}

pub async fn execute(client: &ReconClient, message: &str, options: RunOptions) -> Result<()> {
    let body = RunBody {
        message: message.to_string(),
        stream: options.stream,
        model_id: options.model,
        user_id: options.user_id,
        session_id: options.session_id,
        attachments: read_attachments(&options.attachments, options.mime_type.as_deref())
            .await?,
    };

    if !options.stream {
        println!("{}", client.run_buffered(&options.agent, &body).await?);
        return Ok(());
    }

    let raw = options.raw;
    client
        .run_stream(&options.agent, &body, |chunk| {
            if raw {
                println!("{}", chunk);
            } else if let Some(text) = render_chunk(&chunk) {
                println!("{}", text);
            }
            Ok(())
        })
        .await
}
