use async_trait::async_trait;
use indoc::indoc;
use serde_json::{json, Value};
use tokio::process::Command;

use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};
use crate::systems::System;

pub const DEFAULT_DOCKER_BINARY: &str = "docker";

/// Which groups of docker commands the system exposes to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DockerCapabilities {
    pub containers: bool,
    pub images: bool,
    pub networks: bool,
    pub volumes: bool,
}

impl DockerCapabilities {
    pub fn all() -> Self {
        Self {
            containers: true,
            images: true,
            networks: true,
            volumes: true,
        }
    }
}

impl Default for DockerCapabilities {
    fn default() -> Self {
        Self {
            containers: true,
            images: false,
            networks: false,
            volumes: false,
        }
    }
}

/// Drives the local docker daemon through the docker CLI
#[derive(Clone)]
pub struct DockerSystem {
    binary: String,
    tools: Vec<Tool>,
}

impl DockerSystem {
    pub fn new(capabilities: DockerCapabilities) -> Self {
        Self::with_binary(DEFAULT_DOCKER_BINARY, capabilities)
    }

    pub fn with_binary<S: Into<String>>(binary: S, capabilities: DockerCapabilities) -> Self {
        let mut tools = Vec::new();

        if capabilities.containers {
            tools.push(Tool::new(
                "list_containers",
                "List docker containers. Running containers only unless `all` is true.",
                json!({
                    "type": "object",
                    "properties": {
                        "all": {"type": "boolean", "description": "Include stopped containers."}
                    }
                }),
            ));
            tools.push(Tool::new(
                "run_container",
                "Start a new detached container with an interactive shell kept alive.",
                json!({
                    "type": "object",
                    "required": ["image"],
                    "properties": {
                        "image": {"type": "string", "description": "The image to run, e.g. kali:withtools."},
                        "name": {"type": "string", "description": "Name for the container."},
                        "network": {"type": "string", "description": "Network to attach, e.g. host."},
                        "command": {"type": "string", "description": "Shell command to run instead of the image default."}
                    }
                }),
            ));
            tools.push(Tool::new(
                "exec_in_container",
                "Run a bash command inside a running container and return its combined output.",
                json!({
                    "type": "object",
                    "required": ["container", "command"],
                    "properties": {
                        "container": {"type": "string", "description": "Container name or id."},
                        "command": {"type": "string", "description": "The bash command to run."}
                    }
                }),
            ));
            tools.push(Tool::new(
                "stop_container",
                "Stop a running container.",
                json!({
                    "type": "object",
                    "required": ["container"],
                    "properties": {
                        "container": {"type": "string", "description": "Container name or id."}
                    }
                }),
            ));
            tools.push(Tool::new(
                "remove_container",
                "Remove a container.",
                json!({
                    "type": "object",
                    "required": ["container"],
                    "properties": {
                        "container": {"type": "string", "description": "Container name or id."},
                        "force": {"type": "boolean", "description": "Kill the container first if it is running."}
                    }
                }),
            ));
            tools.push(Tool::new(
                "container_logs",
                "Fetch the logs of a container.",
                json!({
                    "type": "object",
                    "required": ["container"],
                    "properties": {
                        "container": {"type": "string", "description": "Container name or id."},
                        "tail": {"type": "integer", "description": "Number of lines from the end of the logs."}
                    }
                }),
            ));
        }

        if capabilities.images {
            tools.push(Tool::new(
                "list_images",
                "List local docker images.",
                json!({"type": "object", "properties": {}}),
            ));
            tools.push(Tool::new(
                "pull_image",
                "Pull an image from a registry.",
                json!({
                    "type": "object",
                    "required": ["image"],
                    "properties": {
                        "image": {"type": "string", "description": "Image reference to pull."}
                    }
                }),
            ));
        }

        if capabilities.networks {
            tools.push(Tool::new(
                "list_networks",
                "List docker networks.",
                json!({"type": "object", "properties": {}}),
            ));
            tools.push(Tool::new(
                "connect_to_network",
                "Connect a container to a network.",
                json!({
                    "type": "object",
                    "required": ["network", "container"],
                    "properties": {
                        "network": {"type": "string", "description": "Network name or id."},
                        "container": {"type": "string", "description": "Container name or id."}
                    }
                }),
            ));
        }

        if capabilities.volumes {
            tools.push(Tool::new(
                "list_volumes",
                "List docker volumes.",
                json!({"type": "object", "properties": {}}),
            ));
            tools.push(Tool::new(
                "create_volume",
                "Create a named volume.",
                json!({
                    "type": "object",
                    "required": ["name"],
                    "properties": {
                        "name": {"type": "string", "description": "Name of the volume."}
                    }
                }),
            ));
        }

        Self {
            binary: binary.into(),
            tools,
        }
    }

    fn command_args(&self, tool_call: &ToolCall) -> AgentResult<Vec<String>> {
        let params = &tool_call.arguments;
        let args = match tool_call.name.as_str() {
            "list_containers" => {
                let mut args = vec!["ps".to_string()];
                if params.get("all").and_then(Value::as_bool).unwrap_or(false) {
                    args.push("--all".to_string());
                }
                args
            }
            "run_container" => {
                let mut args = vec![
                    "run".to_string(),
                    "--detach".to_string(),
                    "--interactive".to_string(),
                    "--tty".to_string(),
                ];
                if let Some(name) = optional_str(params, "name") {
                    args.extend(["--name".to_string(), name.to_string()]);
                }
                if let Some(network) = optional_str(params, "network") {
                    args.extend(["--network".to_string(), network.to_string()]);
                }
                args.push(required_str(params, "image")?.to_string());
                if let Some(command) = optional_str(params, "command") {
                    args.extend(["bash".to_string(), "-c".to_string(), command.to_string()]);
                }
                args
            }
            "exec_in_container" => vec![
                "exec".to_string(),
                required_str(params, "container")?.to_string(),
                "bash".to_string(),
                "-c".to_string(),
                required_str(params, "command")?.to_string(),
            ],
            "stop_container" => vec![
                "stop".to_string(),
                required_str(params, "container")?.to_string(),
            ],
            "remove_container" => {
                let mut args = vec!["rm".to_string()];
                if params.get("force").and_then(Value::as_bool).unwrap_or(false) {
                    args.push("--force".to_string());
                }
                args.push(required_str(params, "container")?.to_string());
                args
            }
            "container_logs" => {
                let mut args = vec!["logs".to_string()];
                if let Some(tail) = params.get("tail").and_then(Value::as_u64) {
                    args.extend(["--tail".to_string(), tail.to_string()]);
                }
                args.push(required_str(params, "container")?.to_string());
                args
            }
            "list_images" => vec!["images".to_string()],
            "pull_image" => vec!["pull".to_string(), required_str(params, "image")?.to_string()],
            "list_networks" => vec!["network".to_string(), "ls".to_string()],
            "connect_to_network" => vec![
                "network".to_string(),
                "connect".to_string(),
                required_str(params, "network")?.to_string(),
                required_str(params, "container")?.to_string(),
            ],
            "list_volumes" => vec!["volume".to_string(), "ls".to_string()],
            "create_volume" => vec![
                "volume".to_string(),
                "create".to_string(),
                required_str(params, "name")?.to_string(),
            ],
            other => return Err(AgentError::ToolNotFound(other.to_string())),
        };
        Ok(args)
    }

    async fn docker(&self, args: Vec<String>) -> AgentResult<Vec<Content>> {
        tracing::debug!(binary = %self.binary, ?args, "running docker command");

        let output = Command::new(&self.binary)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                AgentError::ExecutionError(format!("Failed to run {}: {}", self.binary, e))
            })?;

        // Interleaving is lost, but both streams matter to the model
        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&stderr);
        }

        if !output.status.success() {
            return Err(AgentError::ExecutionError(combined));
        }
        if combined.trim().is_empty() {
            combined = "Command completed with no output".to_string();
        }
        Ok(vec![Content::text(combined)])
    }
}

fn required_str<'a>(params: &'a Value, key: &str) -> AgentResult<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AgentError::InvalidParameters(format!("Missing '{}' parameter", key)))
}

fn optional_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl System for DockerSystem {
    fn name(&self) -> &str {
        "docker"
    }

    fn description(&self) -> &str {
        "Manage docker containers, images, networks and volumes on the local daemon."
    }

    fn instructions(&self) -> &str {
        indoc! {r#"
            Every tool maps to one docker CLI invocation and returns its output.
            Check list_containers before run_container so existing containers are reused.
            Commands run through exec_in_container use bash inside the container,
            so shell redirection and pipes work as usual.
        "#}
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> AgentResult<Vec<Content>> {
        if !self.tools.iter().any(|tool| tool.name == tool_call.name) {
            return Err(AgentError::ToolNotFound(tool_call.name));
        }
        let args = self.command_args(&tool_call)?;
        self.docker(args).await
    }
}
