use indoc::indoc;

use super::{AgentParams, ToolConfig};
use crate::agent::Agent;
use crate::docker::{DockerCapabilities, DockerSystem};
use crate::providers::base::Provider;

pub const RECONNOITER_ID: &str = "Mr. Burnham";

const NAME: &str = "Frederick Russell Burnham";

const DESCRIPTION: &str = indoc! {"
    You are an OffSec PEN-300 certified penetration tester with extensive experience in reconnaissance.
"};

const GOAL: &str = indoc! {"
    Your goal is to assist the user during the reconnaissance phase of a pentest and finish the tasks assigned.
"};

const INSTRUCTIONS: [&str; 9] = [
    "Be concise and clear.",
    "Use kali linux cli tools for reconnaissance.",
    "Use the kali:withtools image to spawn a new container.",
    "Connect to host docker network.",
    "get a bash shell in the container.",
    "Reuse any kali:withtools image containers if they are available.",
    "Progressively exec the bash cmds in the docker container.",
    "Always ask for clarification if certain things aren't clear to you.",
    "Always put the scanning results in a txt file with this name scheme: {tool_used}_{scan_type}.txt, using the redirection operator in bash.",
];

/// Build the reconnaissance agent that drives a kali container through docker
pub fn get_reconnoiter(params: AgentParams, provider: Box<dyn Provider>, tools: &ToolConfig) -> Agent {
    let additional_context = params
        .user_id
        .as_ref()
        .map(|user_id| format!("<context>You are interacting with the user: {}</context>", user_id));

    let mut agent = Agent::new(RECONNOITER_ID, params.model_id, provider)
        .with_name(NAME)
        .with_user_id(params.user_id)
        .with_session_id(params.session_id)
        .with_description(DESCRIPTION.trim_end())
        .with_goal(GOAL.trim_end())
        .with_instructions(INSTRUCTIONS)
        .with_additional_context(additional_context)
        .with_markdown(true)
        .with_datetime_in_instructions(true)
        .with_name_in_instructions(true)
        .with_debug_mode(params.debug_mode);

    agent.add_system(Box::new(DockerSystem::with_binary(
        tools.docker_binary.clone(),
        DockerCapabilities::all(),
    )));
    agent
}
