//! The closed set of agents this crate can build.
//!
//! Each [`AgentType`] variant maps to exactly one constructor module.

mod reconnoiter;

use strum_macros::{Display, EnumIter, EnumString};

use crate::agent::Agent;
use crate::docker::DEFAULT_DOCKER_BINARY;
use crate::model_id::ModelId;
use crate::providers::base::Provider;

pub use reconnoiter::{get_reconnoiter, RECONNOITER_ID};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum AgentType {
    #[strum(serialize = "Mr. Burnham")]
    Reconnoiter,
}

/// Per-run parameters bound into an agent when it is built
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentParams {
    pub model_id: ModelId,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub debug_mode: bool,
}

/// Host-level settings for the tools agents are given
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub docker_binary: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            docker_binary: DEFAULT_DOCKER_BINARY.to_string(),
        }
    }
}

impl AgentType {
    pub fn build(&self, params: AgentParams, provider: Box<dyn Provider>, tools: &ToolConfig) -> Agent {
        match self {
            AgentType::Reconnoiter => get_reconnoiter(params, provider, tools),
        }
    }
}
