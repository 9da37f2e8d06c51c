use std::str::FromStr;
use std::sync::Arc;

use strum::IntoEnumIterator;

use crate::agent::Agent;
use crate::agents::{AgentParams, AgentType, ToolConfig};
use crate::errors::RegistryError;
use crate::model_id::ModelId;
use crate::providers::base::Provider;
use crate::providers::configs::ProviderConfig;
use crate::providers::factory;

pub type ProviderBuilder =
    Arc<dyn Fn(ModelId) -> anyhow::Result<Box<dyn Provider>> + Send + Sync>;

/// Maps agent identifiers to freshly built agents.
///
/// The registry never holds live agents; every `resolve` builds a new one.
#[derive(Clone)]
pub struct AgentRegistry {
    build_provider: ProviderBuilder,
    tools: ToolConfig,
}

impl AgentRegistry {
    /// A registry whose agents talk to the configured backend
    pub fn new(config: ProviderConfig) -> Self {
        Self::with_provider_builder(move |model| factory::get_provider(config.with_model(model)))
    }

    pub fn with_provider_builder<F>(build_provider: F) -> Self
    where
        F: Fn(ModelId) -> anyhow::Result<Box<dyn Provider>> + Send + Sync + 'static,
    {
        Self {
            build_provider: Arc::new(build_provider),
            tools: ToolConfig::default(),
        }
    }

    pub fn with_tool_config(mut self, tools: ToolConfig) -> Self {
        self.tools = tools;
        self
    }

    /// Every registered identifier, in declaration order
    pub fn list_identifiers(&self) -> Vec<String> {
        AgentType::iter().map(|agent| agent.to_string()).collect()
    }

    pub fn resolve(&self, identifier: &str, params: AgentParams) -> Result<Agent, RegistryError> {
        let agent_type = AgentType::from_str(identifier)
            .map_err(|_| RegistryError::UnknownAgent(identifier.to_string()))?;
        let provider = (self.build_provider)(params.model_id)?;
        Ok(agent_type.build(params, provider, &self.tools))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::configs::GeminiProviderConfig;
    use crate::providers::mock::MockProvider;
    use std::sync::Mutex;

    fn mock_registry() -> AgentRegistry {
        AgentRegistry::with_provider_builder(|_| Ok(Box::new(MockProvider::new(vec![]))))
    }

    #[test]
    fn test_list_identifiers_is_stable() {
        let registry = mock_registry();
        assert_eq!(registry.list_identifiers(), vec!["Mr. Burnham".to_string()]);
        assert_eq!(registry.list_identifiers(), registry.list_identifiers());
    }

    #[test]
    fn test_every_listed_identifier_resolves() {
        let registry = mock_registry();
        for identifier in registry.list_identifiers() {
            let agent = registry.resolve(&identifier, AgentParams::default()).unwrap();
            assert_eq!(agent.agent_id(), identifier);
        }
    }

    #[test]
    fn test_unknown_identifier() {
        let registry = mock_registry();
        let Err(err) = registry.resolve("Mr. Nobody", AgentParams::default()) else {
            panic!("Expected an unknown agent error");
        };
        assert!(matches!(err, RegistryError::UnknownAgent(ref id) if id == "Mr. Nobody"));
        assert_eq!(err.to_string(), "Agent Mr. Nobody is not available.");
    }

    #[test]
    fn test_provider_built_for_requested_model() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let registry = AgentRegistry::with_provider_builder(move |model| {
            recorder.lock().unwrap().push(model);
            Ok(Box::new(MockProvider::new(vec![])))
        });

        let params = AgentParams {
            model_id: ModelId::Gemini20FlashLite,
            ..AgentParams::default()
        };
        let agent = registry.resolve("Mr. Burnham", params).unwrap();
        assert_eq!(agent.model(), ModelId::Gemini20FlashLite);
        assert_eq!(*seen.lock().unwrap(), vec![ModelId::Gemini20FlashLite]);
    }

    #[test]
    fn test_each_resolve_builds_a_new_agent() {
        let count = Arc::new(Mutex::new(0));
        let counter = count.clone();
        let registry = AgentRegistry::with_provider_builder(move |_| {
            *counter.lock().unwrap() += 1;
            Ok(Box::new(MockProvider::new(vec![])))
        });

        let first = registry
            .resolve("Mr. Burnham", AgentParams { session_id: Some("a".into()), ..Default::default() })
            .unwrap();
        let second = registry
            .resolve("Mr. Burnham", AgentParams { session_id: Some("b".into()), ..Default::default() })
            .unwrap();
        assert_eq!(*count.lock().unwrap(), 2);
        assert_eq!(first.session_id(), Some("a"));
        assert_eq!(second.session_id(), Some("b"));
    }

    #[test]
    fn test_gemini_registry_resolves_without_network() {
        let registry = AgentRegistry::new(ProviderConfig::Gemini(GeminiProviderConfig::new("key")));
        assert!(registry.resolve("Mr. Burnham", AgentParams::default()).is_ok());
    }
}
