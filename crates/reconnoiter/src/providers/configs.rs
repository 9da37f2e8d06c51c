use crate::model_id::ModelId;

pub const GEMINI_HOST: &str = "https://generativelanguage.googleapis.com";

// Unified enum to wrap different provider configurations
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    Gemini(GeminiProviderConfig),
}

impl ProviderConfig {
    /// The same provider settings bound to another model
    pub fn with_model(&self, model: ModelId) -> Self {
        match self {
            ProviderConfig::Gemini(config) => ProviderConfig::Gemini(GeminiProviderConfig {
                model,
                ..config.clone()
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: ModelId,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

impl GeminiProviderConfig {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            host: GEMINI_HOST.to_string(),
            api_key: api_key.into(),
            model: ModelId::default(),
            temperature: None,
            max_tokens: None,
        }
    }
}
