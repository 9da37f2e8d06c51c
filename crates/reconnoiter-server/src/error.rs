use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reconnoiter::errors::RegistryError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },
    #[error("Invalid server address: {0}")]
    InvalidAddress(String),
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Map a dotted config key to the environment variable that sets it
pub fn to_env_var(field: &str) -> String {
    format!(
        "RECONNOITER_{}",
        field.split('.').collect::<Vec<_>>().join("__").to_uppercase()
    )
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Agent not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownAgent(_) => ApiError::NotFound(err.to_string()),
            RegistryError::Provider(err) => ApiError::Internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(err) => {
                tracing::error!("Run failed: {:#}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_env_var() {
        assert_eq!(to_env_var("provider.api_key"), "RECONNOITER_PROVIDER__API_KEY");
        assert_eq!(to_env_var("api_key"), "RECONNOITER_API_KEY");
    }

    #[test]
    fn test_unknown_agent_maps_to_not_found() {
        let err: ApiError = RegistryError::UnknownAgent("Mr. Nobody".into()).into();
        assert_eq!(err.to_string(), "Agent not found: Agent Mr. Nobody is not available.");
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_provider_failure_maps_to_internal() {
        let err: ApiError = RegistryError::Provider(anyhow::anyhow!("no client")).into();
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
