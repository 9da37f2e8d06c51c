mod configuration;
mod error;
mod routes;
mod state;

use reconnoiter::agents::ToolConfig;
use reconnoiter::registry::AgentRegistry;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = configuration::Settings::new()?;

    let registry = AgentRegistry::new(settings.provider.into_config()).with_tool_config(ToolConfig {
        docker_binary: settings.agent.docker_binary,
    });
    let state = state::AppState::new(registry, settings.agent.debug_mode);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(settings.server.socket_addr()?).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
