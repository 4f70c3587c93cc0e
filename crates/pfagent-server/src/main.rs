mod configuration;
mod error;
mod routes;
mod state;

#[cfg(test)]
mod test_support;

use configuration::Settings;
use pfagent::backend::BackendClient;
use pfagent::factory::AgentFactory;
use pfagent::providers::factory;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let settings = Settings::new()?;
    let addr = settings.server.socket_addr()?;

    let provider = factory::get_provider(settings.provider.into_config())?;
    let backend = BackendClient::new(settings.backend.into_config())?;
    let agent_factory = AgentFactory::new(provider, backend, settings.portfolio)
        .with_max_turns(settings.agent.max_turns);

    for tool in agent_factory.tools() {
        info!(tool = %tool.name, "registered tool");
    }

    let state = state::AppState::new(agent_factory, settings.agent.tools_enabled);

    // Create router with CORS support
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
