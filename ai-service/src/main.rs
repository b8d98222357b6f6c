use ai_service::api;
use ai_service::generator::OllamaGenerator;
use ai_service::handlers::AiCommands;
use ai_service::session::MemorySessionStore;
use ai_service::store::MemoryChatHistoryStore;
use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "ai-service")]
struct Args {
    #[arg(long, env = "OLLAMA_URL", default_value = "http://localhost:11434")]
    ollama_url: String,

    #[arg(long, env = "PORT", default_value = "3004")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let commands = AiCommands::new(
        Arc::new(MemorySessionStore::new()),
        Arc::new(MemoryChatHistoryStore::new()),
        Arc::new(OllamaGenerator::new(args.ollama_url)),
    );

    let state = api::AppState {
        commands: Arc::new(commands),
    };
    let app = api::create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port)).await?;

    info!("AI service listening on port {}", args.port);
    axum::serve(listener, app).await?;

    Ok(())
}
