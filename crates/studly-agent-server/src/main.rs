use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use studly_agent_server::{
    build_router,
    config::Settings,
    services::{conversation::ConversationStore, GeminiService, LlmSummarizer, RequestOrchestrator},
    state::AppState,
    utils::init_logger,
};

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guards = init_logger()?;

    info!("🚀 Starting Studly agent server...");

    // Load configuration
    let settings = Settings::load()?;
    info!(
        cap_turns = settings.history.cap_turns,
        summarization = settings.history.enable_summarization,
        summary_threshold = settings.history.summary_threshold,
        timeout_seconds = settings.request.timeout_seconds,
        "✅ Configuration loaded"
    );

    // Initialize services
    let llm = Arc::new(GeminiService::new(settings.gemini.clone())?);
    let summarizer = Arc::new(LlmSummarizer::new(
        llm.clone(),
        settings.prompts.summary_instruction.clone(),
    ));
    let store = ConversationStore::new();
    let orchestrator = RequestOrchestrator::new(&settings, store, llm, summarizer);
    info!("✅ Model client ready ({})", settings.gemini.model);

    // Server address
    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    let app = build_router(AppState::new(settings, orchestrator));

    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
