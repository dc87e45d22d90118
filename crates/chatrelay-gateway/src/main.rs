use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use chatrelay_agent::openai::OpenAiProvider;
use chatrelay_agent::provider::{LlmProvider, NullProvider};
use chatrelay_agent::AgentRuntime;
use chatrelay_channels::Transport;
use chatrelay_core::config::RelayConfig;
use chatrelay_dispatch::{DispatchContext, Dispatcher};
use chatrelay_sessions::{SessionStore, SessionSweeper};

mod app;
mod cli;
mod http;
mod outbound;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "chatrelay_gateway=info,chatrelay_dispatch=info,chatrelay_agent=info,\
                 chatrelay_sessions=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    let cli = cli::Cli::parse();

    // A broken config is the only fatal startup error.
    let config = RelayConfig::load_with(cli.conf.as_deref(), cli.overrides())?;
    info!(
        model = %config.model,
        max_tokens = config.max_tokens,
        session_timeout_secs = config.session_timeout_secs,
        ignores = config.ignores.len(),
        auto_pass = config.auto_pass,
        "configuration loaded"
    );

    let provider = build_provider(&config)?;
    let agent = AgentRuntime::from_config(provider, &config);

    let sessions = Arc::new(SessionStore::new(config.session_timeout()));
    let transport: Arc<dyn Transport> = Arc::new(outbound::HttpTransport::new(&config.bridge)?);
    info!(
        transport = transport.name(),
        callback = config.bridge.callback_url.as_deref().unwrap_or("<unset>"),
        auth = config.bridge.token.is_some(),
        "bridge configured"
    );

    let addr: SocketAddr = format!("{}:{}", config.bridge.bind, config.bridge.port).parse()?;
    let sweep_interval = config.sweep_interval();

    let ctx = DispatchContext::new(agent, Arc::clone(&sessions), config, transport);
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(ctx)));
    let state = Arc::new(app::AppState::new(dispatcher));
    let router = app::build_router(state);

    // spawn session sweeper in background
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let sweeper = SessionSweeper::new(Arc::clone(&sessions), sweep_interval);
    let sweeper_task = tokio::spawn(sweeper.run(shutdown_rx));

    info!("chatrelay listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // signal sweeper to stop
    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper_task.await {
        warn!(error = %e, "session sweeper task failed");
    }
    info!(sessions = sessions.len(), "chatrelay stopped");
    Ok(())
}

/// Build the completion provider from config.
///
/// Without an API key every question is answered with a configuration
/// error instead of refusing to start.
fn build_provider(config: &RelayConfig) -> anyhow::Result<Box<dyn LlmProvider>> {
    let Some(api_key) = config.api_key.clone().filter(|k| !k.is_empty()) else {
        warn!("No api_key configured, every reply will be a configuration error");
        return Ok(Box::new(NullProvider));
    };

    let base_url = Some(config.base_url.clone());
    let provider = match config.proxy.as_deref().filter(|p| !p.is_empty()) {
        Some(proxy) => {
            info!(base_url = %config.base_url, proxy, "LLM provider: OpenAI via proxy");
            OpenAiProvider::with_proxy(api_key, base_url, proxy)?
        }
        None => {
            info!(base_url = %config.base_url, "LLM provider: OpenAI");
            OpenAiProvider::new(api_key, base_url)
        }
    };
    Ok(Box::new(provider))
}

/// Resolve when Ctrl+C (or SIGTERM on unix) arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
