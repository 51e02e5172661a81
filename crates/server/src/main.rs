//! Brand clearance search service.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use brandcheck_backend_euipo::{Credentials, EuipoBackend};
use brandcheck_classify::{FallbackClassifier, LexicalIndex, Taxonomy};
use brandcheck_generation::GeminiClient;
use brandcheck_pipeline::{GenerativeClassifier, Pipeline};
use brandcheck_ratelimit::{AnyRateLimiter, InMemoryRateLimiter, RateLimitConfig};
use brandcheck_server::{create_router, AppState, Cli, ServerConfig};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = ServerConfig::load(cli.config.as_deref())?;

    let taxonomy = Taxonomy::builtin()?;
    let gemini = GeminiClient::new(cli.gemini_api_key.clone(), config.generation.clone())?;
    let registry = EuipoBackend::new(config.registry.clone())?;
    let classifier = FallbackClassifier::new(
        GenerativeClassifier::new(gemini.clone(), &taxonomy),
        LexicalIndex::build(&taxonomy),
    );
    let credentials = Credentials::new(cli.euipo_client_id.clone(), cli.euipo_client_secret.clone());
    let pipeline = Pipeline::new(
        classifier,
        registry,
        gemini,
        taxonomy,
        credentials,
        config.pipeline.clone(),
    );

    let limiter = build_limiter(cli.redis_url.as_deref(), config.rate_limit.clone()).await?;
    let app = create_router(AppState::new(pipeline, limiter), config.max_body_bytes);

    let addr: SocketAddr = format!("{}:{}", cli.listen, cli.port)
        .parse()
        .context("invalid listen address")?;
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("brandcheck=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("brandcheck=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn build_limiter(redis_url: Option<&str>, config: RateLimitConfig) -> Result<AnyRateLimiter> {
    match redis_url {
        #[cfg(feature = "redis")]
        Some(url) => {
            let limiter = brandcheck_ratelimit::RedisRateLimiter::connect(url, config).await?;
            info!("Using shared rate limit store");
            Ok(AnyRateLimiter::Redis(limiter))
        }
        #[cfg(not(feature = "redis"))]
        Some(_) => {
            warn!("REDIS_URL is set but the redis feature is disabled, using in-memory rate limiter");
            Ok(AnyRateLimiter::Memory(InMemoryRateLimiter::new(config)))
        }
        None => Ok(AnyRateLimiter::Memory(InMemoryRateLimiter::new(config))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received");
}
