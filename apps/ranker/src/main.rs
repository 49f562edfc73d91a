use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use resume_ranker::config::Config;
use resume_ranker::embedding::RemoteEmbedder;
use resume_ranker::routes::build_router;
use resume_ranker::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Ranker v{}", env!("CARGO_PKG_VERSION"));

    let embedder = RemoteEmbedder::new(&config.embedding)
        .context("Failed to build embedding HTTP client")?;
    info!(
        "Embedding client initialized (model: {}, base: {})",
        config.embedding.model, config.embedding.api_base
    );
    info!(
        "Ranking defaults: top_n={} recency_weight={} relevance_threshold={} max_years_old={} on_unparseable_date={}",
        config.ranking.top_n,
        config.ranking.recency_weight,
        config.ranking.relevance_threshold,
        config.ranking.max_years_old,
        config.ranking.on_unparseable_date
    );

    let state = AppState {
        config: config.clone(),
        embedder: Arc::new(embedder),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
