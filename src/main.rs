use clap::Parser; // for cli
use query_snitch::app::build_router;
use query_snitch::config::{Args, Settings};
use query_snitch::db::Database;
use query_snitch::error::Result;
use query_snitch::state::AppState;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // parse cli arguments, settings are fixed from here on
    let args = Args::parse();
    let settings = Settings::from(&args);

    let db = Database::open(&args.database)?;
    db.seed()?;

    let state = Arc::new(AppState::new(db, settings));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Query Snitch demo running on http://localhost:{}", args.port);
    info!(database = %args.database, middleware = ?args.middleware, "configuration");
    axum::serve(listener, app).await?;
    Ok(())
}
