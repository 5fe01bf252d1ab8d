use sea_orm::{ConnectOptions, Database};
use tracing_subscriber::EnvFilter;

use shopkit::cache::Cache;
use shopkit::config::Config;
use shopkit::state::AppState;
use shopkit::{routes, schema};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    let mut options = ConnectOptions::new(config.database_url.clone());
    options.max_connections(config.max_connections);
    let db = Database::connect(options)
        .await
        .expect("failed to connect to database");
    schema::create_tables(&db)
        .await
        .expect("failed to create tables");

    let cache = match &config.redis_url {
        Some(url) => match Cache::connect(url).await {
            Ok(cache) => {
                tracing::info!("redis cache connected");
                cache
            }
            Err(err) => {
                tracing::warn!(error = %err, "redis unavailable, caching disabled");
                Cache::disabled()
            }
        },
        None => Cache::disabled(),
    };

    let state = AppState::new(db, cache, config.max_connections);
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind address");
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await.expect("server error");
}
