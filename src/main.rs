use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use mergington::config::AppConfig;
use mergington::services::seed_service;
use mergington::web;
use mergington::RosterStore;

#[tokio::main]
async fn main() {
    dotenv().ok();

    // 1. Logging
    mergington::init_tracing();
    let config = AppConfig::from_env();

    // 2. Database: create + seed on first start, then load the roster into memory
    info!(database_url = %config.database_url, "connecting to database");
    let pool = SqlitePoolOptions::new()
        .connect(&config.database_url)
        .await
        .expect("cannot connect to DATABASE_URL");

    seed_service::init_db(&pool)
        .await
        .expect("cannot initialise roster tables");

    let store = RosterStore::load(pool)
        .await
        .expect("cannot load roster from database");

    // 3. Router
    let app = web::build_router(Arc::new(store), &config.static_dir);

    // 4. Serve (one fallback port)
    let addr: SocketAddr = config.bind_addr().parse().expect("cannot parse HOST/PORT");
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            let fallback: SocketAddr = config
                .fallback_bind_addr()
                .parse()
                .expect("cannot parse fallback address");
            warn!(%addr, %fallback, error = %e, "bind failed, trying fallback port");
            tokio::net::TcpListener::bind(fallback)
                .await
                .expect("cannot bind fallback port")
        }
    };

    let bound_addr = listener.local_addr().expect("listener has no local address");
    println!("🚀 Roster running on http://{}", bound_addr);
    println!("📍 Activities at http://{}/activities", bound_addr);

    axum::serve(listener, app).await.expect("server error");
}
