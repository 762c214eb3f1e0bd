use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use marea_api::{app, state::AppState, state::AuthConfig};
use marea_dispatch::{DispatchConfig, LiveRideDispatcher};
use marea_store::{
    DbClient, PostgresCandidateRepository, PostgresDispatchStore, PostgresNotificationRepository,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marea_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = marea_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Marea API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let store = Arc::new(PostgresDispatchStore::new(db.pool.clone()));
    let candidates = Arc::new(PostgresCandidateRepository::new(db.pool.clone()));
    let notifications = Arc::new(PostgresNotificationRepository::new(db.pool.clone()));

    let rules = &config.business_rules;
    let dispatch_config = DispatchConfig {
        offer_timeout: chrono::Duration::seconds(rules.offer_timeout_seconds as i64),
        pickup_point: rules.pickup_point.clone(),
        currency: rules.currency.clone(),
        priority_captain_id: rules.priority_captain_id,
    };
    let dispatcher = Arc::new(LiveRideDispatcher::new(
        store,
        candidates.clone(),
        dispatch_config,
    ));

    // Background expiry sweeps decouple offer timeouts from client polling.
    tokio::spawn(marea_api::worker::start_expiry_worker(
        dispatcher.clone(),
        Duration::from_secs(rules.sweep_interval_seconds),
    ));

    let app_state = AppState {
        dispatcher,
        captains: candidates,
        notifications,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
