use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use socketioxide::SocketIo;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod events;
mod matching;
mod models;
mod participation;
mod routes;
mod schema;
mod services;
mod socket;

use config::AppConfig;
use kindred_shared::clients::bus::EventBus;
use kindred_shared::clients::db::{build_pool, DbConn, DbPool};
use kindred_shared::clients::presence::PresenceStore;
use kindred_shared::errors::{AppError, AppResult};
use kindred_shared::middleware::{init_tracing, install_prometheus, track_http, PrometheusHandle};

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub bus: EventBus,
    pub presence: PresenceStore,
    pub io: SocketIo,
}

impl AppState {
    /// Check out a pooled connection, mapping pool exhaustion to an internal
    /// error instead of a panic.
    pub fn db_conn(&self) -> AppResult<DbConn> {
        self.db.get().map_err(|e| AppError::internal(e.to_string()))
    }
}

fn router(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(move || {
            let handle = metrics_handle.clone();
            async move { handle.render() }
        }))
        // Swipe ledger & recommendations
        .route("/swipe", post(routes::swipes::record_swipe))
        .route("/swipe/status", get(routes::swipes::swipe_status))
        .route("/users/matches", get(routes::matches::list_matches))
        .route("/users/:id/compatibility", get(routes::matches::get_compatibility))
        // Event participation
        .route(
            "/events/:id/join",
            post(routes::events::request_join).delete(routes::events::leave_event),
        )
        .route("/events/:id/requests", get(routes::events::list_requests))
        .route(
            "/events/:id/requests/:request_id/accept",
            post(routes::events::accept_request),
        )
        .route(
            "/events/:id/requests/:request_id/reject",
            post(routes::events::reject_request),
        )
        .route("/events/:id/participants", get(routes::events::list_participants))
        // Conversations
        .route("/conversations/:id", get(routes::conversations::get_conversation))
        .route("/conversations/:id/messages", get(routes::conversations::list_messages))
        // Notifications
        .route("/notifications", get(routes::notifications::list_notifications))
        .route("/notifications/unread-count", get(routes::notifications::unread_count))
        .route("/notifications/:id/read", post(routes::notifications::mark_read))
        .route("/notifications/read-all", post(routes::notifications::mark_all_read))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("kindred-engine");
    let metrics_handle = install_prometheus();

    let config = AppConfig::load()?;
    let port = config.port;

    let db = build_pool(&config.database_url, config.db_pool_size)?;
    let bus = EventBus::connect(&config.rabbitmq_url, &config.bus_exchange).await?;
    let presence = PresenceStore::connect(&config.redis_url).await?;

    // io lives in AppState so REST handlers can fan out after commit.
    let (sio_layer, io) = SocketIo::builder().build_layer();

    let state = Arc::new(AppState {
        db,
        config,
        bus,
        presence,
        io: io.clone(),
    });

    io.ns("/", {
        let state = state.clone();
        move |socket: socketioxide::extract::SocketRef| {
            let state = state.clone();
            async move {
                socket::handlers::on_connect_with_state(socket, state).await;
            }
        }
    });

    let app = router(state, metrics_handle)
        .layer(axum::middleware::from_fn(track_http))
        .layer(sio_layer)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "kindred-engine starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
