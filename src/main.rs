// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::auth_service::AuthService;
use crate::application::backend_api::BackendApi;
use crate::application::bounded_fetch::BoundedFetch;
use crate::application::controller::Controller;
use crate::application::session::Session;
use crate::domain::view::View;
use crate::infrastructure::config::load_dashboard_config;
use crate::infrastructure::credential_file::FileCredentialStore;
use crate::infrastructure::http_transport::HttpTransport;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = load_dashboard_config()?;

    // Initialize tracing, RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Restore the persisted credential (infrastructure layer)
    let session = Arc::new(Session::restore(Arc::new(FileCredentialStore::new(
        &config.auth.credentials_path,
    ))));
    let transport = Arc::new(HttpTransport::new(
        config.backend.base_url.clone(),
        session.clone(),
    ));
    let fetch = BoundedFetch::new(transport);

    // Create services (application layer)
    let (controller, controller_task) =
        Controller::spawn(BackendApi::new(fetch.clone()), config.controller_settings());
    let auth = AuthService::new(fetch, session, config.action_timeout());

    let view = View::parse(&config.startup.view)
        .with_context(|| format!("Unknown startup view: {}", config.startup.view))?;
    controller.mount(view).await?;

    let state = Arc::new(AppState { controller, auth });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(handlers::health_check))
        .route("/snapshot", get(handlers::snapshot))
        .route("/views/:view", post(handlers::mount_view))
        .route("/views", delete(handlers::unmount_view))
        .route("/streaming", post(handlers::set_streaming))
        .route("/refresh", post(handlers::refresh))
        .route("/primary", post(handlers::primary_action))
        .route("/commands/compute", post(handlers::compute_stats))
        .route("/commands/generate", post(handlers::generate_data))
        .route("/commands/mode", post(handlers::update_mode))
        .route("/commands/plot", post(handlers::generate_plot))
        .route("/commands/report", post(handlers::generate_report))
        .route("/plots/:id", get(handlers::plot_image))
        .route("/reset/open", post(handlers::open_reset))
        .route("/reset/confirm", post(handlers::confirm_reset))
        .route("/reset/cancel", post(handlers::cancel_reset))
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/session", get(handlers::current_user))
        .route("/auth/verify", post(handlers::verify))
        .route("/auth/logout", post(handlers::logout))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.server.bind))?;
    tracing::info!("Starting pulse-console on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    controller_task.abort();
    Ok(())
}
