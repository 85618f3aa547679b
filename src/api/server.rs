//! API server: router, middleware and lifecycle

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::handlers::{self, MISSING_FIELDS_HEADER, WARNINGS_HEADER};
use crate::config::Settings;
use crate::core::TemplateEngine;
use crate::templates::TemplateStore;

/// Shared application state, immutable once the server starts
#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Settings,
    pub version: String,
    pub engine: TemplateEngine,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let engine = TemplateEngine::new(TemplateStore::new(&settings.templates_dir));
        Self {
            version: settings.app_version.clone(),
            settings,
            engine,
        }
    }
}

/// Initialise the global subscriber, logging to stderr. `RUST_LOG` wins
/// over `default_filter`; a second call is a no-op.
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let expose = [
        header::CONTENT_DISPOSITION,
        HeaderName::from_static(WARNINGS_HEADER),
        HeaderName::from_static(MISSING_FIELDS_HEADER),
    ];
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(expose);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Build the router for `state`
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.settings.cors_origins);
    let body_limit = state.settings.max_body_bytes;

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/api/health", get(handlers::health))
        .route("/version", get(handlers::version))
        // Template catalogue
        .route("/api/templates", get(handlers::list_templates))
        .route("/api/templates/:name", get(handlers::get_template))
        // Report generation
        .route("/api/reports", post(handlers::generate_report))
        .route("/api/reports/:name", post(handlers::generate_named_report))
        .route("/api/table-reports", post(handlers::generate_table_report))
        // State and middleware
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the API server until Ctrl+C or SIGTERM
pub async fn run_api_server(settings: Settings) -> anyhow::Result<()> {
    init_tracing(&settings.log_filter());

    let addr = settings.bind_address()?;
    if !settings.templates_dir.is_dir() {
        warn!(
            "Templates directory {} does not exist",
            settings.templates_dir.display()
        );
    }

    let state = Arc::new(AppState::new(settings));
    info!(
        "📊 {} v{} starting on http://{}",
        state.settings.app_name, state.version, addr
    );
    info!("   Templates: {}", state.settings.templates_dir.display());
    info!("   Endpoints: /api/templates, /api/reports, /api/table-reports");
    info!("   Health: /api/health, Version: /version");

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM. A handler that cannot be installed is
/// logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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

    info!("Shutdown signal received, stopping server...");
}
