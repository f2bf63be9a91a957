use factgate::deepfake::DeepfakeDetector;
use factgate::verification::GeminiClient;
use factgate::{build_router, AppState, Config, FactVerifier};

use axum::Router;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    init_logging();

    info!("Starting Factgate service v{}", env!("CARGO_PKG_VERSION"));

    let config = match Config::from_env() {
        Ok(config) => {
            info!("Configuration loaded successfully");
            info!("  +------ Gemini API base: {}", config.gemini_api_base);
            info!("  +--------- Gemini model: {}", config.gemini_model);
            info!("  +-- Deepfake model path: {}", config.deepfake_model_path);
            info!("  +--- Max upload (bytes): {}", config.max_upload_bytes);
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let gemini_client = match GeminiClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create Gemini client: {}", e);
            std::process::exit(1);
        }
    };

    let verifier = Arc::new(FactVerifier::new(gemini_client, &config));

    // A missing classifier only disables /detect; the other endpoints stay up.
    let detector = match DeepfakeDetector::load(&config.deepfake_model_path) {
        Ok(detector) => Some(Arc::new(Mutex::new(detector))),
        Err(e) => {
            warn!(
                "Could not load deepfake model from {}: {:#}. Deepfake detection will be unavailable.",
                config.deepfake_model_path, e
            );
            None
        }
    };

    let state = AppState { verifier, detector };
    let app = build_app(state, config.max_upload_bytes);

    let addr = match SocketAddr::from_str(&config.server_address()) {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid server address {}: {}", config.server_address(), e);
            std::process::exit(1);
        }
    };

    info!("Server starting on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            info!("Server bound to {}", addr);
            listener
        }
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Factgate service stopped");
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "factgate=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn build_app(state: AppState, max_upload_bytes: usize) -> Router {
    build_router(state, max_upload_bytes).layer(
        ServiceBuilder::new()
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_request(DefaultOnRequest::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(CorsLayer::permissive()),
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
