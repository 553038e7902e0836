//! HTTP server module
//!
//! Provides the Axum-based HTTP server for probes and self-metrics.

pub mod handlers;

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{Config, ModuleConfig, TlsConfig};
use crate::fetcher::JsonFetcher;
use crate::transformer::{descriptors_from_module, ScrapeEngine};

/// Grace period for in-flight requests on shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// A configured module ready to serve probes
#[derive(Debug, Clone)]
pub struct ProbeModule {
    /// Request settings for the target
    pub config: ModuleConfig,
    /// Descriptors built from the module's metric mappings
    pub engine: ScrapeEngine,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Target HTTP client
    pub fetcher: JsonFetcher,
    /// Modules by name
    pub modules: Arc<HashMap<String, ProbeModule>>,
}

impl AppState {
    /// Build the fetcher and one engine per module
    pub fn from_config(config: Config) -> Result<Self> {
        let fetcher = JsonFetcher::new(config.request.timeout())
            .context("Failed to create HTTP client")?;

        let modules = config
            .modules
            .iter()
            .map(|(name, module)| {
                let descriptors = descriptors_from_module(module);
                if descriptors.len() != module.metrics.len() {
                    warn!(
                        module = %name,
                        configured = module.metrics.len(),
                        usable = descriptors.len(),
                        "Some metrics were skipped"
                    );
                }
                let probe_module = ProbeModule {
                    config: module.clone(),
                    engine: ScrapeEngine::new(descriptors),
                };
                (name.clone(), probe_module)
            })
            .collect();

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            modules: Arc::new(modules),
        })
    }
}

/// Build the router with all endpoints
pub fn build_router(state: AppState) -> Router {
    let metrics_path = state.config.server.path.clone();

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/probe", get(handlers::probe))
        .route(&metrics_path, get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
///
/// # Arguments
/// * `config` - Validated application configuration
///
/// # Errors
/// Returns an error if the server fails to start
pub async fn run(config: Config) -> Result<()> {
    let addr = socket_addr(&config.server.bind_address, config.server.port)?;
    let metrics_path = config.server.path.clone();
    let tls = config.server.tls.clone();

    let state = AppState::from_config(config)?;
    let modules: Vec<&String> = state.modules.keys().collect();
    info!(modules = ?modules, "Loaded modules");
    let app = build_router(state);

    match tls {
        Some(tls) => serve_tls(addr, app, &tls, &metrics_path).await?,
        None => {
            info!(address = %addr, metrics_path = %metrics_path, "Server listening");
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn serve_tls(addr: SocketAddr, app: Router, tls: &TlsConfig, metrics_path: &str) -> Result<()> {
    // reqwest and axum-server both pull in rustls providers
    let _ = rustls::crypto::ring::default_provider().install_default();

    let rustls_config = RustlsConfig::from_pem_file(&tls.cert_file, &tls.key_file)
        .await
        .with_context(|| {
            format!(
                "Failed to load TLS certificate '{}' or key '{}'",
                tls.cert_file, tls.key_file
            )
        })?;

    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    info!(address = %addr, metrics_path = %metrics_path, "Server listening (TLS)");
    axum_server::bind_rustls(addr, rustls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

/// Parse the bind address; "localhost" maps to 127.0.0.1
fn socket_addr(bind_address: &str, port: u16) -> Result<SocketAddr> {
    let ip: IpAddr = if bind_address == "localhost" {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    } else {
        bind_address.parse().map_err(|e| {
            anyhow::anyhow!(
                "Invalid bind_address '{}': {}. Use an IP address (e.g., '0.0.0.0', '127.0.0.1') or 'localhost'.",
                bind_address,
                e
            )
        })?
    };
    Ok(SocketAddr::from((ip, port)))
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
