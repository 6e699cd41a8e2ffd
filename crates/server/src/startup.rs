use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use configs::AppConfig;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use service::storage::MemStore;
use service::user::{DefaultUserService, MemUserRepository};

use crate::errors::StartupError;
use crate::routes::{self, AppState};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Wire a fresh in-memory store through repository and service.
pub fn build_state() -> AppState {
    let store = Arc::new(MemStore::new());
    let repo = Arc::new(MemUserRepository::new(store));
    AppState { users: Arc::new(DefaultUserService::new(repo)) }
}

/// Build the app with a fresh store.
pub fn build_app() -> Router {
    routes::build_router(build_state(), build_cors())
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "cannot listen for SIGTERM");
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
}

/// Serve `app` until `signal` resolves, then give in-flight requests
/// `drain_timeout` to finish.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    drain_timeout: Duration,
    signal: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let draining = Arc::new(Notify::new());
    let server = axum::serve(listener, app)
        .with_graceful_shutdown({
            let draining = Arc::clone(&draining);
            async move {
                signal.await;
                info!(event = "shutdown_signal", "shutting down server");
                draining.notify_one();
            }
        })
        .into_future();
    tokio::pin!(server);

    let deadline = async {
        draining.notified().await;
        tokio::time::sleep(drain_timeout).await;
    };

    tokio::select! {
        res = &mut server => {
            res?;
            info!(event = "stop", "server exited properly");
            Ok(())
        }
        _ = deadline => {
            warn!(timeout_secs = drain_timeout.as_secs(), "server forced to shutdown");
            Err(StartupError::ShutdownTimeout(drain_timeout.as_secs()).into())
        }
    }
}

/// Public entry: bind the configured address and serve until a shutdown signal.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let addr = cfg.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| StartupError::Bind { addr: addr.clone(), source })?;
    info!(%addr, "starting server");

    let drain_timeout = Duration::from_secs(cfg.server.shutdown_timeout_secs);
    serve(listener, build_app(), drain_timeout, shutdown_signal()).await
}
