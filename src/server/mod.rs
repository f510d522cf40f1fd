//! HTTP front of the filter engine.
//!
//! The server keeps no filter state: each request is turned into one SQL
//! statement, run on its own read-only connection on the blocking pool, and
//! answered as JSON.

pub mod cache;
pub mod error;
pub mod routes;

use anyhow::{Context, Result};
use axum::middleware;
use axum::routing::get;
use axum::Router;
use rusqlite::{Connection, InterruptHandle};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::db::Database;
use cache::ResultCache;
use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub cache: Arc<ResultCache>,
    pub query_timeout: Duration,
}

impl AppState {
    pub fn new(db: Database, config: &ServerConfig) -> Self {
        Self {
            db: Arc::new(db.with_busy_timeout(config.query_timeout())),
            cache: Arc::new(ResultCache::new(config.cache_ttl())),
            query_timeout: config.query_timeout(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cached_values = Router::new()
        .route("/facetValues/{table}", get(routes::facet_values))
        .route_layer(middleware::from_fn_with_state(
            state.cache.clone(),
            cache::cache_layer,
        ));

    Router::new()
        .route("/healthz", get(routes::healthz))
        .route("/entities/{entity_type}/{name}", get(routes::entity_ids))
        .route("/entities/{entity_type}/{name}/details", get(routes::site_details))
        .merge(cached_values)
        .with_state(state)
}

/// How often a timed-out query is interrupted again until its task ends.
const INTERRUPT_RETRY: Duration = Duration::from_millis(20);

type QueryTask<T> = JoinHandle<Result<T, ApiError>>;

/// Run `query` on a fresh connection from the blocking pool, interrupting it
/// once the state's query timeout has passed.
///
/// The deadline only starts once the connection's interrupt handle is in
/// hand, so a timed-out query can always be stopped.
pub(crate) async fn run_query<T, F>(state: &AppState, query: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
{
    let db = state.db.clone();
    let (handle_tx, handle_rx) = tokio::sync::oneshot::channel();

    let mut task: QueryTask<T> = tokio::task::spawn_blocking(move || {
        let conn = db.connect()?;
        let _ = handle_tx.send(conn.get_interrupt_handle());
        Ok(query(&conn)?)
    });

    // The sender is dropped without a handle only when connecting failed.
    let Ok(handle) = handle_rx.await else {
        return joined(task.await);
    };

    match tokio::time::timeout(state.query_timeout, &mut task).await {
        Ok(result) => joined(result),
        Err(_) => {
            handle.interrupt();
            tokio::spawn(interrupt_until_done(handle, task));
            Err(ApiError::Upstream(format!(
                "query exceeded {} ms",
                state.query_timeout.as_millis()
            )))
        }
    }
}

fn joined<T>(result: Result<Result<T, ApiError>, JoinError>) -> Result<T, ApiError> {
    result.map_err(|err| ApiError::Upstream(format!("query task failed: {err}")))?
}

/// An interrupt that lands before the statement starts stepping is lost, so
/// keep interrupting until the blocking task has returned.
async fn interrupt_until_done<T>(handle: InterruptHandle, mut task: QueryTask<T>) {
    loop {
        match tokio::time::timeout(INTERRUPT_RETRY, &mut task).await {
            Ok(Ok(Err(err))) => {
                debug!("timed-out query ended: {err}");
                return;
            }
            Ok(_) => return,
            Err(_) => handle.interrupt(),
        }
    }
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve_on(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("Cartalex filter server listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")
}

/// Bind `config.bind` and serve until Ctrl-C.
pub async fn serve(config: &ServerConfig, db: Database) -> Result<()> {
    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!(
        db = %db.path.display(),
        cache_ttl_secs = config.cache_ttl_secs,
        query_timeout_ms = config.query_timeout_ms,
        "starting"
    );

    let state = AppState::new(db, config);
    serve_on(listener, state, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::ErrorCode;
    use tempfile::TempDir;

    const ENDLESS: &str = "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) \
                           SELECT count(*) FROM c";

    fn state(timeout: Duration) -> (TempDir, AppState) {
        let dir = TempDir::new().unwrap();
        let db = Database::create(&dir.path().join("cartalex.db")).unwrap();
        let state = AppState {
            db: Arc::new(db),
            cache: Arc::new(ResultCache::new(Duration::from_secs(60))),
            query_timeout: timeout,
        };
        (dir, state)
    }

    #[tokio::test]
    async fn fast_query_returns_its_rows() {
        let (_dir, state) = state(Duration::from_secs(5));
        let n: i64 = run_query(&state, |conn| {
            conn.query_row("SELECT 41 + 1", [], |r| r.get(0))
        })
        .await
        .unwrap();
        assert_eq!(n, 42);
    }

    #[tokio::test]
    async fn endless_query_times_out_and_is_interrupted() {
        let (_dir, state) = state(Duration::from_millis(50));
        let (tx, rx) = std::sync::mpsc::channel();

        let result = run_query(&state, move |conn| {
            let outcome = conn.query_row(ENDLESS, [], |r| r.get::<_, i64>(0));
            let interrupted = matches!(
                &outcome,
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::OperationInterrupted
            );
            let _ = tx.send(interrupted);
            outcome
        })
        .await;
        assert!(matches!(result, Err(ApiError::Upstream(_))));

        let interrupted = tokio::task::spawn_blocking(move || {
            rx.recv_timeout(Duration::from_secs(10))
        })
        .await
        .unwrap();
        assert_eq!(interrupted, Ok(true));
    }

    #[tokio::test]
    async fn connection_failure_is_upstream() {
        let (dir, state) = state(Duration::from_secs(5));
        std::fs::remove_file(dir.path().join("cartalex.db")).unwrap();

        let result = run_query(&state, |conn| {
            conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))
        })
        .await;
        assert!(matches!(result, Err(ApiError::Upstream(_))));
    }
}
