use axum::extract::FromRef;
use diesel::{
    SqliteConnection,
    r2d2::{ConnectionManager, Pool},
};

use crate::{
    error::EngineError, tournaments::standings::cache::TraceCache,
};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub traces: TraceCache,
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for TraceCache {
    fn from_ref(state: &AppState) -> Self {
        state.traces.clone()
    }
}

/// Runs `f` with a pooled connection on the blocking thread pool. Diesel is
/// synchronous, so database work must never run on the async executor.
pub async fn with_conn<F, T>(pool: &DbPool, f: F) -> Result<T, EngineError>
where
    F: FnOnce(&mut SqliteConnection) -> Result<T, EngineError> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        f(&mut *conn)
    })
    .await?
}
