use std::{path::Path, time::Duration};

use axum::{
    Router,
    routing::{get, post, put},
};
use diesel::{
    SqliteConnection,
    r2d2::{ConnectionManager, Pool},
};
use diesel_migrations::MigrationHarness;
use serde::Deserialize;
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::{
    MIGRATIONS,
    error::EngineError,
    state::{AppState, DbPool},
    tournaments::{
        matches::{
            manage::{
                check_completion, do_request_transition, view_judge_breakdown,
                view_match_outcome, view_next_stages, view_next_stages_of_match,
            },
            scores::submit::do_save_score,
        },
        standings::{
            cache::TraceCache,
            public::{view_cached_trace, view_standings},
        },
    },
};

pub const DEFAULT_DATABASE_URL: &str = ":memory:";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("could not read {path}: {source}")]
    ReadConfig {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed configuration: {0}")]
    ParseConfig(#[from] toml::de::Error),
    #[error("could not open the database: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("migrations failed: {0}")]
    Migrations(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl AppConfig {
    /// Reads the (optional) TOML file at `path`; `DATABASE_URL` and
    /// `BIND_ADDR` take precedence over it.
    pub fn load(path: Option<&Path>) -> Result<AppConfig, SetupError> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| {
                    SetupError::ReadConfig {
                        path: path.display().to_string(),
                        source,
                    }
                })?;
                toml::from_str(&raw)?
            }
            None => AppConfig::default(),
        };

        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    fn with_overrides(self, var: impl Fn(&str) -> Option<String>) -> Self {
        AppConfig {
            database_url: var("DATABASE_URL").unwrap_or(self.database_url),
            bind_addr: var("BIND_ADDR").unwrap_or(self.bind_addr),
        }
    }
}

pub fn make_pool(database_url: &str) -> Result<DbPool, SetupError> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);

    // every connection to `:memory:` is a separate database, so there must
    // only ever be one, and it must never be recycled
    let pool = if database_url == ":memory:" {
        Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?
    } else {
        Pool::builder()
            .max_size(10)
            .connection_timeout(Duration::from_secs(30))
            .build(manager)?
    };

    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> Result<(), SetupError> {
    let mut conn = pool.get()?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| SetupError::Migrations(e.to_string()))?;
    tracing::info!("applied {} migrations", applied.len());
    Ok(())
}

pub fn create_app(pool: DbPool) -> Router {
    let state = AppState {
        pool,
        traces: TraceCache::default(),
    };

    Router::new()
        .route("/events/:event_id/standings", get(view_standings))
        .route("/events/:event_id/standings/trace", get(view_cached_trace))
        .route("/matches/:match_id/outcome", get(view_match_outcome))
        .route("/matches/:match_id/judges", get(view_judge_breakdown))
        .route("/matches/:match_id/stages/next", get(view_next_stages_of_match))
        .route("/matches/:match_id/stage", post(do_request_transition))
        .route("/matches/:match_id/completion", get(check_completion))
        .route("/matches/:match_id/scores/:team_id", put(do_save_score))
        .route("/stages/next", get(view_next_stages))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_overrides_file() {
        let from_file: AppConfig =
            toml::from_str(r#"database_url = "tab.sqlite""#).unwrap();
        assert_eq!(from_file.bind_addr, DEFAULT_BIND_ADDR);

        let config = from_file.clone().with_overrides(|key| {
            (key == "BIND_ADDR").then(|| "0.0.0.0:9000".to_string())
        });
        assert_eq!(config.database_url, "tab.sqlite");
        assert_eq!(config.bind_addr, "0.0.0.0:9000");

        assert_eq!(from_file.clone().with_overrides(|_| None), from_file);
    }
}
