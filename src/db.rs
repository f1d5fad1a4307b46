use std::path::Path;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::extract::Request;
use axum::extract::State;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use sqlx::Sqlite;
use sqlx::SqlitePool;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::MappedMutexGuard;
use tokio::sync::Mutex;
use tokio::sync::MutexGuard;

use crate::known_errors::AppError;

/// Drops and recreates every application table.
pub const SCHEMA: &str = include_str!("schema.sql");

/// Opens a pool for the SQLite file at `path`, creating the file if needed.
/// No connection is made until the first query.
pub fn connect(path: &Path) -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    SqlitePoolOptions::new().connect_lazy_with(options)
}

/// Clears the existing data and creates the tables.
pub async fn init_db(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    tracing::info!("database schema initialized");
    Ok(())
}

/// The database handle for a single request.
///
/// A pooled connection is checked out on the first call to [`RequestDb::conn`]
/// and reused by every later call in the same request. It goes back to the
/// pool when the request finishes, or when the last clone is dropped if the
/// request never gets that far.
#[derive(Clone)]
pub struct RequestDb(Arc<RequestDbInner>);

struct RequestDbInner {
    pool: SqlitePool,
    conn: Mutex<Option<PoolConnection<Sqlite>>>,
}

impl RequestDb {
    pub fn new(pool: SqlitePool) -> Self {
        Self(Arc::new(RequestDbInner {
            pool,
            conn: Mutex::new(None),
        }))
    }

    /// Do not hold the guard across another call to `conn` on the same
    /// handle, it will wait forever.
    pub async fn conn(&self) -> Result<MappedMutexGuard<'_, PoolConnection<Sqlite>>, sqlx::Error> {
        let mut slot = self.0.conn.lock().await;
        let conn = match slot.take() {
            Some(conn) => conn,
            None => {
                tracing::trace!("checking out request connection");
                self.0.pool.acquire().await?
            }
        };
        Ok(MutexGuard::map(slot, |slot| slot.insert(conn)))
    }

    #[cfg(test)]
    pub async fn is_connected(&self) -> bool {
        self.0.conn.lock().await.is_some()
    }

    /// Hands the connection back early. Call this before any session store
    /// operation, the store takes its own connection from the same pool.
    /// A later `conn` checks out a fresh one.
    pub async fn release(&self) {
        if self.0.conn.lock().await.take().is_some() {
            tracing::trace!("released request connection");
        }
    }
}

impl<S> FromRequestParts<S> for RequestDb
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestDb>()
            .cloned()
            .ok_or(AppError::MissingContext("request database"))
    }
}

/// Middleware giving each request its own [`RequestDb`] and releasing its
/// connection once the response has been produced.
pub async fn db_scope(State(pool): State<SqlitePool>, mut req: Request, next: Next) -> Response {
    let db = RequestDb::new(pool);
    req.extensions_mut().insert(db.clone());

    let response = next.run(req).await;

    db.release().await;
    response
}
