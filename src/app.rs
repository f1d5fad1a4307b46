use std::fs;
use std::io;
use std::path::Path;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use tower_http::trace::TraceLayer;
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::SqliteStore;

use crate::appstate::AppState;
use crate::auth;
use crate::blog;
use crate::config::Config;
use crate::db;
use crate::known_errors::AppResult;
use crate::notfoundpage;

/// Builds the application. `config_override` replaces loading the
/// configuration from the environment entirely.
pub async fn create_app(config_override: Option<Config>) -> AppResult<Router> {
    let config = match config_override {
        Some(config) => config,
        None => Config::from_env()?,
    };

    build_app(config, routes()).await
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/hello", get(hello))
        .merge(auth::router())
        .merge(blog::router())
        .fallback(notfoundpage::not_found_page)
}

/// Wraps `routes` in the session, per-request database and identity layers.
pub async fn build_app(config: Config, routes: Router<AppState>) -> AppResult<Router> {
    ensure_instance_folder(&config.instance_path)?;

    let pool = db::connect(&config.database);

    let session_store = SqliteStore::new(pool.clone());
    session_store.migrate().await?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(config.secure_cookies)
        .with_signed(config.signing_key()?);

    let state = AppState::new(pool, &config);

    // outermost layer last: session, then db scope, then identity
    let app = routes
        .layer(middleware::from_fn(auth::load_logged_in_user))
        .layer(middleware::from_fn_with_state(state.clone(), db::db_scope))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

pub fn ensure_instance_folder(path: &Path) -> io::Result<()> {
    match fs::create_dir_all(path) {
        Err(e) if e.kind() != io::ErrorKind::AlreadyExists => Err(e),
        _ => Ok(()),
    }
}

async fn hello() -> &'static str {
    "Hello, World!"
}
