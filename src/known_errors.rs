use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use maud::html;
use thiserror::Error;

use crate::config::ConfigError;
use crate::theme::theme_with_head;

/// Failures that are not the user's fault. Validation problems never end up
/// here, they are rendered back onto the form that caused them.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("request context missing: {0}")]
    MissingContext(&'static str),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");

        let markup = theme_with_head(
            Some("Error"),
            html! {},
            html! {
                div class="mx-auto max-w-sm px-6 py-12" {
                    h2 class="text-2xl/9 font-bold tracking-tight" { "Internal Server Error" }
                    p class="mt-4 text-sm text-gray-600 dark:text-gray-400" {
                        "Something went wrong while handling your request."
                    }
                }
            },
        );

        (StatusCode::INTERNAL_SERVER_ERROR, markup).into_response()
    }
}
