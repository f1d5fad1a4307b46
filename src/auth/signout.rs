use axum::response::Redirect;
use tower_sessions::Session;

use super::CurrentUser;

/// Forgets everything stored for this browser. Safe to hit without being
/// logged in.
pub async fn logout(session: Session, current: CurrentUser) -> Redirect {
    if let Some(user) = current.user() {
        tracing::info!(user_id = user.id, "user logged out");
    }

    session.clear().await;

    Redirect::to("/")
}
