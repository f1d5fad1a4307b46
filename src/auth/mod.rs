mod signin;
mod signout;
mod signup;
pub mod user;

use axum::Router;
use axum::extract::FromRequestParts;
use axum::extract::Request;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Redirect;
use axum::response::Response;
use axum::routing::get;
use tower_sessions::Session;

use crate::appstate::AppState;
use crate::db::RequestDb;
use crate::known_errors::AppError;
use user::User;
use user::UserId;

/// Session key holding the logged in user's id.
pub const USER_ID_KEY: &str = "user_id";

pub const LOGIN_URL: &str = "/auth/login";

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/auth/register",
            get(signup::register_get).post(signup::register_post),
        )
        .route("/auth/login", get(signin::login_get).post(signin::login_post))
        .route("/auth/logout", get(signout::logout))
}

/// Who is making the current request, resolved once by
/// [`load_logged_in_user`] before any handler runs.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub Option<User>);

impl CurrentUser {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::MissingContext("current user"))
    }
}

/// Resolves the session's `user_id` to a user row and publishes it to the
/// rest of the request as a [`CurrentUser`]. A stale id resolves to nobody.
pub async fn load_logged_in_user(
    session: Session,
    db: RequestDb,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let current = match session.get::<UserId>(USER_ID_KEY).await? {
        None => None,
        Some(id) => {
            let mut conn = db.conn().await?;
            let found = user::find_by_id(&mut conn, id).await?;
            if found.is_none() {
                tracing::debug!(user_id = id, "session refers to a user that no longer exists");
            }
            found
        }
    };

    req.extensions_mut().insert(CurrentUser(current));
    Ok(next.run(req).await)
}

/// Route layer for pages that need a logged in user. Anonymous requests are
/// redirected to the login page and never reach the wrapped handler.
pub async fn login_required(current_user: CurrentUser, req: Request, next: Next) -> Response {
    if current_user.0.is_none() {
        return Redirect::to(LOGIN_URL).into_response();
    }

    next.run(req).await
}
