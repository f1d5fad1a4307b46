use axum::extract::Form;
use axum::response::IntoResponse;
use axum::response::Redirect;
use axum::response::Response;
use maud::Markup;
use maud::html;
use serde::Deserialize;
use thiserror::Error;
use tower_sessions::Session;

use super::CurrentUser;
use super::USER_ID_KEY;
use super::signup::credentials_form;
use super::user;
use super::user::User;
use crate::db::RequestDb;
use crate::known_errors::AppResult;
use crate::theme::layout;

#[derive(Error, Debug, PartialEq)]
pub enum LoginError {
    #[error("Incorrect username.")]
    IncorrectUsername,
    #[error("Incorrect password.")]
    IncorrectPassword,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct LoginForm {
    username: String,
    password: String,
}

fn login_page(current: &CurrentUser, error: Option<&LoginError>) -> Markup {
    let message = error.map(ToString::to_string);
    layout(
        "Log In",
        current.user(),
        message.as_deref(),
        html! {
            h2 class="mt-10 text-center text-2xl/9 font-bold tracking-tight text-gray-900 dark:text-white" {
                "Log In"
            }
            (credentials_form("/auth/login", "Log In"))
            p class="mt-6 text-center text-sm/6 text-gray-500 dark:text-gray-400" {
                "Need an account? "
                a href="/auth/register" class="font-semibold text-indigo-600 hover:text-indigo-500 dark:text-indigo-400 dark:hover:text-indigo-300" {
                    "Register"
                }
            }
        },
    )
}

pub async fn login_get(current: CurrentUser) -> Markup {
    login_page(&current, None)
}

pub async fn login_post(
    session: Session,
    current: CurrentUser,
    db: RequestDb,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let user = match authenticate(&db, form).await? {
        Ok(user) => user,
        Err(e) => {
            tracing::info!(reason = %e, "login rejected");
            return Ok(login_page(&current, Some(&e)).into_response());
        }
    };

    // the session store draws from the same pool
    db.release().await;

    // drop whatever the browser had before, including a previous login
    session.clear().await;
    session.cycle_id().await?;
    session.insert(USER_ID_KEY, user.id).await?;

    tracing::info!(user_id = user.id, username = %user.username, "user logged in");
    Ok(Redirect::to("/").into_response())
}

async fn authenticate(db: &RequestDb, form: LoginForm) -> AppResult<Result<User, LoginError>> {
    let found = user::find_by_username(&mut *db.conn().await?, &form.username).await?;

    let Some(user) = found else {
        return Ok(Err(LoginError::IncorrectUsername));
    };

    if !user::verify_password(form.password, user.password_hash().to_string()).await? {
        return Ok(Err(LoginError::IncorrectPassword));
    }

    Ok(Ok(user))
}
