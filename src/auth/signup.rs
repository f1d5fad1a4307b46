use axum::extract::Form;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::response::Redirect;
use axum::response::Response;
use maud::Markup;
use maud::html;
use serde::Deserialize;
use thiserror::Error;

use super::CurrentUser;
use super::LOGIN_URL;
use super::user;
use crate::appstate::AppState;
use crate::db::RequestDb;
use crate::known_errors::AppResult;
use crate::theme::layout;

/// Reasons a registration is refused. The messages are shown to the user
/// verbatim.
#[derive(Error, Debug, PartialEq)]
pub enum RegisterError {
    #[error("Username is required.")]
    UsernameRequired,
    #[error("Password is required.")]
    PasswordRequired,
    #[error("User {username} is already registered.")]
    AlreadyRegistered { username: String },
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct RegisterForm {
    username: String,
    password: String,
}

impl RegisterForm {
    /// Checks that only need the form itself, in the order they are reported.
    fn check_fields(&self) -> Result<(), RegisterError> {
        if self.username.is_empty() {
            return Err(RegisterError::UsernameRequired);
        }
        if self.password.is_empty() {
            return Err(RegisterError::PasswordRequired);
        }
        Ok(())
    }
}

pub(super) const INPUT_CLASS: &str = "block w-full rounded-md bg-white px-3 py-1.5 text-base text-gray-900 outline-1 -outline-offset-1 outline-gray-300 placeholder:text-gray-400 focus:outline-2 focus:-outline-offset-2 focus:outline-indigo-600 sm:text-sm/6 dark:bg-white/5 dark:text-white dark:outline-white/10 dark:placeholder:text-gray-500 dark:focus:outline-indigo-500";
pub(super) const BUTTON_CLASS: &str = "flex w-full justify-center rounded-md bg-indigo-600 px-3 py-1.5 text-sm/6 font-semibold text-white shadow-xs hover:bg-indigo-500 focus-visible:outline-2 focus-visible:outline-offset-2 focus-visible:outline-indigo-600 dark:bg-indigo-500 dark:shadow-none dark:hover:bg-indigo-400 dark:focus-visible:outline-indigo-500";

/// The username/password form shared by the register and login pages.
pub(super) fn credentials_form(action: &str, submit: &str) -> Markup {
    html! {
        form method="post" action=(action) class="space-y-6" {
            div {
                label for="username" class="block text-sm/6 font-medium text-gray-900 dark:text-gray-100" {
                    "Username"
                }
                div class="mt-2" {
                    input id="username" name="username" type="text" required autocomplete="username" class=(INPUT_CLASS);
                }
            }
            div {
                label for="password" class="block text-sm/6 font-medium text-gray-900 dark:text-gray-100" {
                    "Password"
                }
                div class="mt-2" {
                    input id="password" name="password" type="password" required class=(INPUT_CLASS);
                }
            }
            div {
                button type="submit" class=(BUTTON_CLASS) { (submit) }
            }
        }
    }
}

fn register_page(current: &CurrentUser, error: Option<&RegisterError>) -> Markup {
    let message = error.map(ToString::to_string);
    layout(
        "Register",
        current.user(),
        message.as_deref(),
        html! {
            h2 class="mt-10 text-center text-2xl/9 font-bold tracking-tight text-gray-900 dark:text-white" {
                "Register"
            }
            (credentials_form("/auth/register", "Register"))
        },
    )
}

pub async fn register_get(current: CurrentUser) -> Markup {
    register_page(&current, None)
}

pub async fn register_post(
    State(state): State<AppState>,
    current: CurrentUser,
    db: RequestDb,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    match register(&state, &db, form).await? {
        Ok(()) => Ok(Redirect::to(LOGIN_URL).into_response()),
        Err(e) => {
            tracing::info!(reason = %e, "registration rejected");
            Ok(register_page(&current, Some(&e)).into_response())
        }
    }
}

/// Outer result is for infrastructure failures, inner one for input the user
/// has to fix.
async fn register(
    state: &AppState,
    db: &RequestDb,
    form: RegisterForm,
) -> AppResult<Result<(), RegisterError>> {
    if let Err(e) = form.check_fields() {
        return Ok(Err(e));
    }

    let already_registered = || RegisterError::AlreadyRegistered {
        username: form.username.clone(),
    };

    if user::username_exists(&mut *db.conn().await?, &form.username).await? {
        return Ok(Err(already_registered()));
    }

    let hash = user::hash_password(form.password.clone(), state.bcrypt_cost).await?;

    match user::insert(&mut *db.conn().await?, &form.username, &hash).await? {
        Some(id) => {
            tracing::info!(user_id = id, username = %form.username, "registered new user");
            Ok(Ok(()))
        }
        None => Ok(Err(already_registered())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(username: &str, password: &str) -> RegisterForm {
        RegisterForm {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_field_checks_report_first_failure() {
        assert_eq!(
            form("", "").check_fields(),
            Err(RegisterError::UsernameRequired)
        );
        assert_eq!(
            form("alice", "").check_fields(),
            Err(RegisterError::PasswordRequired)
        );
        assert_eq!(form("alice", "s3cret").check_fields(), Ok(()));
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            RegisterError::UsernameRequired.to_string(),
            "Username is required."
        );
        assert_eq!(
            RegisterError::PasswordRequired.to_string(),
            "Password is required."
        );
        assert_eq!(
            RegisterError::AlreadyRegistered {
                username: "alice".to_string()
            }
            .to_string(),
            "User alice is already registered."
        );
    }
}
