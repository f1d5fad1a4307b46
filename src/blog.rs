use axum::Router;
use axum::extract::Form;
use axum::middleware;
use axum::response::IntoResponse;
use axum::response::Redirect;
use axum::response::Response;
use axum::routing::get;
use chrono::NaiveDateTime;
use maud::Markup;
use maud::html;
use serde::Deserialize;
use sqlx::SqliteConnection;
use sqlx::prelude::FromRow;
use thiserror::Error;

use crate::appstate::AppState;
use crate::auth::CurrentUser;
use crate::auth::login_required;
use crate::auth::user::UserId;
use crate::db::RequestDb;
use crate::known_errors::AppError;
use crate::known_errors::AppResult;
use crate::theme::layout;

pub fn router() -> Router<AppState> {
    let guarded = Router::new()
        .route("/create", get(create_get).post(create_post))
        .route_layer(middleware::from_fn(login_required));

    Router::new().route("/", get(index)).merge(guarded)
}

#[derive(FromRow, Debug)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub created: NaiveDateTime,
    pub username: String,
}

#[derive(Error, Debug, PartialEq)]
pub enum PostError {
    #[error("Title is required.")]
    TitleRequired,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct PostForm {
    title: String,
    body: String,
}

pub async fn list_posts(conn: &mut SqliteConnection) -> Result<Vec<Post>, AppError> {
    let posts = sqlx::query_as::<_, Post>(
        r#"
        SELECT p.id, title, body, created, username
        FROM post p JOIN user u ON p.author_id = u.id
        ORDER BY created DESC, p.id DESC
        "#,
    )
    .fetch_all(conn)
    .await?;

    Ok(posts)
}

pub async fn insert_post(
    conn: &mut SqliteConnection,
    author_id: UserId,
    title: &str,
    body: &str,
) -> Result<i64, AppError> {
    let done = sqlx::query("INSERT INTO post (title, body, author_id) VALUES (?, ?, ?)")
        .bind(title)
        .bind(body)
        .bind(author_id)
        .execute(conn)
        .await?;

    Ok(done.last_insert_rowid())
}

pub async fn index(current: CurrentUser, db: RequestDb) -> AppResult<Markup> {
    let posts = list_posts(&mut *db.conn().await?).await?;

    Ok(layout(
        "Posts",
        current.user(),
        None,
        html! {
            header class="flex items-center justify-between" {
                h1 class="text-2xl/9 font-bold tracking-tight" { "Posts" }
                @if current.user().is_some() {
                    a href="/create" class="font-semibold text-indigo-600 hover:text-indigo-500 dark:text-indigo-400" { "New" }
                }
            }
            @for post in &posts {
                article id=(format!("post-{}", post.id)) class="border-b border-gray-200 dark:border-gray-700 pb-4" {
                    h2 class="text-lg font-semibold" { (post.title) }
                    div class="text-xs text-gray-500 dark:text-gray-400" {
                        "by " (post.username) " on " (post.created.format("%Y-%m-%d"))
                    }
                    p class="mt-2 whitespace-pre-line" { (post.body) }
                }
            }
        },
    ))
}

fn create_page(current: &CurrentUser, error: Option<&PostError>) -> Markup {
    let message = error.map(ToString::to_string);
    layout(
        "New Post",
        current.user(),
        message.as_deref(),
        html! {
            h1 class="text-2xl/9 font-bold tracking-tight" { "New Post" }
            form method="post" action="/create" class="space-y-6" {
                div {
                    label for="title" class="block text-sm/6 font-medium" { "Title" }
                    input id="title" name="title" required class="mt-2 block w-full rounded-md px-3 py-1.5 outline-1 outline-gray-300";
                }
                div {
                    label for="body" class="block text-sm/6 font-medium" { "Body" }
                    textarea id="body" name="body" class="mt-2 block w-full rounded-md px-3 py-1.5 outline-1 outline-gray-300" {}
                }
                button type="submit" class="rounded-md bg-indigo-600 px-3 py-1.5 text-sm/6 font-semibold text-white" { "Save" }
            }
        },
    )
}

pub async fn create_get(current: CurrentUser) -> Markup {
    create_page(&current, None)
}

pub async fn create_post(
    current: CurrentUser,
    db: RequestDb,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    let author = current
        .user()
        .ok_or(AppError::MissingContext("logged in user"))?;

    if form.title.is_empty() {
        return Ok(create_page(&current, Some(&PostError::TitleRequired)).into_response());
    }

    let id = insert_post(&mut *db.conn().await?, author.id, &form.title, &form.body).await?;
    tracing::info!(post_id = id, author_id = author.id, "created post");

    Ok(Redirect::to("/").into_response())
}
