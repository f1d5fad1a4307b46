use sqlx::SqliteConnection;
use sqlx::prelude::FromRow;
use std::fmt;
use tokio::task;

use crate::known_errors::AppError;

pub type UserId = i64;

#[derive(Clone, FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    password: String,
}

impl User {
    pub fn password_hash(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: UserId) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM user WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(user)
}

pub async fn find_by_username(
    conn: &mut SqliteConnection,
    username: &str,
) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM user WHERE username = ?")
        .bind(username)
        .fetch_optional(conn)
        .await?;

    Ok(user)
}

pub async fn username_exists(conn: &mut SqliteConnection, username: &str) -> Result<bool, AppError> {
    let id: Option<UserId> = sqlx::query_scalar("SELECT id FROM user WHERE username = ?")
        .bind(username)
        .fetch_optional(conn)
        .await?;

    Ok(id.is_some())
}

/// Returns `Ok(None)` when the username was taken between the existence
/// check and this insert.
pub async fn insert(
    conn: &mut SqliteConnection,
    username: &str,
    password_hash: &str,
) -> Result<Option<UserId>, AppError> {
    let result = sqlx::query("INSERT INTO user (username, password) VALUES (?, ?)")
        .bind(username)
        .bind(password_hash)
        .execute(conn)
        .await;

    match result {
        Ok(done) => Ok(Some(done.last_insert_rowid())),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    let hash = task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    let matches = task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    const TEST_COST: u32 = 4;

    async fn test_pool() -> (TempDir, SqlitePool) {
        let dir = TempDir::new().expect("temp dir");
        let pool = db::connect(&dir.path().join("users.sqlite"));
        db::init_db(&pool).await.expect("init schema");
        (dir, pool)
    }

    #[tokio::test]
    async fn test_hash_is_not_plaintext_and_verifies() {
        let hash = hash_password("s3cret".to_string(), TEST_COST)
            .await
            .expect("hash");

        assert_ne!(hash, "s3cret");
        assert!(
            verify_password("s3cret".to_string(), hash.clone())
                .await
                .expect("verify")
        );
        assert!(
            !verify_password("wrong".to_string(), hash)
                .await
                .expect("verify")
        );
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let (_dir, pool) = test_pool().await;
        let mut conn = pool.acquire().await.expect("connection");

        assert!(!username_exists(&mut conn, "alice").await.expect("exists"));

        let id = insert(&mut conn, "alice", "hash")
            .await
            .expect("insert")
            .expect("new user id");

        assert!(username_exists(&mut conn, "alice").await.expect("exists"));

        let by_name = find_by_username(&mut conn, "alice")
            .await
            .expect("lookup")
            .expect("user present");
        assert_eq!(by_name.id, id);
        assert_eq!(by_name.password_hash(), "hash");

        let by_id = find_by_id(&mut conn, id)
            .await
            .expect("lookup")
            .expect("user present");
        assert_eq!(by_id.username, "alice");

        assert!(find_by_id(&mut conn, id + 1).await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_reported_as_conflict() {
        let (_dir, pool) = test_pool().await;
        let mut conn = pool.acquire().await.expect("connection");

        insert(&mut conn, "alice", "hash")
            .await
            .expect("insert")
            .expect("new user id");

        let second = insert(&mut conn, "alice", "other").await.expect("insert");
        assert!(second.is_none());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user")
            .fetch_one(&mut *conn)
            .await
            .expect("count");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_debug_redacts_password() {
        let user = User {
            id: 1,
            username: "alice".to_string(),
            password: "hash".to_string(),
        };
        let debug = format!("{user:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hash"));
    }
}
