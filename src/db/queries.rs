use crate::db::models::{NewSecret, SecretRecord, SecretRow};
use crate::db::RepositoryResult;
use async_trait::async_trait;
use sqlx::{Pool, Sqlite};
use tracing::info;

pub type DbPool = Pool<Sqlite>;

/// Durable keyed storage for secrets.
///
/// Implementations must make `remove` and `fetch_and_delete` atomic per
/// lookup key: of two concurrent callers, at most one observes the row as
/// deleted by itself.
#[async_trait]
pub trait SecretRepository: Send + Sync {
    /// Insert a new secret and return its storage id.
    ///
    /// Fails with [`RepositoryError::Conflict`](crate::db::RepositoryError::Conflict) if the lookup key is taken.
    async fn insert(&self, secret: NewSecret) -> RepositoryResult<i64>;

    /// Get secret by lookup key
    async fn find(&self, lookup_key: &str) -> RepositoryResult<Option<SecretRecord>>;

    /// Delete the row identified by `id` and `lookup_key` if it still exists.
    ///
    /// Returns `true` only for the caller whose statement removed the row.
    async fn remove(&self, id: i64, lookup_key: &str) -> RepositoryResult<bool>;

    /// Delete by lookup key and return the deleted row in one statement.
    async fn fetch_and_delete(&self, lookup_key: &str) -> RepositoryResult<Option<SecretRecord>>;
}

/// SQLite-backed secret repository
#[derive(Debug, Clone)]
pub struct SqliteSecretRepository {
    pool: DbPool,
}

impl SqliteSecretRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SecretRepository for SqliteSecretRepository {
    async fn insert(&self, secret: NewSecret) -> RepositoryResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO secrets (created_at, expires_at, lookup_key, key_remainder, passphrase_hash, ciphertext)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(secret.created_at)
        .bind(secret.expires_at)
        .bind(&secret.lookup_key)
        .bind(secret.key_remainder.expose())
        .bind(secret.passphrase_hash.as_deref().unwrap_or_default())
        .bind(&secret.ciphertext)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn find(&self, lookup_key: &str) -> RepositoryResult<Option<SecretRecord>> {
        let row = sqlx::query_as::<_, SecretRow>("SELECT * FROM secrets WHERE lookup_key = ? LIMIT 1")
            .bind(lookup_key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn remove(&self, id: i64, lookup_key: &str) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM secrets WHERE id = ? AND lookup_key = ?")
            .bind(id)
            .bind(lookup_key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn fetch_and_delete(&self, lookup_key: &str) -> RepositoryResult<Option<SecretRecord>> {
        let row = sqlx::query_as::<_, SecretRow>("DELETE FROM secrets WHERE lookup_key = ? RETURNING *")
            .bind(lookup_key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }
}

#[cfg(test)]
pub async fn setup_test_db() -> DbPool {
    use sqlx::sqlite::SqlitePoolOptions;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    init_db(&pool).await.expect("Failed to init database");
    pool
}

/// Initialize database with migrations
pub async fn init_db(pool: &DbPool) -> Result<(), sqlx::Error> {
    info!("Running database migrations");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS secrets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at DATETIME NOT NULL,
            expires_at DATETIME NOT NULL,
            lookup_key TEXT UNIQUE NOT NULL,
            key_remainder TEXT NOT NULL,
            passphrase_hash TEXT NOT NULL DEFAULT '',
            ciphertext TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_secrets_lookup_key ON secrets(lookup_key)")
        .execute(pool)
        .await?;

    info!("Database migrations complete");
    Ok(())
}
