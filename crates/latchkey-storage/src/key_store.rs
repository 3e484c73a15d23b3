//! Authorization lookups against the key database.

use crate::connection::Database;
use crate::error::StorageResult;
use latchkey_core::{AccessAuthorizer, Result};
use sqlx::SqlitePool;
use tracing::debug;

/// A key is allowed when it exists and belongs to an existing member.
const ACCESS_ALLOWED: &str = r#"
    SELECT COUNT(*) > 0
    FROM "key"
    JOIN member ON "key".member_id = member.id
    WHERE "key".uuid = ?
"#;

/// SQLite-backed [`AccessAuthorizer`].
#[derive(Debug, Clone)]
pub struct SqliteKeyStore {
    pool: SqlitePool,
}

impl SqliteKeyStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn from_database(db: &Database) -> Self {
        Self::new(db.pool().clone())
    }

    async fn lookup(&self, tag_id: &str) -> StorageResult<bool> {
        let allowed: i64 = sqlx::query_scalar(ACCESS_ALLOWED)
            .bind(tag_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(allowed != 0)
    }
}

impl AccessAuthorizer for SqliteKeyStore {
    async fn is_access_allowed(&self, tag_id: &str) -> Result<bool> {
        let allowed = self.lookup(tag_id).await?;
        debug!(key = tag_id, allowed, "Looked up key");
        Ok(allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    async fn seeded() -> Database {
        let db = Database::in_memory().await.unwrap();
        sqlx::query("INSERT INTO member (id, name) VALUES (1, 'Ada')")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO \"key\" (uuid, member_id) VALUES ('deadbeef', 1), ('0badf00d', NULL)")
            .execute(db.pool())
            .await
            .unwrap();
        db
    }

    #[rstest]
    #[case::member_key("deadbeef", true)]
    #[case::unassigned_key("0badf00d", false)]
    #[case::unknown_key("cafebabe", false)]
    #[case::case_sensitive("DEADBEEF", false)]
    #[tokio::test]
    async fn test_access_lookup(#[case] tag_id: &str, #[case] expected: bool) {
        let store = SqliteKeyStore::from_database(&seeded().await);
        assert_eq!(store.is_access_allowed(tag_id).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_closed_pool_is_lookup_error() {
        let db = seeded().await;
        let store = SqliteKeyStore::from_database(&db);
        db.close().await;

        let err = store.is_access_allowed("deadbeef").await.unwrap_err();
        assert!(matches!(err, latchkey_core::Error::Lookup(_)));
    }
}
