//! PostgreSQL storage engine.
//!
//! Records live in a single `records` table keyed by (collection, key).
//! A batch runs inside one transaction; the row lock taken by
//! `SELECT ... FOR UPDATE` pins the version until commit.

use sqlx::{PgPool, Postgres, Transaction};

use super::repository::{WriteAction, WriteOp};
use super::StoreError;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn get(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<(i64, serde_json::Value)>, StoreError> {
        let row: Option<(i64, serde_json::Value)> = sqlx::query_as(
            r#"
            SELECT version, data FROM records
            WHERE collection = $1 AND key = $2
            "#,
        )
        .bind(collection)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list(&self, collection: &str) -> Result<Vec<(i64, serde_json::Value)>, StoreError> {
        let rows: Vec<(i64, serde_json::Value)> = sqlx::query_as(
            r#"
            SELECT version, data FROM records
            WHERE collection = $1
            ORDER BY key ASC
            "#,
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for op in &ops {
            let current = Self::current_version(&mut tx, op).await?;

            if matches!(op.action, WriteAction::Delete) && current == 0 {
                return Err(StoreError::NotFound {
                    collection: op.collection,
                    key: op.key.clone(),
                });
            }
            if current != op.expected_version {
                return Err(StoreError::ConcurrencyConflict {
                    collection: op.collection,
                    key: op.key.clone(),
                    expected: op.expected_version,
                    actual: current,
                });
            }

            match &op.action {
                WriteAction::Upsert(data) if current == 0 => {
                    // Row locks cannot cover a row that does not exist yet;
                    // the primary key settles racing inserts.
                    let result = sqlx::query(
                        r#"
                        INSERT INTO records (collection, key, version, data, updated_at)
                        VALUES ($1, $2, 1, $3, NOW())
                        ON CONFLICT (collection, key) DO NOTHING
                        "#,
                    )
                    .bind(op.collection)
                    .bind(&op.key)
                    .bind(data)
                    .execute(&mut *tx)
                    .await?;

                    if result.rows_affected() != 1 {
                        return Err(StoreError::ConcurrencyConflict {
                            collection: op.collection,
                            key: op.key.clone(),
                            expected: 0,
                            actual: 1,
                        });
                    }
                }
                WriteAction::Upsert(data) => {
                    sqlx::query(
                        r#"
                        UPDATE records
                        SET version = $3, data = $4, updated_at = NOW()
                        WHERE collection = $1 AND key = $2
                        "#,
                    )
                    .bind(op.collection)
                    .bind(&op.key)
                    .bind(current + 1)
                    .bind(data)
                    .execute(&mut *tx)
                    .await?;
                }
                WriteAction::Delete => {
                    sqlx::query(
                        r#"
                        DELETE FROM records WHERE collection = $1 AND key = $2
                        "#,
                    )
                    .bind(op.collection)
                    .bind(&op.key)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn current_version(
        tx: &mut Transaction<'_, Postgres>,
        op: &WriteOp,
    ) -> Result<i64, StoreError> {
        let version: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT version FROM records
            WHERE collection = $1 AND key = $2
            FOR UPDATE
            "#,
        )
        .bind(op.collection)
        .bind(&op.key)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(version.unwrap_or(0))
    }
}
