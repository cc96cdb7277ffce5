use chrono::{DateTime, Utc};
use sqlx::Row;
use study_core::model::UserId;

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, ser, user_id_from_i64};
use crate::repository::{
    NewRefreshToken, RefreshTokenRecord, RefreshTokenRepository, StorageError,
};

#[async_trait::async_trait]
impl RefreshTokenRepository for SqliteRepository {
    async fn insert_token(&self, token: &NewRefreshToken) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO refresh_tokens (user_id, token_hash, issued_at, expires_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(id_to_i64("user_id", token.user_id.value())?)
        .bind(&token.token_hash)
        .bind(token.issued_at)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(res.last_insert_rowid())
    }

    async fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, token_hash, issued_at, expires_at, revoked_at
            FROM refresh_tokens WHERE token_hash = ?1
            ",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(RefreshTokenRecord {
            id: row.try_get("id").map_err(ser)?,
            user_id: user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
            token_hash: row.try_get("token_hash").map_err(ser)?,
            issued_at: row.try_get("issued_at").map_err(ser)?,
            expires_at: row.try_get("expires_at").map_err(ser)?,
            revoked_at: row.try_get("revoked_at").map_err(ser)?,
        }))
    }

    async fn revoke(&self, id: i64, at: DateTime<Utc>) -> Result<bool, StorageError> {
        // The `revoked_at IS NULL` guard makes concurrent refreshes of one token race-safe:
        // only one caller sees a row affected.
        let res = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = ?1 WHERE id = ?2 AND revoked_at IS NULL",
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(res.rows_affected() == 1)
    }

    async fn revoke_all_for_user(
        &self,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let res = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = ?1 WHERE user_id = ?2 AND revoked_at IS NULL",
        )
        .bind(at)
        .bind(id_to_i64("user_id", user_id.value())?)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(res.rows_affected())
    }
}
