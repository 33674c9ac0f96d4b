/// Session store: one row per live refresh token.
///
/// Tokens are stored as SHA-256 digests of the signed token string, never
/// in plaintext. Rows are deleted the moment they are rotated, logged out,
/// or detected as expired; the absence of a row is what reuse detection
/// keys on, so nothing here soft-deletes.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

/// Hash a refresh token for storage and lookup.
///
/// Single definition used by every insert, lookup, and delete, so the
/// digest cannot drift between write and read paths.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// What a conditional delete removed, for post-hoc expiry inspection and
/// carrying the device label into the replacement session.
#[derive(Debug, sqlx::FromRow)]
pub struct RemovedSession {
    pub expires_at: DateTime<Utc>,
    pub device_label: String,
}

/// Persist a brand-new session row bound to a refresh token.
pub async fn insert_session(
    pool: &PgPool,
    user_id: Uuid,
    token: &str,
    device_label: &str,
    ttl_seconds: i64,
    last_used_at: Option<DateTime<Utc>>,
) -> Result<(), AppError> {
    let token_hash = hash_token(token);
    let now = Utc::now();
    let expires_at = now + Duration::seconds(ttl_seconds);

    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, token_hash, device_label, expires_at, last_used_at, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(token_hash)
    .bind(device_label)
    .bind(expires_at)
    .bind(last_used_at)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Conditionally delete the session row matching a presented token.
///
/// This single statement is the serialization point for racing rotations:
/// of two concurrent redemptions of the same token, exactly one gets the
/// row back and the other observes `None`. The row is removed whether or
/// not it had already expired; the caller inspects `expires_at` on the
/// returned value to tell a clean match from lazy expiry cleanup.
pub async fn take_session(
    pool: &PgPool,
    user_id: Uuid,
    token_hash: &str,
) -> Result<Option<RemovedSession>, AppError> {
    let removed = sqlx::query_as::<_, RemovedSession>(
        r#"
        DELETE FROM sessions
        WHERE user_id = $1 AND token_hash = $2
        RETURNING expires_at, device_label
        "#,
    )
    .bind(user_id)
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;

    Ok(removed)
}

/// Whether the user has at least one unexpired session.
///
/// Consulted by the access guard on every protected request, and by the
/// refresh path to discriminate token reuse from an already-logged-out
/// presentation.
pub async fn user_has_live_session(pool: &PgPool, user_id: Uuid) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM sessions
            WHERE user_id = $1 AND expires_at > NOW()
        )
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Delete every session row for a user. Used for logout-all and for the
/// full revocation triggered by reuse detection.
pub async fn delete_all_sessions_for_user(pool: &PgPool, user_id: Uuid) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_hashing_is_stable() {
        let token = "header.payload.signature";
        let hash1 = hash_token(token);
        let hash2 = hash_token(token);

        assert_eq!(hash1, hash2);
        assert_ne!(token, hash1);
        // SHA-256 hex
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn different_tokens_hash_differently() {
        assert_ne!(hash_token("token-one"), hash_token("token-two"));
    }
}
