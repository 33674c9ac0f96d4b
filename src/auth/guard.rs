/// Access guard: turns a bearer token into an authenticated principal.
///
/// Cryptographic validity alone is not enough: the subject must still
/// resolve to a live (non-deleted) account with at least one unexpired
/// session. That second condition is what makes logout take effect for
/// access tokens that have not yet hit their own expiry.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::claims::TokenKind;
use crate::auth::codec::TokenCodec;
use crate::auth::session::user_has_live_session;
use crate::error::{AppError, AuthError};
use crate::users::{find_user_by_id, Role};

/// The authenticated identity handed to resource handlers. Role and
/// username come from the token snapshot: account changes take effect on
/// the next login or refresh, not retroactively.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

pub async fn authenticate(
    pool: &PgPool,
    codec: &TokenCodec,
    bearer: &str,
) -> Result<Principal, AppError> {
    let claims = codec.verify(bearer)?;

    if claims.kind != TokenKind::Access {
        tracing::warn!("refresh token presented as a bearer credential");
        return Err(AppError::Auth(AuthError::WrongTokenKind));
    }

    let user_id = claims.user_id()?;
    let (username, role) = match (claims.username, claims.role) {
        (Some(username), Some(role)) => (username, role),
        // An access token without the snapshot never left this server.
        _ => {
            tracing::warn!(user_id = %user_id, "access token missing identity snapshot");
            return Err(AppError::Auth(AuthError::InvalidToken));
        }
    };

    if find_user_by_id(pool, user_id).await?.is_none() {
        tracing::warn!(user_id = %user_id, "bearer token for unknown or deleted user");
        return Err(AppError::Auth(AuthError::UnknownUser));
    }

    if !user_has_live_session(pool, user_id).await? {
        tracing::warn!(user_id = %user_id, "bearer token for user with no live session");
        return Err(AppError::Auth(AuthError::NoLiveSession));
    }

    Ok(Principal {
        user_id,
        username,
        role,
    })
}
