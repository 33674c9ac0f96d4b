/// Session manager: registration, login, refresh-token rotation with reuse
/// detection, and logout.
///
/// Every operation returns a typed `Result`; authentication failures of any
/// internal cause surface as the same `AuthError` so callers cannot probe
/// which step rejected them.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::claims::TokenKind;
use crate::auth::codec::TokenCodec;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::session::{
    delete_all_sessions_for_user, hash_token, insert_session, take_session, user_has_live_session,
};
use crate::error::{AppError, AuthError};
use crate::users::{find_credentials_by_username, find_user_by_id, insert_user, NewUser, User};
use crate::validators::{
    is_valid_device_label, is_valid_email, is_valid_student_number, is_valid_username,
};

/// A freshly minted access/refresh pair plus the sanitized account.
#[derive(Debug)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

/// Registration input, as received from the transport layer.
pub struct Registration {
    pub username: String,
    pub email: String,
    pub student_number: String,
    pub password: String,
    pub device: Option<String>,
}

#[derive(Clone)]
pub struct SessionManager {
    pool: PgPool,
    codec: TokenCodec,
    hash_cost: u32,
}

impl SessionManager {
    pub fn new(pool: PgPool, codec: TokenCodec, hash_cost: u32) -> Self {
        Self {
            pool,
            codec,
            hash_cost,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Register a new member account and open its first session.
    ///
    /// Collisions on username, email, or student number surface as a
    /// `ConflictError` naming the field; under racing registrations the
    /// unique indexes guarantee exactly one winner.
    pub async fn register(&self, registration: Registration) -> Result<SessionTokens, AppError> {
        let username = is_valid_username(&registration.username)?;
        let email = is_valid_email(&registration.email)?;
        let student_number = is_valid_student_number(&registration.student_number)?;
        let device = is_valid_device_label(registration.device.as_deref())?;
        let password_hash = hash_password(&registration.password, self.hash_cost)?;

        let user = insert_user(
            &self.pool,
            NewUser {
                username,
                email,
                student_number,
                password_hash,
            },
        )
        .await?;

        tracing::info!(user_id = %user.id, "user registered");

        self.issue_tokens(user, &device, None).await
    }

    /// Authenticate with username and password and open a session.
    ///
    /// Unknown username and wrong password produce the same error.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        device: Option<&str>,
    ) -> Result<SessionTokens, AppError> {
        let device = is_valid_device_label(device)?;

        let (user, password_hash) =
            match find_credentials_by_username(&self.pool, username.trim()).await? {
                Some(found) => found,
                None => {
                    tracing::warn!("login attempt for unknown username");
                    return Err(AppError::Auth(AuthError::InvalidCredentials));
                }
            };

        if !verify_password(password, &password_hash)? {
            tracing::warn!(user_id = %user.id, "login attempt with wrong password");
            return Err(AppError::Auth(AuthError::InvalidCredentials));
        }

        tracing::info!(user_id = %user.id, "user logged in");

        self.issue_tokens(user, &device, None).await
    }

    /// Mint an access/refresh pair and persist exactly one brand-new
    /// session row bound to the refresh token. The only path that creates
    /// session rows.
    async fn issue_tokens(
        &self,
        user: User,
        device_label: &str,
        last_used_at: Option<chrono::DateTime<Utc>>,
    ) -> Result<SessionTokens, AppError> {
        let access_token = self.codec.issue_access(&user)?;
        let refresh_token = self.codec.issue_refresh(user.id)?;

        insert_session(
            &self.pool,
            user.id,
            &refresh_token,
            device_label,
            self.codec.refresh_token_expiry(),
            last_used_at,
        )
        .await?;

        Ok(SessionTokens {
            access_token,
            refresh_token,
            user,
        })
    }

    /// Redeem a refresh token for a new access/refresh pair.
    ///
    /// Rotation: the presented token's session row is removed in the same
    /// statement that matches it, so a second redemption of the same token
    /// can never also succeed. A signature-valid, unexpired token that
    /// matches no row while the user still holds other live sessions can
    /// only have been rotated away already — that is the theft signal, and
    /// it revokes every session the user has.
    pub async fn refresh(&self, presented: &str) -> Result<SessionTokens, AppError> {
        let claims = self.codec.verify(presented)?;

        if claims.kind != TokenKind::Refresh {
            tracing::warn!("access token presented at the refresh endpoint");
            return Err(AppError::Auth(AuthError::WrongTokenKind));
        }

        let user_id = claims.user_id()?;
        let user = match find_user_by_id(&self.pool, user_id).await? {
            Some(user) => user,
            None => {
                tracing::warn!(user_id = %user_id, "refresh token for unknown or deleted user");
                return Err(AppError::Auth(AuthError::UnknownUser));
            }
        };

        let token_hash = hash_token(presented);
        match take_session(&self.pool, user_id, &token_hash).await? {
            Some(removed) => {
                if removed.expires_at <= Utc::now() {
                    // Lazy expiry cleanup; the delete above already removed the row.
                    tracing::info!(user_id = %user_id, "expired refresh token removed on redemption");
                    return Err(AppError::Auth(AuthError::InvalidToken));
                }

                self.issue_tokens(user, &removed.device_label, Some(Utc::now()))
                    .await
            }
            None => {
                if user_has_live_session(&self.pool, user_id).await? {
                    let revoked = delete_all_sessions_for_user(&self.pool, user_id).await?;
                    tracing::warn!(
                        user_id = %user_id,
                        revoked_sessions = revoked,
                        "refresh token reuse detected; all sessions revoked"
                    );
                    Err(AppError::Auth(AuthError::ReusedToken))
                } else {
                    tracing::warn!(user_id = %user_id, "refresh token presented with no live session");
                    Err(AppError::Auth(AuthError::InvalidToken))
                }
            }
        }
    }

    /// Log out one device (token supplied) or every device (no token).
    ///
    /// Idempotent: an unknown or already-removed token is a success, and
    /// the user-id scoping means no other user's sessions can be touched.
    pub async fn logout(
        &self,
        user_id: Uuid,
        refresh_token: Option<&str>,
    ) -> Result<(), AppError> {
        match refresh_token {
            Some(token) => {
                let removed = take_session(&self.pool, user_id, &hash_token(token)).await?;
                tracing::info!(
                    user_id = %user_id,
                    removed = removed.is_some(),
                    "single-device logout"
                );
            }
            None => {
                let removed = delete_all_sessions_for_user(&self.pool, user_id).await?;
                tracing::info!(user_id = %user_id, removed_sessions = removed, "logout");
            }
        }

        Ok(())
    }

    /// Sign out everywhere: remove every session row for the user.
    pub async fn logout_all(&self, user_id: Uuid) -> Result<u64, AppError> {
        let removed = delete_all_sessions_for_user(&self.pool, user_id).await?;
        tracing::info!(user_id = %user_id, removed_sessions = removed, "logout from all devices");
        Ok(removed)
    }
}
