/// JWT claims carried by access and refresh tokens.
///
/// Both kinds share the envelope (subject, kind marker, expiry, issuer,
/// token id). Access tokens additionally snapshot the username and role so
/// protected requests can be authorized without re-reading the account row;
/// refresh tokens carry the subject and kind marker only.

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AuthError};
use crate::users::{Role, User};

/// Discriminates access tokens from refresh tokens. A refresh token is
/// never valid for resource access and an access token is never redeemable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Token kind marker
    pub kind: TokenKind,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Token id; makes two tokens minted in the same second distinct
    pub jti: String,
    /// Username snapshot (access tokens only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Role snapshot (access tokens only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl Claims {
    /// Claims for an access token: subject plus username/role snapshot.
    pub fn access(user: &User, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user.id.to_string(),
            kind: TokenKind::Access,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
            jti: token_id(),
            username: Some(user.username.clone()),
            role: Some(user.role),
        }
    }

    /// Claims for a refresh token: subject and kind marker only.
    pub fn refresh(user_id: Uuid, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            kind: TokenKind::Refresh,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
            jti: token_id(),
            username: None,
            role: None,
        }
    }

    /// Extract the subject user id. A non-UUID subject is treated as a
    /// forged token, not an internal error.
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| {
            tracing::warn!("token subject is not a valid UUID");
            AppError::Auth(AuthError::InvalidToken)
        })
    }
}

/// Random 32-character token id.
fn token_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            student_number: "20231234".to_string(),
            role: Role::Member,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn access_claims_carry_snapshot() {
        let user = sample_user();
        let claims = Claims::access(&user, 900, "test".to_string());

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.username.as_deref(), Some("alice"));
        assert_eq!(claims.role, Some(Role::Member));
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn refresh_claims_omit_snapshot() {
        let user_id = Uuid::new_v4();
        let claims = Claims::refresh(user_id, 604800, "test".to_string());

        assert_eq!(claims.kind, TokenKind::Refresh);
        assert!(claims.username.is_none());
        assert!(claims.role.is_none());
    }

    #[test]
    fn user_id_extraction() {
        let user_id = Uuid::new_v4();
        let claims = Claims::refresh(user_id, 60, "test".to_string());
        assert_eq!(claims.user_id().unwrap(), user_id);
    }

    #[test]
    fn invalid_subject_is_an_auth_error() {
        let mut claims = Claims::refresh(Uuid::new_v4(), 60, "test".to_string());
        claims.sub = "not-a-uuid".to_string();
        assert!(claims.user_id().is_err());
    }

    #[test]
    fn token_ids_are_distinct() {
        assert_ne!(token_id(), token_id());
        assert_eq!(token_id().len(), 32);
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TokenKind::Refresh).unwrap(),
            r#""refresh""#
        );
    }
}
