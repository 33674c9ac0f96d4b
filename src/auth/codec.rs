/// Token codec: signing and verification of access and refresh tokens.
///
/// The codec is constructed once at startup from `JwtSettings` and shared
/// read-only for the life of the process. It is stateless and safe to call
/// from any number of concurrent requests.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};
use crate::users::User;

#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

impl TokenCodec {
    pub fn new(settings: &JwtSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            issuer: settings.issuer.clone(),
            access_token_expiry: settings.access_token_expiry,
            refresh_token_expiry: settings.refresh_token_expiry,
        }
    }

    pub fn access_token_expiry(&self) -> i64 {
        self.access_token_expiry
    }

    pub fn refresh_token_expiry(&self) -> i64 {
        self.refresh_token_expiry
    }

    /// Sign an access token carrying the user's username/role snapshot.
    pub fn issue_access(&self, user: &User) -> Result<String, AppError> {
        let claims = Claims::access(user, self.access_token_expiry, self.issuer.clone());
        self.sign(&claims)
    }

    /// Sign a refresh token carrying the subject and kind marker only.
    pub fn issue_refresh(&self, user_id: Uuid) -> Result<String, AppError> {
        let claims = Claims::refresh(user_id, self.refresh_token_expiry, self.issuer.clone());
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Validate a token and extract its claims.
    ///
    /// Enforces signature, expiry, and issuer. Every decode failure —
    /// expired, malformed, tampered — collapses to the uniform
    /// authentication error; the concrete reason is only logged.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!("token verification failed: {}", e);
                AppError::Auth(AuthError::InvalidToken)
            })
    }
}
