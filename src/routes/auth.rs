/// Authentication routes
///
/// Registration, login, token refresh, logout, and current-user lookup.
///
/// The access token travels in the response body for the Authorization
/// header; the refresh token is additionally set as an HTTP-only cookie
/// scoped to /auth so application script never needs to touch it. The
/// refresh and logout endpoints accept the token from either channel.

use actix_web::{cookie::Cookie, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{Principal, Registration, SessionManager, SessionTokens};
use crate::error::{AppError, AuthError};
use crate::users::{find_user_by_id, Role, User};

const REFRESH_COOKIE: &str = "refresh_token";

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub student_number: String,
    pub password: String,
    pub device: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub device: Option<String>,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

/// Authentication response with access and refresh tokens
#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub student_number: String,
    pub role: Role,
    pub created_at: String,
}

impl UserResponse {
    fn from_user(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            student_number: user.student_number.clone(),
            role: user.role,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

fn refresh_cookie(token: &str) -> Cookie<'static> {
    Cookie::build(REFRESH_COOKIE, token.to_string())
        .http_only(true)
        .path("/auth")
        .finish()
}

fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(REFRESH_COOKIE, "")
        .http_only(true)
        .path("/auth")
        .finish();
    cookie.make_removal();
    cookie
}

fn session_response(
    status: actix_web::http::StatusCode,
    tokens: SessionTokens,
    expires_in: i64,
) -> HttpResponse {
    let cookie = refresh_cookie(&tokens.refresh_token);
    HttpResponse::build(status).cookie(cookie).json(AuthResponse {
        user: UserResponse::from_user(&tokens.user),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in,
    })
}

/// Pull the refresh token from the request body, falling back to the
/// HTTP-only cookie.
fn presented_refresh_token(req: &HttpRequest, body_token: Option<String>) -> Option<String> {
    body_token
        .filter(|t| !t.trim().is_empty())
        .or_else(|| req.cookie(REFRESH_COOKIE).map(|c| c.value().to_string()))
        .filter(|t| !t.trim().is_empty())
}

/// POST /auth/register
///
/// Register a new member with username, email, student number, and
/// password; opens the account's first session.
///
/// # Errors
/// - 400: Validation errors (invalid username/email/student number/password)
/// - 409: username, email, or student number already in use (field named)
/// - 500: Internal server error
pub async fn register(
    form: web::Json<RegisterRequest>,
    manager: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let tokens = manager
        .register(Registration {
            username: form.username,
            email: form.email,
            student_number: form.student_number,
            password: form.password,
            device: form.device,
        })
        .await?;

    Ok(session_response(
        actix_web::http::StatusCode::CREATED,
        tokens,
        manager.codec().access_token_expiry(),
    ))
}

/// POST /auth/login
///
/// Authenticate with username and password.
///
/// # Security Notes
/// - Same error body for "unknown username" and "wrong password"
/// - Prevents user enumeration attacks
pub async fn login(
    form: web::Json<LoginRequest>,
    manager: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let tokens = manager
        .login(&form.username, &form.password, form.device.as_deref())
        .await?;

    Ok(session_response(
        actix_web::http::StatusCode::OK,
        tokens,
        manager.codec().access_token_expiry(),
    ))
}

/// POST /auth/refresh
///
/// Exchange a refresh token for a new access/refresh pair.
///
/// Token rotation: the presented token becomes permanently unusable the
/// instant it is redeemed. Presenting an already-rotated token revokes
/// every session of the affected user.
///
/// # Errors
/// - 401: invalid, expired, rotated, or wrong-kind token (uniform body)
pub async fn refresh(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    manager: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let presented = presented_refresh_token(&req, body.and_then(|b| b.into_inner().refresh_token))
        .ok_or(AppError::Auth(AuthError::MissingToken))?;

    let tokens = manager.refresh(&presented).await?;

    Ok(session_response(
        actix_web::http::StatusCode::OK,
        tokens,
        manager.codec().access_token_expiry(),
    ))
}

/// POST /auth/logout
///
/// With a refresh token (body or cookie): close only that session.
/// Without one: close every session for the caller.
/// Idempotent — an unknown or already-removed token is still a success.
pub async fn logout(
    req: HttpRequest,
    principal: web::ReqData<Principal>,
    body: Option<web::Json<LogoutRequest>>,
    manager: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let presented = presented_refresh_token(&req, body.and_then(|b| b.into_inner().refresh_token));

    manager
        .logout(principal.user_id, presented.as_deref())
        .await?;

    Ok(HttpResponse::Ok()
        .cookie(removal_cookie())
        .json(serde_json::json!({ "status": "logged_out" })))
}

/// POST /auth/logout_all
///
/// Sign out everywhere: closes every session for the caller.
pub async fn logout_all(
    principal: web::ReqData<Principal>,
    manager: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    manager.logout_all(principal.user_id).await?;

    Ok(HttpResponse::Ok()
        .cookie(removal_cookie())
        .json(serde_json::json!({ "status": "logged_out" })))
}

#[derive(Serialize)]
pub struct MeResponse {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub email: String,
    pub student_number: String,
    pub created_at: String,
}

/// GET /auth/me
///
/// Current authenticated member. Username and role come from the access
/// token snapshot (account changes apply on next login/refresh); profile
/// fields come from the account row.
pub async fn me(
    principal: web::ReqData<Principal>,
    manager: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let user = find_user_by_id(manager.pool(), principal.user_id)
        .await?
        .ok_or(AppError::Auth(AuthError::UnknownUser))?;

    Ok(HttpResponse::Ok().json(MeResponse {
        id: principal.user_id.to_string(),
        username: principal.username.clone(),
        role: principal.role,
        email: user.email,
        student_number: user.student_number,
        created_at: user.created_at.to_rfc3339(),
    }))
}
