/// Credential store: persisted member accounts.
///
/// The password hash is excluded from the default projection; only the
/// login lookup selects it. Every query filters soft-deleted rows, so a
/// soft-deleted account fails closed across the whole subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{AppError, ConflictError};

/// Member role recorded on the account and snapshotted into access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Guest,
    Member,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "GUEST",
            Role::Member => "MEMBER",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GUEST" => Ok(Role::Guest),
            "MEMBER" => Ok(Role::Member),
            "ADMIN" => Ok(Role::Admin),
            other => Err(AppError::Internal(format!(
                "unknown role in users table: {}",
                other
            ))),
        }
    }
}

/// Sanitized user projection. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub student_number: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    student_number: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User, AppError> {
        Ok(User {
            id: self.id,
            username: self.username,
            email: self.email,
            student_number: self.student_number,
            role: self.role.parse()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// A new account ready for insertion (password already hashed).
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub student_number: String,
    pub password_hash: String,
}

/// Insert a new member account.
///
/// Uniqueness of username, email, and student number is delegated to the
/// named unique constraints; under racing registrations exactly one insert
/// wins and the loser surfaces as a `ConflictError` naming the field.
pub async fn insert_user(pool: &PgPool, new_user: NewUser) -> Result<User, AppError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO users (id, username, email, student_number, password_hash, role, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(id)
    .bind(&new_user.username)
    .bind(&new_user.email)
    .bind(&new_user.student_number)
    .bind(&new_user.password_hash)
    .bind(Role::Guest.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(map_unique_violation)?;

    Ok(User {
        id,
        username: new_user.username,
        email: new_user.email,
        student_number: new_user.student_number,
        role: Role::Guest,
        created_at: now,
        updated_at: now,
    })
}

fn map_unique_violation(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        match db.constraint() {
            Some("users_username_key") => return AppError::Conflict(ConflictError::Username),
            Some("users_email_key") => return AppError::Conflict(ConflictError::Email),
            Some("users_student_number_key") => {
                return AppError::Conflict(ConflictError::StudentNumber)
            }
            _ => {}
        }
    }
    AppError::from(err)
}

/// Look up login credentials by username.
///
/// This is the only query in the subsystem that selects the password hash.
pub async fn find_credentials_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<(User, String)>, AppError> {
    #[derive(sqlx::FromRow)]
    struct CredentialsRow {
        id: Uuid,
        username: String,
        email: String,
        student_number: String,
        role: String,
        password_hash: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    }

    let row = sqlx::query_as::<_, CredentialsRow>(
        r#"
        SELECT id, username, email, student_number, role, password_hash, created_at, updated_at
        FROM users
        WHERE username = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    match row {
        None => Ok(None),
        Some(row) => {
            let password_hash = row.password_hash.clone();
            let user = UserRow {
                id: row.id,
                username: row.username,
                email: row.email,
                student_number: row.student_number,
                role: row.role,
                created_at: row.created_at,
                updated_at: row.updated_at,
            }
            .into_user()?;
            Ok(Some((user, password_hash)))
        }
    }
}

/// Sanitized lookup by id. Soft-deleted accounts resolve to `None`.
pub async fn find_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, AppError> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, username, email, student_number, role, created_at, updated_at
        FROM users
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(UserRow::into_user).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Guest, Role::Member, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!("SUPERUSER".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Role::Member).unwrap(), r#""MEMBER""#);
    }
}
