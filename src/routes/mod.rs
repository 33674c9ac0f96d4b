mod auth;
mod health_check;

pub use auth::{login, logout, logout_all, me, refresh, register};
pub use health_check::health_check;
