use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;

use crate::auth::{SessionManager, TokenCodec};
use crate::configuration::{JwtSettings, PasswordSettings};
use crate::logger::LoggerMiddleware;
use crate::middleware::AccessGuard;
use crate::routes::{health_check, login, logout, logout_all, me, refresh, register};

pub fn run(
    listener: TcpListener,
    connection: PgPool,
    jwt_config: JwtSettings,
    password_config: PasswordSettings,
) -> Result<Server, std::io::Error> {
    let codec = TokenCodec::new(&jwt_config);
    let manager = SessionManager::new(connection, codec, password_config.hash_cost);
    let manager_data = web::Data::new(manager.clone());

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())      // Standard logging
            .wrap(LoggerMiddleware)       // Custom logging

            // Shared state
            .app_data(manager_data.clone())

            // Public routes (no authentication required)
            .route("/health_check", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))

            // Protected routes (require a live session)
            .service(
                web::scope("/auth")
                    .wrap(AccessGuard::new(manager.clone()))
                    .route("/me", web::get().to(me))
                    .route("/logout", web::post().to(logout))
                    .route("/logout_all", web::post().to(logout_all)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
