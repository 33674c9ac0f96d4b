//! Liveness endpoint integration test

use campushub::configuration::get_configuration;
use campushub::startup::run;
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;

#[tokio::test]
async fn health_check_works() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let configuration = get_configuration().expect("Failed to read configuration.");
    // The endpoint never touches the database; a lazy pool is enough.
    let pool = PgPoolOptions::new()
        .connect_lazy(&configuration.database.connection_string())
        .expect("Failed to create connection pool");

    let server = run(
        listener,
        pool,
        configuration.jwt.clone(),
        configuration.password.clone(),
    )
    .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    let response = reqwest::Client::new()
        .get(&format!("http://127.0.0.1:{}/health_check", port))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(Some(0), response.content_length());
}
