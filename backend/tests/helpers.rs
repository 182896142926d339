// backend/tests/helpers.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use quiz_backend::{
    config::{AdminConfig, AppConfig, AuthConfig, DatabaseConfig, JwtConfig, QuizConfig, WebConfig},
    db::MIGRATOR,
    web_server::AppState,
};
use quiz_common::{Credentials, QuestionDto, QuestionPayload, TokenResponse};
use reqwest::StatusCode;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use tokio::net::TcpListener;

pub const TEST_JWT_SECRET: &str = "test-secret";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const PASSWORD: &str = "password123";

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
});

pub fn test_config(port: u16) -> AppConfig {
    AppConfig {
        web: WebConfig {
            addr: "127.0.0.1".to_string(),
            port,
            cors_origin: "http://localhost:5173".to_string(),
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expires_minutes: 15,
        },
        // Lowest cost bcrypt accepts; keeps the suite fast
        auth: AuthConfig { bcrypt_cost: 4 },
        admin: AdminConfig {
            emails: vec![ADMIN_EMAIL.to_string()],
        },
        quiz: QuizConfig {
            questions_per_quiz: 2,
        },
    }
}

/// In-memory database with the schema applied. A single connection keeps
/// every query on the same in-memory database.
pub async fn test_pool() -> SqlitePool {
    // Create connection options that enforce foreign keys
    let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);

    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options)
        .await
        .expect("Failed to create in-memory database pool.");

    MIGRATOR
        .run(&db_pool)
        .await
        .expect("Failed to run migrations on test database.");

    db_pool
}

/// Spawn a test server and return the address, a reqwest client and the pool behind it.
pub async fn spawn_app() -> (SocketAddr, reqwest::Client, SqlitePool) {
    Lazy::force(&TRACING);

    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let db_pool = test_pool().await;

    let app_state = AppState {
        db_pool: db_pool.clone(),
        app_config: test_config(addr.port()),
    };

    let app = quiz_backend::web_server::create_router(app_state);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    (addr, client, db_pool)
}

pub async fn register(
    addr: &SocketAddr,
    client: &reqwest::Client,
    email: &str,
    password: &str,
) -> reqwest::Response {
    client
        .post(format!("http://{addr}/register"))
        .json(&Credentials {
            email: email.to_string(),
            password: password.to_string(),
        })
        .send()
        .await
        .expect("Failed to execute register request")
}

pub async fn login(
    addr: &SocketAddr,
    client: &reqwest::Client,
    email: &str,
    password: &str,
) -> reqwest::Response {
    client
        .post(format!("http://{addr}/login"))
        .form(&[("username", email), ("password", password)])
        .send()
        .await
        .expect("Failed to execute login request")
}

/// Registers `email` and returns a bearer token for it.
pub async fn get_auth_token(addr: &SocketAddr, client: &reqwest::Client, email: &str) -> String {
    let res = register(addr, client, email, PASSWORD).await;
    assert_eq!(res.status(), StatusCode::OK, "Registration failed");

    let response = login(addr, client, email, PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK, "Login failed");

    let tokens: TokenResponse = response
        .json()
        .await
        .expect("Failed to parse login response");
    assert_eq!(tokens.token_type, "bearer");
    tokens.access_token
}

pub async fn admin_token(addr: &SocketAddr, client: &reqwest::Client) -> String {
    get_auth_token(addr, client, ADMIN_EMAIL).await
}

pub fn payload(text: &str, options: &[&str], correct_answer: &str) -> QuestionPayload {
    QuestionPayload {
        text: text.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        correct_answer: correct_answer.to_string(),
    }
}

pub async fn create_question(
    addr: &SocketAddr,
    client: &reqwest::Client,
    token: &str,
    payload: &QuestionPayload,
) -> QuestionDto {
    let response = client
        .post(format!("http://{addr}/questions"))
        .bearer_auth(token)
        .json(payload)
        .send()
        .await
        .expect("Failed to execute create question request");
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.expect("Failed to parse question")
}
