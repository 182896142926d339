use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use dotenvy::dotenv;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    pub addr: String,
    pub port: u16,
    pub cors_origin: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_minutes: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    /// bcrypt work factor (4..=31).
    pub bcrypt_cost: u32,
}

/// Addresses that are granted the admin flag when they register.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AdminConfig {
    pub emails: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct QuizConfig {
    pub questions_per_quiz: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub web: WebConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    pub quiz: QuizConfig,
}

impl AdminConfig {
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.emails
            .iter()
            .any(|e| quiz_common::utils::normalize_email(e) == email)
    }
}

/// Defaults for everything except the JWT secret, which must be supplied.
#[derive(Serialize)]
struct Defaults {
    web: WebConfig,
    database: DatabaseConfig,
    jwt: JwtDefaults,
    auth: AuthConfig,
    quiz: QuizConfig,
}

#[derive(Serialize)]
struct JwtDefaults {
    access_token_expires_minutes: i64,
}

impl Default for Defaults {
    fn default() -> Self {
        Defaults {
            web: WebConfig {
                addr: "127.0.0.1".to_string(),
                port: 8000,
                cors_origin: "http://localhost:5173".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://quiz.db?mode=rwc".to_string(),
                max_connections: 5,
            },
            jwt: JwtDefaults {
                access_token_expires_minutes: 30,
            },
            auth: AuthConfig {
                bcrypt_cost: bcrypt::DEFAULT_COST,
            },
            quiz: QuizConfig {
                questions_per_quiz: 2,
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, figment::Error> {
        dotenv().ok();

        let config: Self = Figment::from(Serialized::defaults(Defaults::default()))
            .merge(Toml::file("Config.toml")) // For non-sensitive defaults
            .merge(Env::prefixed("APP_").split("__")) // e.g., APP_DATABASE__URL
            .extract()?;

        tracing::info!(
            "Configuration loaded: listening on {}:{}, database {}",
            config.web.addr,
            config.web.port,
            config.database.url
        );

        Ok(config)
    }
}
