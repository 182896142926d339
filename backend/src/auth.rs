use axum::{extract::State, Json};
use bcrypt::{hash, verify};
use quiz_common::{
    utils::normalize_email, Credentials, LoginForm, MessageResponse, TokenResponse,
    MAX_PASSWORD_BYTES,
};
use serde::{Deserialize, Serialize};

use chrono::{Duration, Utc}; // Use chrono for time
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use axum::{extract::Request, middleware::Next, response::Response};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    typed_header::TypedHeaderRejection,
    TypedHeader,
};

use crate::config::JwtConfig;
use crate::error::{AppError, AppResult};
use crate::extractors::{AppForm, AppJson, AuthUser};
use crate::web_server::AppState;
use validator::Validate;

// --- User & Payload Structs ---

#[derive(sqlx::FromRow, Debug)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user email)
    pub exp: usize,  // Expiration time
}

// --- Token Helpers ---

/// Signs an access token for `email`, valid for the configured number of minutes.
pub fn issue_token(email: &str, jwt_config: &JwtConfig) -> AppResult<String> {
    let exp = (Utc::now() + Duration::minutes(jwt_config.access_token_expires_minutes))
        .timestamp() as usize;
    let claims = Claims {
        sub: email.to_owned(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_ref()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Failed to create JWT: {e}")))
}

/// Checks signature and expiry (no leeway) and returns the claims.
pub fn decode_token(token: &str, jwt_config: &JwtConfig) -> AppResult<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_ref()),
        &validation,
    )?;
    Ok(token_data.claims)
}

async fn find_user_by_email(state: &AppState, email: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, password_hash, is_admin FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(&state.db_pool)
    .await?;
    Ok(user)
}

// --- API Handlers ---

/// ## Register a new user
/// Takes email and password, hashes the password, and stores the user in the database.
/// Addresses listed under `admin.emails` are created with the admin flag.
#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    request_body = Credentials,
    responses(
        (status = 200, description = "User created successfully", body = MessageResponse),
        (status = 400, description = "Invalid data or email already registered"),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<Credentials>,
) -> AppResult<Json<MessageResponse>> {
    // Validate the incoming payload
    payload.validate()?;

    let email = normalize_email(&payload.email);
    tracing::info!("Registering user with email: {}", &email);

    if find_user_by_email(&state, &email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = hash(&payload.password, state.app_config.auth.bcrypt_cost).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        AppError::InternalServerError("Password hashing error".to_string())
    })?;

    let is_admin = state.app_config.admin.is_admin_email(&email);

    sqlx::query("INSERT INTO users (email, password_hash, is_admin) VALUES ($1, $2, $3)")
        .bind(&email)
        .bind(&password_hash)
        .bind(is_admin)
        .execute(&state.db_pool)
        .await
        .map_err(|e| match &e {
            // Lost a race with a concurrent registration of the same address
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("Email already registered".to_string())
            }
            _ => AppError::from(e),
        })?;

    if is_admin {
        tracing::info!("Granted admin role to {}", &email);
    }

    Ok(Json(MessageResponse {
        message: "User registered".to_string(),
    }))
}

/// ## Login an existing user
/// OAuth2 password-flow form (`username` is the email). Returns a bearer JWT.
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    AppForm(form): AppForm<LoginForm>,
) -> AppResult<Json<TokenResponse>> {
    let email = normalize_email(&form.username);
    tracing::info!("Logging in user with email: {}", &email);

    let user = find_user_by_email(&state, &email).await?.ok_or_else(|| {
        tracing::warn!("Login attempt for unknown email {}", &email);
        AppError::Unauthorized
    })?;

    // bcrypt ignores everything past the limit, so a longer password cannot match
    if form.password.len() > MAX_PASSWORD_BYTES || !verify(&form.password, &user.password_hash)? {
        tracing::warn!("Wrong password for {}", &email);
        return Err(AppError::Unauthorized);
    }

    let access_token = issue_token(&user.email, &state.app_config.jwt)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

// --- Middleware for JWT Authentication ---

pub async fn auth_middleware(
    State(state): State<AppState>,
    auth_header: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = auth_header.map_err(|_| AppError::Unauthorized)?;

    let claims = decode_token(bearer.token(), &state.app_config.jwt)?;

    // Fetch the user from the database ONCE in the middleware
    let user = find_user_by_email(&state, &claims.sub)
        .await?
        .ok_or(AppError::Unauthorized)?; // User not found, token is for a deleted user

    // Add the authenticated user data to the request extensions
    request.extensions_mut().insert(AuthUser {
        id: user.id,
        email: user.email,
        is_admin: user.is_admin,
    });

    Ok(next.run(request).await)
}
