// --- File: backend/src/web_server.rs ---

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::{api_doc::ApiDoc, auth, config::AppConfig, db::DbPool, questions, quiz};

const X_REQUEST_ID: &str = "x-request-id";

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub app_config: AppConfig,
}

pub async fn run_server(app_state: AppState) -> anyhow::Result<()> {
    let addr = format!(
        "{}:{}",
        app_state.app_config.web.addr, app_state.app_config.web.port
    );
    let app = create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Serving quiz API at http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([HeaderName::from_static(X_REQUEST_ID)]);

    match origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            tracing::warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
            cors
        }
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn create_router(app_state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/api-docs/openapi.json", get(openapi_json));

    // Everything below needs a bearer token; admin checks happen in the handlers.
    let protected_routes = Router::new()
        .route(
            "/questions",
            get(questions::list_questions).post(questions::create_question),
        )
        .route(
            "/questions/{id}",
            get(questions::get_question)
                .put(questions::update_question)
                .delete(questions::delete_question),
        )
        .route("/quiz", get(quiz::get_quiz))
        .route("/quiz/result", post(quiz::submit_quiz_result))
        .route("/quiz/attempts", get(quiz::list_user_attempts))
        .route("/quiz/attempts/all", get(quiz::list_all_attempts))
        .route("/quiz/attempts/{id}", get(quiz::get_attempt_details))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth::auth_middleware,
        ));

    let cors = cors_layer(&app_state.app_config.web.cors_origin);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        // Layers run bottom-up: the request id is set before tracing sees the request,
        // and CORS preflights answered by `cors` still get the id propagated.
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(app_state) // Provide state to all nested routes
}
