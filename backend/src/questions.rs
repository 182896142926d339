use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use quiz_common::{MessageResponse, QuestionDto, QuestionPayload};
use validator::Validate;

use crate::{
    db::DbPool,
    error::{AppError, AppResult},
    extractors::{AdminUser, AppJson, AppPath},
    web_server::AppState,
};

/// Row of the `questions` table. `options` is the JSON-encoded list.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct QuestionRow {
    pub id: i64,
    pub text: String,
    pub options: String,
    pub correct_answer: String,
}

impl TryFrom<QuestionRow> for QuestionDto {
    type Error = AppError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        Ok(QuestionDto {
            id: row.id,
            text: row.text,
            options: serde_json::from_str(&row.options)?,
            correct_answer: row.correct_answer,
        })
    }
}

fn check_payload(payload: &QuestionPayload) -> AppResult<()> {
    payload.validate()?;
    if !payload.answer_is_listed() {
        return Err(AppError::BadRequest(
            "correct_answer must be one of the options".to_string(),
        ));
    }
    Ok(())
}

fn question_not_found() -> AppError {
    AppError::NotFound("Question not found".to_string())
}

pub async fn fetch_all_questions(db_pool: &DbPool) -> AppResult<Vec<QuestionDto>> {
    sqlx::query_as::<_, QuestionRow>(
        "SELECT id, text, options, correct_answer FROM questions ORDER BY id",
    )
    .fetch_all(db_pool)
    .await?
    .into_iter()
    .map(QuestionDto::try_from)
    .collect()
}

async fn fetch_question(db_pool: &DbPool, id: i64) -> AppResult<Option<QuestionDto>> {
    sqlx::query_as::<_, QuestionRow>(
        "SELECT id, text, options, correct_answer FROM questions WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db_pool)
    .await?
    .map(QuestionDto::try_from)
    .transpose()
}

// --- API Handlers ---

#[utoipa::path(
    post,
    path = "/questions",
    tag = "questions",
    request_body = QuestionPayload,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Question created", body = QuestionDto),
        (status = 400, description = "Invalid question"),
        (status = 403, description = "Admins only"),
    )
)]
pub async fn create_question(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppJson(payload): AppJson<QuestionPayload>,
) -> AppResult<(StatusCode, Json<QuestionDto>)> {
    check_payload(&payload)?;
    tracing::info!("{} creating question: {:?}", admin.email, payload.text);

    let options = serde_json::to_string(&payload.options)?;
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO questions (text, options, correct_answer) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&payload.text)
    .bind(&options)
    .bind(&payload.correct_answer)
    .fetch_one(&state.db_pool)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(QuestionDto {
            id,
            text: payload.text,
            options: payload.options,
            correct_answer: payload.correct_answer,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/questions",
    tag = "questions",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All questions", body = [QuestionDto]),
        (status = 403, description = "Admins only"),
    )
)]
pub async fn list_questions(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<QuestionDto>>> {
    Ok(Json(fetch_all_questions(&state.db_pool).await?))
}

#[utoipa::path(
    get,
    path = "/questions/{id}",
    tag = "questions",
    params(("id" = i64, Path, description = "Question id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The question", body = QuestionDto),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Question not found"),
    )
)]
pub async fn get_question(
    State(state): State<AppState>,
    _admin: AdminUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<QuestionDto>> {
    fetch_question(&state.db_pool, id)
        .await?
        .map(Json)
        .ok_or_else(question_not_found)
}

#[utoipa::path(
    put,
    path = "/questions/{id}",
    tag = "questions",
    params(("id" = i64, Path, description = "Question id")),
    request_body = QuestionPayload,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Question updated", body = QuestionDto),
        (status = 400, description = "Invalid question"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Question not found"),
    )
)]
pub async fn update_question(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<QuestionPayload>,
) -> AppResult<Json<QuestionDto>> {
    check_payload(&payload)?;
    tracing::info!("{} updating question {}", admin.email, id);

    let options = serde_json::to_string(&payload.options)?;
    let result = sqlx::query(
        "UPDATE questions SET text = $1, options = $2, correct_answer = $3 WHERE id = $4",
    )
    .bind(&payload.text)
    .bind(&options)
    .bind(&payload.correct_answer)
    .bind(id)
    .execute(&state.db_pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(question_not_found());
    }

    Ok(Json(QuestionDto {
        id,
        text: payload.text,
        options: payload.options,
        correct_answer: payload.correct_answer,
    }))
}

#[utoipa::path(
    delete,
    path = "/questions/{id}",
    tag = "questions",
    params(("id" = i64, Path, description = "Question id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Question deleted", body = MessageResponse),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Question not found"),
    )
)]
pub async fn delete_question(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<MessageResponse>> {
    tracing::info!("{} deleting question {}", admin.email, id);

    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(question_not_found());
    }

    Ok(Json(MessageResponse {
        message: format!("Question {id} deleted successfully"),
    }))
}
