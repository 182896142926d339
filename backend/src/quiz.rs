use std::collections::{BTreeMap, HashMap};

use axum::{
    extract::State,
    Json,
};
use chrono::Utc;
use quiz_common::{
    AdminAttemptSummary, AttemptAnswerDto, AttemptDetail, AttemptSummary, QuestionDto,
    QuizQuestion, QuizResultResponse, SubmitQuizRequest,
};
use rand::seq::IndexedRandom;
use sqlx::QueryBuilder;

use crate::{
    db::{Db, DbPool},
    error::{AppError, AppResult},
    extractors::{AdminUser, AppJson, AppPath, AuthUser},
    questions::fetch_all_questions,
    web_server::AppState,
};

/// Upper bound on answers per submission; each one becomes a bound parameter.
pub const MAX_SUBMITTED_ANSWERS: usize = 500;

/// Helper struct for fetching answer keys from the database.
#[derive(sqlx::FromRow)]
struct AnswerKey {
    id: i64,
    correct_answer: String,
}

/// One submitted answer checked against its question.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedAnswer {
    pub question_id: i64,
    pub selected_option: String,
    pub correct_option: String,
    pub is_correct: bool,
}

/// Compares each submitted option with the stored answer, by exact string match.
/// Ids missing from `keys` are not questions and are dropped.
pub fn grade(answers: &BTreeMap<i64, String>, keys: &HashMap<i64, String>) -> Vec<GradedAnswer> {
    answers
        .iter()
        .filter_map(|(question_id, selected)| {
            keys.get(question_id).map(|correct| GradedAnswer {
                question_id: *question_id,
                selected_option: selected.clone(),
                correct_option: correct.clone(),
                is_correct: selected == correct,
            })
        })
        .collect()
}

/// Uniform sample without replacement; answers are stripped.
fn sample_questions(questions: &[QuestionDto], amount: usize) -> Vec<QuizQuestion> {
    let mut rng = rand::rng();
    questions
        .choose_multiple(&mut rng, amount)
        .cloned()
        .map(QuizQuestion::from)
        .collect()
}

async fn fetch_answer_keys(db_pool: &DbPool, ids: &[i64]) -> AppResult<HashMap<i64, String>> {
    // Use QueryBuilder for dynamic IN clause
    let mut query_builder =
        QueryBuilder::<Db>::new("SELECT id, correct_answer FROM questions WHERE id IN (");

    let mut separated = query_builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let keys = query_builder
        .build_query_as::<AnswerKey>()
        .fetch_all(db_pool)
        .await?;

    Ok(keys.into_iter().map(|k| (k.id, k.correct_answer)).collect())
}

// --- API Handlers ---

/// ## Draw a quiz
/// Random questions from the whole pool, without their answers.
#[utoipa::path(
    get,
    path = "/quiz",
    tag = "quiz",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Quiz questions", body = [QuizQuestion]),
        (status = 400, description = "Not enough questions available"),
        (status = 401, description = "Authentication required"),
    )
)]
pub async fn get_quiz(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<QuizQuestion>>> {
    let amount = state.app_config.quiz.questions_per_quiz;
    let questions = fetch_all_questions(&state.db_pool).await?;

    if questions.len() < amount {
        return Err(AppError::BadRequest(format!(
            "Not enough questions available: need {amount}, found {}",
            questions.len()
        )));
    }

    tracing::info!("Drawing {} questions for {}", amount, user.email);
    Ok(Json(sample_questions(&questions, amount)))
}

/// ## Submit quiz answers
/// Scores the answers and records the attempt, its answers and the legacy result row
/// in a single transaction.
#[utoipa::path(
    post,
    path = "/quiz/result",
    tag = "quiz",
    request_body = SubmitQuizRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Score and correct answers", body = QuizResultResponse),
        (status = 400, description = "No answers for existing questions, or too many answers"),
        (status = 401, description = "Authentication required"),
    )
)]
pub async fn submit_quiz_result(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(request): AppJson<SubmitQuizRequest>,
) -> AppResult<Json<QuizResultResponse>> {
    if request.answers.is_empty() {
        return Err(AppError::BadRequest("No answers submitted".to_string()));
    }
    if request.answers.len() > MAX_SUBMITTED_ANSWERS {
        return Err(AppError::BadRequest(format!(
            "Too many answers submitted: at most {MAX_SUBMITTED_ANSWERS} allowed"
        )));
    }

    let ids: Vec<i64> = request.answers.keys().copied().collect();
    let keys = fetch_answer_keys(&state.db_pool, &ids).await?;
    let graded = grade(&request.answers, &keys);

    if graded.is_empty() {
        return Err(AppError::BadRequest(
            "None of the submitted questions exist".to_string(),
        ));
    }

    let score = graded.iter().filter(|a| a.is_correct).count() as i64;
    let total_questions = graded.len() as i64;

    let mut tx = state.db_pool.begin().await?;

    let attempt_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO quiz_attempts (user_id, score, total_questions, attempted_at)
         VALUES ($1, 0, $2, $3) RETURNING id",
    )
    .bind(user.id)
    .bind(total_questions)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    for answer in &graded {
        sqlx::query(
            "INSERT INTO attempt_answers (attempt_id, question_id, selected_option, is_correct)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(attempt_id)
        .bind(answer.question_id)
        .bind(&answer.selected_option)
        .bind(answer.is_correct)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("UPDATE quiz_attempts SET score = $1 WHERE id = $2")
        .bind(score)
        .bind(attempt_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("INSERT INTO results (user_id, score) VALUES ($1, $2)")
        .bind(user.id)
        .bind(score)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        "{} scored {}/{} (attempt {})",
        user.email,
        score,
        total_questions,
        attempt_id
    );

    Ok(Json(QuizResultResponse {
        attempt_id,
        score,
        total_questions,
        correct_answers: graded
            .into_iter()
            .map(|a| (a.question_id, a.correct_option))
            .collect(),
    }))
}

/// ## List own attempts
#[utoipa::path(
    get,
    path = "/quiz/attempts",
    tag = "quiz",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The caller's attempts, newest first", body = [AttemptSummary]),
        (status = 401, description = "Authentication required"),
    )
)]
pub async fn list_user_attempts(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<AttemptSummary>>> {
    let attempts = sqlx::query_as::<_, AttemptSummary>(
        "SELECT id AS attempt_id, score, total_questions, attempted_at
         FROM quiz_attempts
         WHERE user_id = $1
         ORDER BY id DESC",
    )
    .bind(user.id)
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(attempts))
}

/// ## Attempt breakdown
/// Unknown ids and other users' attempts are both reported as not found.
#[utoipa::path(
    get,
    path = "/quiz/attempts/{id}",
    tag = "quiz",
    params(("id" = i64, Path, description = "Attempt id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Attempt with per-question answers", body = AttemptDetail),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Attempt not found"),
    )
)]
pub async fn get_attempt_details(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<AttemptDetail>> {
    let summary = sqlx::query_as::<_, AttemptSummary>(
        "SELECT id AS attempt_id, score, total_questions, attempted_at
         FROM quiz_attempts
         WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user.id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;

    let answers = sqlx::query_as::<_, AttemptAnswerDto>(
        "SELECT a.question_id, q.text AS question_text, a.selected_option,
                q.correct_answer AS correct_option, a.is_correct
         FROM attempt_answers a
         LEFT JOIN questions q ON q.id = a.question_id
         WHERE a.attempt_id = $1
         ORDER BY a.id",
    )
    .bind(summary.attempt_id)
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(AttemptDetail {
        attempt_id: summary.attempt_id,
        score: summary.score,
        total_questions: summary.total_questions,
        attempted_at: summary.attempted_at,
        answers,
    }))
}

/// ## All attempts (admin)
#[utoipa::path(
    get,
    path = "/quiz/attempts/all",
    tag = "quiz",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Every user's attempts, newest first", body = [AdminAttemptSummary]),
        (status = 403, description = "Admins only"),
    )
)]
pub async fn list_all_attempts(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<AdminAttemptSummary>>> {
    let attempts = sqlx::query_as::<_, AdminAttemptSummary>(
        "SELECT qa.id AS attempt_id, qa.user_id, u.email AS user_email,
                qa.score, qa.total_questions, qa.attempted_at
         FROM quiz_attempts qa
         JOIN users u ON u.id = qa.user_id
         ORDER BY qa.id DESC",
    )
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(attempts))
}
