use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

pub mod utils;

// --- Auth ---

#[derive(Serialize, Deserialize, Clone, Debug, Validate, ToSchema)]
pub struct Credentials {
    #[validate(email(message = "Must be a valid email address"))]
    pub email: String,
    #[validate(
        length(min = 4, message = "Password must be at least 4 characters."),
        custom(function = validate_password_bytes)
    )]
    pub password: String,
}

/// bcrypt only reads the first 72 bytes of its input.
pub const MAX_PASSWORD_BYTES: usize = 72;

fn validate_password_bytes(password: &str) -> Result<(), ValidationError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::new("password_too_long")
            .with_message("Password must be at most 72 bytes.".into()));
    }
    Ok(())
}

/// OAuth2 password-flow form. `username` carries the email address.
#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

// --- Questions ---

/// Body of question create and update requests.
#[derive(Serialize, Deserialize, Clone, Debug, Validate, ToSchema)]
pub struct QuestionPayload {
    #[validate(length(min = 1, max = 1000, message = "Question text must be 1-1000 characters."))]
    pub text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(min = 1, max = 500))]
    pub correct_answer: String,
}

impl QuestionPayload {
    /// True when `correct_answer` names one of the listed options.
    pub fn answer_is_listed(&self) -> bool {
        self.options.iter().any(|o| o == &self.correct_answer)
    }
}

fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    if options.len() < 2 {
        return Err(ValidationError::new("options_need_at_least_two")
            .with_message("A question needs at least two options.".into()));
    }
    let mut seen = HashSet::new();
    for opt in options {
        if opt.trim().is_empty() {
            return Err(ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(ValidationError::new("option_too_long"));
        }
        if !seen.insert(opt.as_str()) {
            return Err(ValidationError::new("duplicate_option")
                .with_message("Options must be distinct.".into()));
        }
    }
    Ok(())
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct QuestionDto {
    pub id: i64,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

/// A question as handed out in a quiz: the answer is withheld.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct QuizQuestion {
    pub id: i64,
    pub text: String,
    pub options: Vec<String>,
}

impl From<QuestionDto> for QuizQuestion {
    fn from(q: QuestionDto) -> Self {
        QuizQuestion {
            id: q.id,
            text: q.text,
            options: q.options,
        }
    }
}

// --- Quiz submissions & attempts ---

#[derive(Serialize, Deserialize, Clone, Debug, Default, ToSchema)]
pub struct SubmitQuizRequest {
    /// Question id to the selected option. JSON keys are the ids as strings.
    pub answers: BTreeMap<i64, String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct QuizResultResponse {
    pub attempt_id: i64,
    pub score: i64,
    pub total_questions: i64,
    pub correct_answers: BTreeMap<i64, String>,
}

#[derive(FromRow, Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct AttemptSummary {
    pub attempt_id: i64,
    pub score: i64,
    pub total_questions: i64,
    pub attempted_at: DateTime<Utc>,
}

#[derive(FromRow, Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct AttemptAnswerDto {
    pub question_id: i64,
    /// `None` once the question has been deleted.
    pub question_text: Option<String>,
    pub selected_option: String,
    pub correct_option: Option<String>,
    pub is_correct: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct AttemptDetail {
    pub attempt_id: i64,
    pub score: i64,
    pub total_questions: i64,
    pub attempted_at: DateTime<Utc>,
    pub answers: Vec<AttemptAnswerDto>,
}

#[derive(FromRow, Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct AdminAttemptSummary {
    pub attempt_id: i64,
    pub user_id: i64,
    pub user_email: String,
    pub score: i64,
    pub total_questions: i64,
    pub attempted_at: DateTime<Utc>,
}
