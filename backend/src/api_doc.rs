use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::{auth, questions, quiz};
use quiz_common::{
    AdminAttemptSummary, AttemptAnswerDto, AttemptDetail, AttemptSummary, Credentials, LoginForm,
    MessageResponse, QuestionDto, QuestionPayload, QuizQuestion, QuizResultResponse,
    SubmitQuizRequest, TokenResponse,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        questions::create_question,
        questions::list_questions,
        questions::get_question,
        questions::update_question,
        questions::delete_question,
        quiz::get_quiz,
        quiz::submit_quiz_result,
        quiz::list_user_attempts,
        quiz::get_attempt_details,
        quiz::list_all_attempts,
    ),
    components(schemas(
        Credentials,
        LoginForm,
        TokenResponse,
        MessageResponse,
        QuestionPayload,
        QuestionDto,
        QuizQuestion,
        SubmitQuizRequest,
        QuizResultResponse,
        AttemptSummary,
        AttemptAnswerDto,
        AttemptDetail,
        AdminAttemptSummary,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "questions", description = "Question management (admin only)"),
        (name = "quiz", description = "Taking quizzes and reviewing attempts"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
