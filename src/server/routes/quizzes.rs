use axum::{extract::State, routing::post, Json, Router};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{
    db::{queries::questions::get_quiz_candidates, Question},
    server::{app::AppState, deserializers::LenientId, error::ApiError, extract::JsonBody},
    telemetry::QUIZ_QUESTIONS_SERVED,
};

use super::ApiResponse;

// category id 0 stands for "every category"
const ALL_CATEGORIES: i64 = 0;

#[derive(Deserialize)]
struct QuizRequest {
    previous_questions: Option<Vec<LenientId>>,
    quiz_category: Option<QuizCategory>,
}

#[derive(Deserialize)]
struct QuizCategory {
    id: LenientId,
}

#[derive(Serialize)]
struct QuizQuestion {
    success: bool,
    question: Option<Question>,
}

async fn next_quiz_question(
    State(pool): State<SqlitePool>,
    JsonBody(request): JsonBody<QuizRequest>,
) -> ApiResponse<Json<QuizQuestion>> {
    let (Some(previous), Some(category)) = (request.previous_questions, request.quiz_category)
    else {
        return Err(ApiError::UnprocessableEntity);
    };
    let previous: Vec<i64> = previous.into_iter().map(i64::from).collect();
    let category = Some(i64::from(category.id)).filter(|id| *id != ALL_CATEGORIES);

    let candidates = get_quiz_candidates(&pool, category, &previous)
        .await
        .map_err(ApiError::internal)?;
    let question = candidates.choose(&mut rand::thread_rng()).cloned();

    if question.is_some() {
        let label = category.map_or_else(|| "all".to_owned(), |id| id.to_string());
        QUIZ_QUESTIONS_SERVED.with_label_values(&[label.as_str()]).inc();
    } else {
        tracing::debug!("Quiz exhausted after {} questions", previous.len());
    }

    Ok(Json(QuizQuestion {
        success: true,
        question,
    }))
}

pub fn quizzes_router(state: AppState) -> Router {
    Router::new()
        .route("/quizzes", post(next_quiz_question))
        .with_state(state)
}
