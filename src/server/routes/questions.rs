use axum::{
    extract::State,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::deserialize_string_from_number;
use sqlx::SqlitePool;

use crate::{
    db::{
        queries::{categories::get_all_categories, questions},
        Question,
    },
    server::{
        app::AppState,
        deserializers::IntLike,
        error::ApiError,
        extract::{JsonBody, PathParam, QueryParams},
    },
    telemetry::{QUESTIONS_CREATED, QUESTIONS_DELETED},
};

use super::{category_map, paginate, ApiResponse, CategoryMap, PageQuery};

#[derive(Deserialize)]
struct NewQuestion {
    #[serde(deserialize_with = "deserialize_string_from_number")]
    question: String,
    #[serde(deserialize_with = "deserialize_string_from_number")]
    answer: String,
    category: IntLike,
    difficulty: IntLike,
}

#[derive(Deserialize)]
struct SearchBody {
    #[serde(rename = "searchTerm")]
    search_term: Option<String>,
}

#[derive(Serialize)]
struct QuestionsPage {
    success: bool,
    questions: Vec<Question>,
    total_questions: usize,
    categories: CategoryMap,
}

#[derive(Serialize)]
struct Created {
    success: bool,
    question_id: i64,
}

#[derive(Serialize)]
struct Deleted {
    success: bool,
    deleted: i64,
}

/// Shapes one page of `selection`; an empty page is a 404.
async fn questions_page(
    pool: &SqlitePool,
    selection: Vec<Question>,
    page: i64,
) -> ApiResponse<Json<QuestionsPage>> {
    let current = paginate(&selection, page);
    if current.is_empty() {
        return Err(ApiError::NotFound);
    }
    let categories = get_all_categories(pool).await.map_err(ApiError::internal)?;
    Ok(Json(QuestionsPage {
        success: true,
        questions: current.to_vec(),
        total_questions: selection.len(),
        categories: category_map(categories),
    }))
}

async fn get_questions(
    State(pool): State<SqlitePool>,
    QueryParams(query): QueryParams<PageQuery>,
) -> ApiResponse<Json<QuestionsPage>> {
    let selection = questions::get_all_questions(&pool)
        .await
        .map_err(ApiError::internal)?;
    questions_page(&pool, selection, query.page()).await
}

async fn search_questions(
    State(pool): State<SqlitePool>,
    QueryParams(query): QueryParams<PageQuery>,
    JsonBody(body): JsonBody<SearchBody>,
) -> ApiResponse<Json<QuestionsPage>> {
    let term = body.search_term.ok_or(ApiError::UnprocessableEntity)?;
    let selection = questions::search_questions(&pool, &term)
        .await
        .map_err(ApiError::internal)?;
    tracing::debug!("Search for {term:?} matched {} questions", selection.len());
    questions_page(&pool, selection, query.page()).await
}

async fn create_question(
    State(pool): State<SqlitePool>,
    JsonBody(new_question): JsonBody<NewQuestion>,
) -> ApiResponse<Json<Created>> {
    let id = questions::create_question(
        &pool,
        &new_question.question,
        &new_question.answer,
        new_question.category.into(),
        new_question.difficulty.into(),
    )
    .await
    .map_err(ApiError::unprocessable)?;
    QUESTIONS_CREATED.inc();
    tracing::info!("Created question {id}");

    Ok(Json(Created {
        success: true,
        question_id: id,
    }))
}

async fn delete_question(
    State(pool): State<SqlitePool>,
    PathParam(id): PathParam<i64>,
) -> ApiResponse<Json<Deleted>> {
    if !questions::delete_question(&pool, id)
        .await
        .map_err(ApiError::not_found)?
    {
        return Err(ApiError::NotFound);
    }
    QUESTIONS_DELETED.inc();
    tracing::info!("Deleted question {id}");

    Ok(Json(Deleted {
        success: true,
        deleted: id,
    }))
}

pub fn questions_router(state: AppState) -> Router {
    Router::new()
        .route("/questions", get(get_questions).post(create_question))
        .route("/questions/search", post(search_questions))
        .route("/questions/{id}", delete(delete_question))
        .with_state(state)
}
