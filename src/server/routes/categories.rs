use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    db::{
        queries::{categories::get_all_categories, questions::get_questions_for_category},
        Question,
    },
    server::{
        app::AppState,
        error::ApiError,
        extract::{PathParam, QueryParams},
    },
};

use super::{category_map, paginate, ApiResponse, CategoryMap, PageQuery};

#[derive(Serialize)]
struct CategoriesBody {
    success: bool,
    total_categories: usize,
    categories: CategoryMap,
}

#[derive(Serialize)]
struct CategoryQuestionsBody {
    success: bool,
    questions: Vec<Question>,
    total_questions: usize,
    current_category: i64,
}

async fn get_categories(State(pool): State<SqlitePool>) -> ApiResponse<Json<CategoriesBody>> {
    let categories = get_all_categories(&pool).await.map_err(ApiError::internal)?;
    if categories.is_empty() {
        return Err(ApiError::NotFound);
    }
    Ok(Json(CategoriesBody {
        success: true,
        total_categories: categories.len(),
        categories: category_map(categories),
    }))
}

async fn get_category_questions(
    State(pool): State<SqlitePool>,
    PathParam(id): PathParam<i64>,
    QueryParams(query): QueryParams<PageQuery>,
) -> ApiResponse<Json<CategoryQuestionsBody>> {
    let questions = get_questions_for_category(&pool, id)
        .await
        .map_err(ApiError::internal)?;
    let page = paginate(&questions, query.page());
    if page.is_empty() {
        return Err(ApiError::NotFound);
    }
    Ok(Json(CategoryQuestionsBody {
        success: true,
        questions: page.to_vec(),
        total_questions: questions.len(),
        current_category: id,
    }))
}

pub fn category_router(state: AppState) -> Router {
    Router::new()
        .route("/categories", get(get_categories))
        .route("/categories/{id}/questions", get(get_category_questions))
        .with_state(state)
}
