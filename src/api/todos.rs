use axum::Json;
use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;

use crate::models::BulkPatch;
use crate::service::TodoService;

use super::AppState;
use super::dto::{
    BulkDeleteResponse, BulkUpdateRequest, CreateTodoRequest, PageResponse, TodoResponse,
    UpdateTodoRequest, ValidatedJson,
};
use super::error::ApiError;
use super::params::{ListTodosQuery, parse_ids};

pub async fn create_todo(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<CreateTodoRequest>,
) -> Result<(StatusCode, Json<TodoResponse>), ApiError> {
    let db = state.db()?;
    let todo = TodoService::new(&*db).create_todo(body.into())?;
    Ok((StatusCode::CREATED, Json(todo.into())))
}

pub async fn list_todos(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<PageResponse<TodoResponse>>, ApiError> {
    let query = ListTodosQuery::parse(raw.as_deref(), &state.pagination)?;
    let db = state.db()?;
    let page = TodoService::new(&*db).get_todos(&query.filter, &query.request)?;
    Ok(Json(page.map(TodoResponse::from).into()))
}

pub async fn get_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TodoResponse>, ApiError> {
    let db = state.db()?;
    let todo = TodoService::new(&*db).get_todo(id)?;
    Ok(Json(todo.into()))
}

pub async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(body): ValidatedJson<UpdateTodoRequest>,
) -> Result<Json<TodoResponse>, ApiError> {
    let db = state.db()?;
    let todo = TodoService::new(&*db).update_todo(id, body.into())?;
    Ok(Json(todo.into()))
}

pub async fn toggle_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TodoResponse>, ApiError> {
    let db = state.db()?;
    let todo = TodoService::new(&*db).toggle_complete(id)?;
    Ok(Json(todo.into()))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TodoResponse>, ApiError> {
    let db = state.db()?;
    let todo = TodoService::new(&*db).delete_todo(id)?;
    Ok(Json(todo.into()))
}

pub async fn bulk_delete(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<BulkDeleteResponse>, ApiError> {
    let ids = parse_ids(raw.as_deref())?;
    let db = state.db()?;
    let deleted = TodoService::new(&*db).bulk_delete(&ids)?;
    Ok(Json(BulkDeleteResponse { deleted }))
}

pub async fn bulk_update(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<BulkUpdateRequest>,
) -> Result<Json<Vec<TodoResponse>>, ApiError> {
    let patch = BulkPatch {
        completed: body.completed,
        priority: body.priority,
    };
    let db = state.db()?;
    let todos = TodoService::new(&*db).bulk_update(&body.ids, patch)?;
    Ok(Json(todos.into_iter().map(TodoResponse::from).collect()))
}
