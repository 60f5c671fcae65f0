use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::service::TagService;

use super::AppState;
use super::dto::{CreateTagRequest, TagResponse, ValidatedJson};
use super::error::ApiError;

pub async fn create_tag(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<CreateTagRequest>,
) -> Result<(StatusCode, Json<TagResponse>), ApiError> {
    let db = state.db()?;
    let tag = TagService::new(&*db).create_tag(body.name)?;
    Ok((StatusCode::CREATED, Json(tag.into())))
}

pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagResponse>>, ApiError> {
    let db = state.db()?;
    let tags = TagService::new(&*db).get_all_tags()?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

pub async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TagResponse>, ApiError> {
    let db = state.db()?;
    Ok(Json(TagService::new(&*db).get_tag(id)?.into()))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TagResponse>, ApiError> {
    let db = state.db()?;
    Ok(Json(TagService::new(&*db).delete_tag(id)?.into()))
}
