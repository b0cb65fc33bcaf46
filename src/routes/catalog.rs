use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SubjectsQuery {
    pub grade_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct UnitsQuery {
    pub subject_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct TopicsQuery {
    pub unit_id: i32,
}

#[axum::debug_handler]
pub async fn list_grades(State(state): State<AppState>) -> crate::error::Result<Response> {
    let grades = state.catalog_service.list_grades().await?;
    Ok(Json(grades).into_response())
}

#[axum::debug_handler]
pub async fn list_subjects(
    State(state): State<AppState>,
    Query(query): Query<SubjectsQuery>,
) -> crate::error::Result<Response> {
    let subjects = state.catalog_service.list_subjects(query.grade_id).await?;
    Ok(Json(subjects).into_response())
}

#[axum::debug_handler]
pub async fn list_units(
    State(state): State<AppState>,
    Query(query): Query<UnitsQuery>,
) -> crate::error::Result<Response> {
    let units = state.catalog_service.list_units(query.subject_id).await?;
    Ok(Json(units).into_response())
}

#[axum::debug_handler]
pub async fn list_topics(
    State(state): State<AppState>,
    Query(query): Query<TopicsQuery>,
) -> crate::error::Result<Response> {
    let topics = state.catalog_service.list_topics(query.unit_id).await?;
    Ok(Json(topics).into_response())
}
