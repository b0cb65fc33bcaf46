use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};
use validator::Validate;

use crate::dto::quiz_dto::{StartSessionRequest, SubmitAnswerRequest, UpdateTimerRequest};
use crate::services::session_service::SessionConfig;
use crate::AppState;

#[axum::debug_handler]
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let config = SessionConfig::from_request(req)?;
    let response = state.session_service.start_session(config).await?;
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> crate::error::Result<Response> {
    let response = state.session_service.get_session_info(&token).await?;
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn get_session_questions(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> crate::error::Result<Response> {
    let response = state.session_service.get_session_questions(&token).await?;
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<SubmitAnswerRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let response = state.session_service.submit_answer(&token, req).await?;
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn complete_session(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> crate::error::Result<Response> {
    match state.session_service.complete_session(&token).await {
        Ok(result) => Ok(Json(result).into_response()),
        Err(e) => {
            tracing::error!(token = %token, error = ?e, "failed to complete session");
            Err(e)
        }
    }
}

#[axum::debug_handler]
pub async fn get_session_results(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> crate::error::Result<Response> {
    let response = state.session_service.get_session_results(&token).await?;
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn get_session_status(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> crate::error::Result<Response> {
    let response = state.session_service.get_status(&token).await?;
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn update_timer(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<UpdateTimerRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let response = state
        .session_service
        .update_timer(&token, req.remaining_time_seconds)
        .await?;
    Ok(Json(response).into_response())
}
