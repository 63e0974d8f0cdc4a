use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStaff;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::question::{ExplanationUpdate, QuestionResponse};
use crate::services::workflow::WorkflowAction;

use super::super::helpers;

pub(in crate::api::questions) async fn update_explanation(
    Path(question_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<ExplanationUpdate>,
) -> Result<Json<QuestionResponse>, ApiError> {
    payload.validate()?;
    let explanation = payload.explanation.trim();
    if explanation.is_empty() {
        return Err(ApiError::BadRequest("explanation must not be empty".to_string()));
    }

    let (mut tx, question) = helpers::begin_locked(&state, &question_id).await?;
    let transition = helpers::plan(&user, &question, WorkflowAction::UpdateExplanation)?;

    repositories::questions::set_explanation(&mut *tx, &question.id, explanation, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to save explanation"))?;
    helpers::persist(
        &mut tx,
        &user,
        &question,
        WorkflowAction::UpdateExplanation,
        &transition,
        None,
    )
    .await?;
    helpers::commit(tx).await?;
    helpers::record(&user, &question.id, WorkflowAction::UpdateExplanation, &transition);

    let updated = helpers::fetch_question(state.db(), &question.id).await?;
    Ok(Json(QuestionResponse::build(updated, user.role)?))
}

pub(in crate::api::questions) async fn submit_explanation(
    Path(question_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let question =
        helpers::run_action(&state, &user, &question_id, WorkflowAction::SubmitExplanation, None)
            .await?;
    Ok(Json(QuestionResponse::build(question, user.role)?))
}
