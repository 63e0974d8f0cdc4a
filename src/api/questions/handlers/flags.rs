use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStaff;
use crate::core::state::AppState;
use crate::schemas::question::{FlagDecision, FlagReviewRequest, QuestionResponse, ReasonRequest};
use crate::services::workflow::{flag_type_for, WorkflowAction};

use super::super::helpers;

pub(in crate::api::questions) async fn flag_question(
    Path(question_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<ReasonRequest>,
) -> Result<Json<QuestionResponse>, ApiError> {
    payload.validate()?;
    let flag_type = flag_type_for(user.role)
        .ok_or_else(|| ApiError::forbidden("Only creators and explainers can flag questions"))?;

    let question =
        helpers::raise_flag(&state, &user, &question_id, flag_type, &payload.reason).await?;
    Ok(Json(QuestionResponse::build(question, user.role)?))
}

pub(in crate::api::questions) async fn review_flag(
    Path(question_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<FlagReviewRequest>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let action =
        WorkflowAction::ResolveFlag { approved: payload.decision == FlagDecision::Approved };
    let question = helpers::run_action(
        &state,
        &user,
        &question_id,
        action,
        helpers::trimmed(payload.note.as_deref()),
    )
    .await?;
    Ok(Json(QuestionResponse::build(question, user.role)?))
}
