use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStaff;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::{HistoryAction, UserRole};
use crate::repositories;
use crate::repositories::questions::Assignment;
use crate::schemas::question::{
    ApproveRequest, AssignRequest, AssignRole, QuestionResponse, ReasonRequest,
};
use crate::services::workflow::WorkflowAction;

use super::super::helpers;

pub(in crate::api::questions) async fn approve_question(
    Path(question_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    payload: Option<Json<ApproveRequest>>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    let note = helpers::trimmed(payload.note.as_deref());

    let question = helpers::run_action(
        &state,
        &user,
        &question_id,
        WorkflowAction::Approve { next: payload.next },
        note,
    )
    .await?;
    Ok(Json(QuestionResponse::build(question, user.role)?))
}

pub(in crate::api::questions) async fn reject_question(
    Path(question_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<ReasonRequest>,
) -> Result<Json<QuestionResponse>, ApiError> {
    payload.validate()?;
    let question = helpers::run_action(
        &state,
        &user,
        &question_id,
        WorkflowAction::Reject,
        Some(payload.reason.trim()),
    )
    .await?;
    Ok(Json(QuestionResponse::build(question, user.role)?))
}

pub(in crate::api::questions) async fn return_question(
    Path(question_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<ReasonRequest>,
) -> Result<Json<QuestionResponse>, ApiError> {
    payload.validate()?;
    let question = helpers::run_action(
        &state,
        &user,
        &question_id,
        WorkflowAction::ReturnForRevision,
        Some(payload.reason.trim()),
    )
    .await?;
    Ok(Json(QuestionResponse::build(question, user.role)?))
}

/// Hands a question to a specific processor, creator or explainer.
pub(in crate::api::questions) async fn assign_question(
    Path(question_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<QuestionResponse>, ApiError> {
    if !matches!(user.role, UserRole::Processor | UserRole::Admin) {
        return Err(ApiError::forbidden("Only processors can assign questions"));
    }

    let assignee_role = repositories::users::find_active_role(state.db(), &payload.user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load assignee"))?
        .ok_or_else(|| ApiError::BadRequest("Assignee not found or inactive".to_string()))?;
    if assignee_role != payload.role.user_role() {
        return Err(ApiError::BadRequest(format!(
            "Assignee does not have the {} role",
            payload.role.user_role().as_str()
        )));
    }

    let assignment = match payload.role {
        AssignRole::Processor => Assignment::Processor,
        AssignRole::Creator => Assignment::Creator,
        AssignRole::Explainer => Assignment::Explainer,
    };

    let (mut tx, question) = helpers::begin_locked(&state, &question_id).await?;
    let now = primitive_now_utc();
    repositories::questions::assign(&mut *tx, &question.id, assignment, &payload.user_id, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to assign question"))?;

    let note = format!("{}: {}", payload.role.user_role().as_str(), payload.user_id);
    repositories::question_history::append(
        &mut *tx,
        repositories::question_history::CreateEntry {
            question_id: &question.id,
            action: HistoryAction::Assigned,
            performed_by: &user.id,
            from_status: Some(question.status),
            to_status: Some(question.status),
            note: Some(&note),
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record question history"))?;
    helpers::commit(tx).await?;

    tracing::info!(
        user_id = %user.id,
        question_id = %question.id,
        assignee_id = %payload.user_id,
        role = payload.role.user_role().as_str(),
        action = "question_assign",
        "Question assigned"
    );

    let assigned = helpers::fetch_question(state.db(), &question.id).await?;
    Ok(Json(QuestionResponse::build(assigned, user.role)?))
}
