use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStaff;
use crate::api::validation::{
    ensure_submittable, normalize_answer, normalize_options, normalize_question_text,
};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::{HistoryAction, QuestionStatus, ReviewStage};
use crate::repositories;
use crate::repositories::questions::CreateQuestion;
use crate::schemas::question::{QuestionResponse, VariantCreate};
use crate::services::content_hash;
use crate::services::workflow::WorkflowAction;

use super::super::helpers;

/// Adds a variant of a question that is with the creator. The variant copies
/// its original's classification and goes straight to variant review.
pub(in crate::api::questions) async fn create_variant(
    Path(question_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<VariantCreate>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    payload.validate()?;

    let (mut tx, original) = helpers::begin_locked(&state, &question_id).await?;
    let transition = helpers::plan(&user, &original, WorkflowAction::CreateVariant)?;

    let question_text = normalize_question_text(&payload.question_text)?;
    let question_type = payload.question_type.unwrap_or(original.question_type);
    let options = normalize_options(question_type, payload.options)?;
    let correct_answer = normalize_answer(question_type, payload.correct_answer.as_deref());
    ensure_submittable(question_type, &options, correct_answer.as_deref())?;

    let variant_id = Uuid::new_v4().to_string();
    let hash = content_hash::hash(question_text);
    let now = primitive_now_utc();

    repositories::questions::create(
        &mut *tx,
        CreateQuestion {
            id: &variant_id,
            question_text,
            question_type,
            options,
            correct_answer: correct_answer.as_deref(),
            explanation: helpers::trimmed(payload.explanation.as_deref()),
            exam_id: original.exam_id.as_deref(),
            subject_id: original.subject_id.as_deref(),
            topic_id: original.topic_id.as_deref(),
            status: QuestionStatus::PendingProcessor,
            review_stage: Some(ReviewStage::Variants),
            original_question_id: Some(&original.id),
            created_by: &user.id,
            content_hash: &hash,
            now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create variant"))?;

    repositories::question_history::append(
        &mut *tx,
        repositories::question_history::CreateEntry {
            question_id: &variant_id,
            action: HistoryAction::Created,
            performed_by: &user.id,
            from_status: None,
            to_status: Some(QuestionStatus::PendingProcessor),
            note: Some(&original.id),
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record question history"))?;

    helpers::persist(
        &mut tx,
        &user,
        &original,
        WorkflowAction::CreateVariant,
        &transition,
        Some(&variant_id),
    )
    .await?;
    helpers::commit(tx).await?;
    helpers::record(&user, &original.id, WorkflowAction::CreateVariant, &transition);

    let variant = helpers::fetch_question(state.db(), &variant_id).await?;
    Ok((StatusCode::CREATED, Json(QuestionResponse::build(variant, user.role)?)))
}

pub(in crate::api::questions) async fn complete_variants(
    Path(question_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let question =
        helpers::run_action(&state, &user, &question_id, WorkflowAction::CompleteVariants, None)
            .await?;
    Ok(Json(QuestionResponse::build(question, user.role)?))
}
