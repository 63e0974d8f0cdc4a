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
use crate::db::models::{Question, User};
use crate::db::types::{HistoryAction, QuestionStatus, UserRole};
use crate::repositories;
use crate::repositories::questions::{CreateQuestion, UpdateContent};
use crate::schemas::question::{QuestionCreate, QuestionResponse, QuestionUpdate};
use crate::services::content_hash;
use crate::services::workflow::{WorkflowAction, WorkflowState};

use super::super::helpers;

const DUPLICATE_MESSAGE: &str = "A question with the same text already exists";

pub(in crate::api::questions) async fn create_question(
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<QuestionCreate>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    if !matches!(user.role, UserRole::Gatherer | UserRole::Admin) {
        return Err(ApiError::forbidden("Only gatherers can create questions"));
    }
    payload.validate()?;

    let question_text = normalize_question_text(&payload.question_text)?;
    let options = normalize_options(payload.question_type, payload.options)?;
    let correct_answer = normalize_answer(payload.question_type, payload.correct_answer.as_deref());
    if payload.submit {
        ensure_submittable(payload.question_type, &options, correct_answer.as_deref())?;
    }
    helpers::check_classification(
        state.db(),
        payload.exam_id.as_deref(),
        payload.subject_id.as_deref(),
        payload.topic_id.as_deref(),
    )
    .await?;

    let question_id = Uuid::new_v4().to_string();
    let hash = content_hash::hash(question_text);
    let now = primitive_now_utc();

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let duplicate = repositories::questions::find_duplicate(&mut *tx, &hash, None)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check for duplicates"))?;
    if duplicate.is_some() {
        return Err(ApiError::Conflict(DUPLICATE_MESSAGE.to_string()));
    }

    repositories::questions::create(
        &mut *tx,
        CreateQuestion {
            id: &question_id,
            question_text,
            question_type: payload.question_type,
            options,
            correct_answer: correct_answer.as_deref(),
            explanation: None,
            exam_id: payload.exam_id.as_deref(),
            subject_id: payload.subject_id.as_deref(),
            topic_id: payload.topic_id.as_deref(),
            status: QuestionStatus::PendingGatherer,
            review_stage: None,
            original_question_id: None,
            created_by: &user.id,
            content_hash: &hash,
            now,
        },
    )
    .await
    .map_err(|e| {
        if helpers::is_unique_violation(&e) {
            ApiError::Conflict(DUPLICATE_MESSAGE.to_string())
        } else {
            ApiError::internal(e, "Failed to create question")
        }
    })?;

    repositories::question_history::append(
        &mut *tx,
        repositories::question_history::CreateEntry {
            question_id: &question_id,
            action: HistoryAction::Created,
            performed_by: &user.id,
            from_status: None,
            to_status: Some(QuestionStatus::PendingGatherer),
            note: None,
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record question history"))?;

    let submitted = if payload.submit {
        let question = repositories::questions::lock_for_update(&mut *tx, &question_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to lock question"))?
            .ok_or_else(|| ApiError::not_found("Question not found"))?;
        let transition = helpers::plan(&user, &question, WorkflowAction::Submit)?;
        helpers::persist(&mut tx, &user, &question, WorkflowAction::Submit, &transition, None)
            .await?;
        Some(transition)
    } else {
        None
    };

    helpers::commit(tx).await?;

    tracing::info!(
        user_id = %user.id,
        question_id = %question_id,
        action = "question_create",
        "Question created"
    );
    if let Some(transition) = submitted {
        helpers::record(&user, &question_id, WorkflowAction::Submit, &transition);
    }

    let question = helpers::fetch_question(state.db(), &question_id).await?;
    Ok((StatusCode::CREATED, Json(QuestionResponse::build(question, user.role)?)))
}

/// Authors edit drafts and rejected questions, processors edit what they are
/// reviewing, admins edit anything.
fn ensure_editable(user: &User, question: &Question) -> Result<(), ApiError> {
    let state = WorkflowState::from_parts(question.status, question.review_stage)?;
    let allowed = match user.role {
        UserRole::Admin => true,
        UserRole::Processor => matches!(state, WorkflowState::AwaitingProcessor(_)),
        UserRole::Gatherer | UserRole::Creator if question.created_by == user.id => {
            if !matches!(state, WorkflowState::Draft | WorkflowState::Rejected) {
                return Err(ApiError::Conflict(
                    "Question can only be edited while in draft or rejected".to_string(),
                ));
            }
            true
        }
        _ => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(ApiError::forbidden("Not allowed to edit this question"))
    }
}

pub(in crate::api::questions) async fn update_question(
    Path(question_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<QuestionUpdate>,
) -> Result<Json<QuestionResponse>, ApiError> {
    payload.validate()?;

    let (mut tx, question) = helpers::begin_locked(&state, &question_id).await?;
    helpers::ensure_visible(&user, &question)?;
    ensure_editable(&user, &question)?;

    let reclassified =
        payload.exam_id.is_some() || payload.subject_id.is_some() || payload.topic_id.is_some();
    if question.is_variant && reclassified {
        return Err(ApiError::BadRequest(
            "Variants inherit exam, subject and topic from their original".to_string(),
        ));
    }

    let question_type = payload.question_type.unwrap_or(question.question_type);
    let options = match payload.options {
        Some(options) => Some(normalize_options(question_type, options)?),
        None if question_type != question.question_type => {
            Some(normalize_options(question_type, question.options.0.clone())?)
        }
        None => None,
    };
    let correct_answer = normalize_answer(question_type, payload.correct_answer.as_deref());

    if reclassified {
        helpers::check_classification(
            state.db(),
            payload.exam_id.as_deref().or(question.exam_id.as_deref()),
            payload.subject_id.as_deref().or(question.subject_id.as_deref()),
            payload.topic_id.as_deref().or(question.topic_id.as_deref()),
        )
        .await?;
    }

    let question_text = payload
        .question_text
        .as_deref()
        .map(normalize_question_text)
        .transpose()?;
    let hash = question_text.map(content_hash::hash);
    if let Some(hash) = hash.as_deref().filter(|_| !question.is_variant) {
        let duplicate =
            repositories::questions::find_duplicate(&mut *tx, hash, Some(&question.id))
                .await
                .map_err(|e| ApiError::internal(e, "Failed to check for duplicates"))?;
        if duplicate.is_some() {
            return Err(ApiError::Conflict(DUPLICATE_MESSAGE.to_string()));
        }
    }

    let now = primitive_now_utc();
    repositories::questions::update_content(
        &mut *tx,
        &question.id,
        UpdateContent {
            question_text: question_text.map(str::to_string),
            question_type: payload.question_type,
            options,
            correct_answer,
            exam_id: payload.exam_id,
            subject_id: payload.subject_id,
            topic_id: payload.topic_id,
            content_hash: hash,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| {
        if helpers::is_unique_violation(&e) {
            ApiError::Conflict(DUPLICATE_MESSAGE.to_string())
        } else {
            ApiError::internal(e, "Failed to update question")
        }
    })?;

    repositories::question_history::append(
        &mut *tx,
        repositories::question_history::CreateEntry {
            question_id: &question.id,
            action: HistoryAction::Edited,
            performed_by: &user.id,
            from_status: Some(question.status),
            to_status: Some(question.status),
            note: None,
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record question history"))?;

    helpers::commit(tx).await?;

    tracing::info!(
        user_id = %user.id,
        question_id = %question.id,
        action = "question_edit",
        "Question edited"
    );

    let updated = helpers::fetch_question(state.db(), &question.id).await?;
    Ok(Json(QuestionResponse::build(updated, user.role)?))
}

pub(in crate::api::questions) async fn submit_question(
    Path(question_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let (mut tx, question) = helpers::begin_locked(&state, &question_id).await?;
    helpers::ensure_visible(&user, &question)?;

    let transition = helpers::plan(&user, &question, WorkflowAction::Submit)?;
    ensure_submittable(
        question.question_type,
        &question.options.0,
        question.correct_answer.as_deref(),
    )?;
    helpers::persist(&mut tx, &user, &question, WorkflowAction::Submit, &transition, None).await?;
    helpers::commit(tx).await?;
    helpers::record(&user, &question.id, WorkflowAction::Submit, &transition);

    let submitted = helpers::fetch_question(state.db(), &question.id).await?;
    Ok(Json(QuestionResponse::build(submitted, user.role)?))
}
