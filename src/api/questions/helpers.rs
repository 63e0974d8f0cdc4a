use sqlx::{PgPool, Postgres, Transaction};

use crate::api::errors::ApiError;
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Question, User};
use crate::db::types::{FlagStatus, FlagType, HistoryAction, UserRole};
use crate::repositories;
use crate::repositories::questions::{Assignment, RevisionNote, StateUpdate};
use crate::services::workflow::{
    self, FlagEffect, QuestionFacts, Transition, WorkflowAction, WorkflowState,
};

pub(crate) type Tx = Transaction<'static, Postgres>;

pub(crate) async fn fetch_question(pool: &PgPool, question_id: &str) -> Result<Question, ApiError> {
    repositories::questions::find_by_id(pool, question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?
        .ok_or_else(|| ApiError::not_found("Question not found"))
}

/// Opens a transaction and locks the question row for the rest of it.
pub(crate) async fn begin_locked(state: &AppState, question_id: &str) -> Result<(Tx, Question), ApiError> {
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let question = repositories::questions::lock_for_update(&mut *tx, question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock question"))?
        .ok_or_else(|| ApiError::not_found("Question not found"))?;
    Ok((tx, question))
}

pub(crate) async fn commit(tx: Tx) -> Result<(), ApiError> {
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))
}

pub(crate) fn facts_of(question: &Question) -> QuestionFacts {
    QuestionFacts {
        flag_status: question.flag_status,
        has_explanation: question
            .explanation
            .as_deref()
            .is_some_and(|explanation| !explanation.trim().is_empty()),
        is_variant: question.is_variant,
    }
}

/// Gatherers only ever see their own questions.
pub(crate) fn ensure_visible(user: &User, question: &Question) -> Result<(), ApiError> {
    if user.role == UserRole::Gatherer && question.created_by != user.id {
        return Err(ApiError::not_found("Question not found"));
    }
    Ok(())
}

/// Assignment column a role claims when it first acts on a question.
fn claim_for(role: UserRole, action: &WorkflowAction) -> Option<Assignment> {
    use WorkflowAction as A;

    match (role, action) {
        (
            UserRole::Processor,
            A::Approve { .. } | A::Reject | A::ReturnForRevision | A::ResolveFlag { .. },
        ) => Some(Assignment::Processor),
        (UserRole::Creator, A::CreateVariant | A::CompleteVariants | A::Flag(_)) => {
            Some(Assignment::Creator)
        }
        (UserRole::Explainer, A::UpdateExplanation | A::SubmitExplanation | A::Flag(_)) => {
            Some(Assignment::Explainer)
        }
        _ => None,
    }
}

fn assignee(question: &Question, assignment: Assignment) -> Option<&str> {
    match assignment {
        Assignment::Processor => question.assigned_processor.as_deref(),
        Assignment::Creator => question.assigned_creator.as_deref(),
        Assignment::Explainer => question.assigned_explainer.as_deref(),
    }
}

fn ensure_actor(user: &User, question: &Question, action: &WorkflowAction) -> Result<(), ApiError> {
    if user.role == UserRole::Admin || user.role == UserRole::Student {
        return Ok(());
    }
    if matches!(action, WorkflowAction::Submit) && question.created_by != user.id {
        return Err(ApiError::forbidden("Only the author can submit this question"));
    }
    if let Some(assignment) = claim_for(user.role, action) {
        if assignee(question, assignment).is_some_and(|assigned| assigned != user.id) {
            return Err(ApiError::forbidden("Question is assigned to another user"));
        }
    }
    Ok(())
}

/// Role gate, ownership and state machine check for `action` on `question`.
pub(crate) fn plan(
    user: &User,
    question: &Question,
    action: WorkflowAction,
) -> Result<Transition, ApiError> {
    workflow::authorize(user.role, &action)?;
    ensure_actor(user, question, &action)?;
    let state = WorkflowState::from_parts(question.status, question.review_stage)?;
    Ok(state.apply(action, facts_of(question))?)
}

/// Writes a planned transition: state columns, flag overlay, assignment claim
/// and the history entry. `note` doubles as the flag reason for flag actions.
pub(crate) async fn persist(
    tx: &mut Tx,
    user: &User,
    question: &Question,
    action: WorkflowAction,
    transition: &Transition,
    note: Option<&str>,
) -> Result<(), ApiError> {
    let now = primitive_now_utc();
    let (status, review_stage) = transition.to.into_parts();

    let revision_note = match transition.history {
        HistoryAction::Rejected | HistoryAction::Returned => {
            note.map_or(RevisionNote::Keep, RevisionNote::Set)
        }
        HistoryAction::Submitted => RevisionNote::Clear,
        _ => RevisionNote::Keep,
    };
    let approved_by = (transition.history == HistoryAction::Approved
        && transition.to == WorkflowState::Completed)
        .then_some(user.id.as_str());

    repositories::questions::update_state(
        &mut **tx,
        &question.id,
        StateUpdate { status, review_stage, note: revision_note, approved_by, updated_at: now },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update question state"))?;

    match transition.flag {
        FlagEffect::Keep => {}
        FlagEffect::Raise(flag_type) => {
            repositories::questions::raise_flag(
                &mut **tx,
                &question.id,
                flag_type,
                note.unwrap_or_default(),
                &user.id,
                now,
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to flag question"))?;
        }
        FlagEffect::Approve | FlagEffect::Dismiss => {
            let outcome = if transition.flag == FlagEffect::Approve {
                FlagStatus::Approved
            } else {
                FlagStatus::Rejected
            };
            repositories::questions::resolve_flag(&mut **tx, &question.id, outcome, now)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to resolve flag"))?;
        }
        FlagEffect::Clear => {
            repositories::questions::clear_flag(&mut **tx, &question.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to clear flag"))?;
        }
    }

    if let Some(assignment) = claim_for(user.role, &action) {
        if assignee(question, assignment).is_none() {
            repositories::questions::assign(&mut **tx, &question.id, assignment, &user.id, now)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to assign question"))?;
        }
    }

    repositories::question_history::append(
        &mut **tx,
        repositories::question_history::CreateEntry {
            question_id: &question.id,
            action: transition.history,
            performed_by: &user.id,
            from_status: Some(transition.from.status()),
            to_status: Some(transition.to.status()),
            note,
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record question history"))?;

    Ok(())
}

pub(crate) fn record(user: &User, question_id: &str, action: WorkflowAction, transition: &Transition) {
    metrics::record_transition(action.name());
    tracing::info!(
        user_id = %user.id,
        question_id = %question_id,
        action = action.name(),
        from = transition.from.status().as_str(),
        to = transition.to.status().as_str(),
        "Workflow action applied"
    );
}

/// Locks, validates, persists and commits one workflow action, then returns
/// the fresh row.
pub(crate) async fn run_action(
    state: &AppState,
    user: &User,
    question_id: &str,
    action: WorkflowAction,
    note: Option<&str>,
) -> Result<Question, ApiError> {
    let (mut tx, question) = begin_locked(state, question_id).await?;
    let transition = plan(user, &question, action)?;
    persist(&mut tx, user, &question, action, &transition, note).await?;
    commit(tx).await?;

    record(user, &question.id, action, &transition);
    fetch_question(state.db(), question_id).await
}

/// Raises a flag of the caller's kind, rate limited per user.
pub(crate) async fn raise_flag(
    state: &AppState,
    user: &User,
    question_id: &str,
    flag_type: FlagType,
    reason: &str,
) -> Result<Question, ApiError> {
    let workflow_settings = state.settings().workflow();
    if !state
        .redis()
        .allow(
            "flag",
            &user.id,
            workflow_settings.flag_rate_limit,
            workflow_settings.flag_rate_window_seconds,
        )
        .await
    {
        return Err(ApiError::TooManyRequests("Too many flags, try again later"));
    }

    run_action(state, user, question_id, WorkflowAction::Flag(flag_type), Some(reason.trim())).await
}

/// Checks that the subject belongs to the exam and the topic to the subject.
pub(crate) async fn check_classification(
    pool: &PgPool,
    exam_id: Option<&str>,
    subject_id: Option<&str>,
    topic_id: Option<&str>,
) -> Result<(), ApiError> {
    if let Some(exam_id) = exam_id {
        repositories::catalog::find_exam(pool, exam_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
            .ok_or_else(|| ApiError::BadRequest("Unknown exam".to_string()))?;
    }
    if let Some(subject_id) = subject_id {
        let subject = repositories::catalog::find_subject(pool, subject_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch subject"))?
            .ok_or_else(|| ApiError::BadRequest("Unknown subject".to_string()))?;
        if exam_id.is_some_and(|exam_id| exam_id != subject.exam_id) {
            return Err(ApiError::BadRequest("Subject does not belong to the exam".to_string()));
        }
    }
    if let Some(topic_id) = topic_id {
        let topic = repositories::catalog::find_topic(pool, topic_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch topic"))?
            .ok_or_else(|| ApiError::BadRequest("Unknown topic".to_string()))?;
        if subject_id.is_some_and(|subject_id| subject_id != topic.subject_id) {
            return Err(ApiError::BadRequest("Topic does not belong to the subject".to_string()));
        }
    }
    Ok(())
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error().is_some_and(|db_err| db_err.is_unique_violation())
}

pub(crate) fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
