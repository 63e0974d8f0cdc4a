use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rand::seq::SliceRandom;
use serde_json::json;
use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStudent;
use crate::api::pagination::{clamp_page, PaginatedResponse};
use crate::api::questions::helpers::{commit, Tx};
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Question, StudySession};
use crate::db::types::{QuestionStatus, SessionMode, SessionStatus};
use crate::repositories;
use crate::repositories::questions::QuestionFilters;
use crate::repositories::session_answers::UpsertAnswer;
use crate::repositories::study_sessions::{ClockUpdate, CreateSession};
use crate::schemas::question::StudentQuestionResponse;
use crate::schemas::session::{
    AnswerFeedback, AnswerSubmit, AnswerView, ReviewItem, SessionCreate, SessionDetailResponse,
    SessionResponse, SessionReviewResponse,
};
use crate::services::answer_check;
use crate::services::session_timing::{normalize_time_limit, SessionClock};

use super::queries::SessionListQuery;

/// Draws a random set of published questions and starts the clock.
pub(super) async fn start_session(
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<SessionCreate>,
) -> Result<(StatusCode, Json<SessionDetailResponse>), ApiError> {
    payload.validate()?;
    let practice = state.settings().practice();

    let count = payload.count.unwrap_or(practice.default_question_count);
    if count > practice.max_question_count {
        return Err(ApiError::BadRequest(format!(
            "count must be at most {}",
            practice.max_question_count
        )));
    }
    let time_limit_seconds =
        normalize_time_limit(payload.mode, payload.time_limit_minutes, practice.max_time_limit_minutes)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let filters = QuestionFilters {
        statuses: &[QuestionStatus::Completed],
        exam_id: payload.exam_id.as_deref(),
        subject_id: payload.subject_id.as_deref(),
        topic_id: payload.topic_id.as_deref(),
        question_type: payload.question_type,
        ..QuestionFilters::default()
    };
    let mut question_ids = repositories::questions::list_ids(state.db(), &filters)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to draw questions"))?;
    if question_ids.is_empty() {
        return Err(ApiError::BadRequest("No questions match the selected filters".to_string()));
    }
    question_ids.shuffle(&mut rand::thread_rng());
    question_ids.truncate(count as usize);

    let now = primitive_now_utc();
    let session_id = Uuid::new_v4().to_string();
    let session = repositories::study_sessions::create(
        state.db(),
        CreateSession {
            id: &session_id,
            student_id: &user.id,
            mode: payload.mode,
            question_ids,
            filters: json!({
                "exam_id": payload.exam_id,
                "subject_id": payload.subject_id,
                "topic_id": payload.topic_id,
                "question_type": payload.question_type,
            }),
            time_limit_seconds,
            now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to start session"))?;

    metrics::record_session_started(session.mode.as_str());
    tracing::info!(
        user_id = %user.id,
        session_id = %session.id,
        mode = session.mode.as_str(),
        total_questions = session.total_questions,
        action = "session_start",
        "Practice session started"
    );

    let questions = session_questions(state.db(), &session).await?;
    Ok((
        StatusCode::CREATED,
        Json(SessionDetailResponse {
            session: SessionResponse::build(session, now),
            questions,
            answers: Vec::new(),
        }),
    ))
}

pub(super) async fn list_sessions(
    Query(params): Query<SessionListQuery>,
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<SessionResponse>>, ApiError> {
    let (skip, limit) = clamp_page(params.skip, params.limit);
    let sessions =
        repositories::study_sessions::list_by_student(state.db(), &user.id, params.status, skip, limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list sessions"))?;
    let total_count =
        repositories::study_sessions::count_by_student(state.db(), &user.id, params.status)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to count sessions"))?;

    let now = primitive_now_utc();
    let items = sessions.into_iter().map(|session| SessionResponse::build(session, now)).collect();
    Ok(Json(PaginatedResponse { items, total_count, skip, limit }))
}

pub(super) async fn get_session(
    Path(session_id): Path<String>,
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<SessionDetailResponse>, ApiError> {
    let now = primitive_now_utc();
    let (tx, session) = begin_session(&state, &session_id, &user.id, now).await?;
    commit(tx).await?;

    let questions = session_questions(state.db(), &session).await?;
    let reveal = session.mode == SessionMode::Study || session.status.is_finished();
    let answers = repositories::session_answers::list_for_session(state.db(), &session.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load answers"))?
        .into_iter()
        .map(|answer| AnswerView::build(answer, reveal))
        .collect();

    Ok(Json(SessionDetailResponse { session: SessionResponse::build(session, now), questions, answers }))
}

/// Records an answer. Study sessions get the key and explanation back at
/// once; test sessions only get an acknowledgement.
pub(super) async fn submit_answer(
    Path(session_id): Path<String>,
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<AnswerSubmit>,
) -> Result<Json<AnswerFeedback>, ApiError> {
    payload.validate()?;
    let now = primitive_now_utc();
    let (mut tx, session) = begin_session(&state, &session_id, &user.id, now).await?;

    match session.status {
        SessionStatus::Active => {}
        SessionStatus::Paused => {
            return Err(ApiError::Conflict("Session is paused".to_string()));
        }
        SessionStatus::Completed | SessionStatus::Expired => {
            commit(tx).await?;
            return Err(ApiError::Conflict("Session is already finished".to_string()));
        }
    }
    if !session.question_ids.0.contains(&payload.question_id) {
        return Err(ApiError::BadRequest("Question is not part of this session".to_string()));
    }

    let question = repositories::questions::find_by_id(&mut *tx, &payload.question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?
        .ok_or_else(|| ApiError::not_found("Question not found"))?;
    let is_correct = answer_check::check(
        question.question_type,
        question.correct_answer.as_deref(),
        &payload.answer,
    );

    repositories::session_answers::upsert(
        &mut *tx,
        UpsertAnswer {
            session_id: &session.id,
            question_id: &question.id,
            answer: payload.answer.trim(),
            is_correct,
            time_spent_seconds: i32::try_from(payload.time_spent_seconds).unwrap_or(i32::MAX),
            answered_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to save answer"))?;
    repositories::study_sessions::refresh_counts(&mut *tx, &session.id, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update session"))?;
    let updated = repositories::study_sessions::fetch_one_by_id(&mut *tx, &session.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load session"))?;
    commit(tx).await?;

    tracing::info!(
        user_id = %user.id,
        session_id = %session.id,
        question_id = %question.id,
        action = "session_answer",
        "Answer recorded"
    );

    let reveal = session.mode == SessionMode::Study;
    Ok(Json(AnswerFeedback {
        question_id: question.id,
        accepted: true,
        answered_count: updated.answered_count,
        is_correct: if reveal { is_correct } else { None },
        correct_answer: if reveal { question.correct_answer } else { None },
        explanation: if reveal { question.explanation } else { None },
    }))
}

pub(super) async fn pause_session(
    Path(session_id): Path<String>,
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, ApiError> {
    let now = primitive_now_utc();
    let (mut tx, session) = begin_session(&state, &session_id, &user.id, now).await?;
    match session.status {
        SessionStatus::Active => {}
        SessionStatus::Paused => return Err(ApiError::Conflict("Session is already paused".to_string())),
        SessionStatus::Completed | SessionStatus::Expired => {
            commit(tx).await?;
            return Err(ApiError::Conflict("Session is already finished".to_string()));
        }
    }

    let clock = SessionClock::of(&session).stopped(now);
    let updated = set_clock(
        &mut tx,
        &session.id,
        ClockUpdate {
            status: SessionStatus::Paused,
            elapsed_seconds: clock.elapsed_seconds,
            last_resumed_at: None,
            paused_at: Some(now),
            completed_at: None,
            updated_at: now,
        },
    )
    .await?;
    commit(tx).await?;

    tracing::info!(user_id = %user.id, session_id = %session.id, action = "session_pause", "Session paused");
    Ok(Json(SessionResponse::build(updated, now)))
}

pub(super) async fn resume_session(
    Path(session_id): Path<String>,
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, ApiError> {
    let now = primitive_now_utc();
    let (mut tx, session) = begin_session(&state, &session_id, &user.id, now).await?;
    match session.status {
        SessionStatus::Paused => {}
        SessionStatus::Active => return Err(ApiError::Conflict("Session is not paused".to_string())),
        SessionStatus::Completed | SessionStatus::Expired => {
            commit(tx).await?;
            return Err(ApiError::Conflict("Session is already finished".to_string()));
        }
    }

    let clock = SessionClock::of(&session).resumed(now);
    let updated = set_clock(
        &mut tx,
        &session.id,
        ClockUpdate {
            status: SessionStatus::Active,
            elapsed_seconds: clock.elapsed_seconds,
            last_resumed_at: clock.last_resumed_at,
            paused_at: None,
            completed_at: None,
            updated_at: now,
        },
    )
    .await?;
    commit(tx).await?;

    tracing::info!(user_id = %user.id, session_id = %session.id, action = "session_resume", "Session resumed");
    Ok(Json(SessionResponse::build(updated, now)))
}

pub(super) async fn submit_session(
    Path(session_id): Path<String>,
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, ApiError> {
    let now = primitive_now_utc();
    let (mut tx, session) = begin_session(&state, &session_id, &user.id, now).await?;
    if session.status.is_finished() {
        commit(tx).await?;
        return Err(ApiError::Conflict("Session is already finished".to_string()));
    }

    let updated = finish(&mut tx, &session, SessionStatus::Completed, now).await?;
    commit(tx).await?;

    tracing::info!(
        user_id = %user.id,
        session_id = %session.id,
        answered = updated.answered_count,
        total = updated.total_questions,
        action = "session_submit",
        "Session completed"
    );
    Ok(Json(SessionResponse::build(updated, now)))
}

/// Full breakdown of a finished session, keys and explanations included.
pub(super) async fn review_session(
    Path(session_id): Path<String>,
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<SessionReviewResponse>, ApiError> {
    let now = primitive_now_utc();
    let (tx, session) = begin_session(&state, &session_id, &user.id, now).await?;
    commit(tx).await?;
    if !session.status.is_finished() {
        return Err(ApiError::Conflict(
            "Review is available once the session is finished".to_string(),
        ));
    }

    let mut answers: HashMap<String, _> =
        repositories::session_answers::list_for_session(state.db(), &session.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load answers"))?
            .into_iter()
            .map(|answer| (answer.question_id.clone(), answer))
            .collect();

    let mut items = Vec::with_capacity(session.question_ids.0.len());
    for mut question in ordered_questions(state.db(), &session.question_ids.0).await? {
        let answer = answers.remove(&question.id);
        let correct_answer = question.correct_answer.take();
        let explanation = question.explanation.take();
        items.push(ReviewItem {
            question: StudentQuestionResponse::build(question)?,
            correct_answer,
            explanation,
            is_correct: answer.as_ref().and_then(|answer| answer.is_correct),
            time_spent_seconds: answer.as_ref().map_or(0, |answer| answer.time_spent_seconds),
            answer: answer.map(|answer| answer.answer),
        });
    }

    Ok(Json(SessionReviewResponse { session: SessionResponse::build(session, now), items }))
}

/// Locks the caller's session, closing it first if its time ran out.
async fn begin_session(
    state: &AppState,
    session_id: &str,
    student_id: &str,
    now: PrimitiveDateTime,
) -> Result<(Tx, StudySession), ApiError> {
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let session = repositories::study_sessions::lock_for_student(&mut *tx, session_id, student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load session"))?
        .ok_or_else(|| ApiError::not_found("Session not found"))?;

    if session.status == SessionStatus::Active && SessionClock::of(&session).is_expired(now) {
        let expired = finish(&mut tx, &session, SessionStatus::Expired, now).await?;
        metrics::record_sessions_expired(1);
        tracing::info!(session_id = %session.id, action = "session_expire", "Session time ran out");
        return Ok((tx, expired));
    }
    Ok((tx, session))
}

async fn finish(
    tx: &mut Tx,
    session: &StudySession,
    status: SessionStatus,
    now: PrimitiveDateTime,
) -> Result<StudySession, ApiError> {
    let clock = SessionClock::of(session).stopped(now);
    set_clock(
        tx,
        &session.id,
        ClockUpdate {
            status,
            elapsed_seconds: clock.elapsed_seconds,
            last_resumed_at: None,
            paused_at: None,
            completed_at: Some(now),
            updated_at: now,
        },
    )
    .await
}

async fn set_clock(tx: &mut Tx, session_id: &str, update: ClockUpdate) -> Result<StudySession, ApiError> {
    repositories::study_sessions::update_clock(&mut **tx, session_id, update)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update session"))?;
    repositories::study_sessions::fetch_one_by_id(&mut **tx, session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load session"))
}

/// Questions in the order the session drew them.
async fn ordered_questions(pool: &PgPool, ids: &[String]) -> Result<Vec<Question>, ApiError> {
    let mut by_id: HashMap<String, Question> = repositories::questions::find_many_by_ids(pool, ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load session questions"))?
        .into_iter()
        .map(|question| (question.id.clone(), question))
        .collect();
    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
}

async fn session_questions(
    pool: &PgPool,
    session: &StudySession,
) -> Result<Vec<StudentQuestionResponse>, ApiError> {
    ordered_questions(pool, &session.question_ids.0)
        .await?
        .into_iter()
        .map(|question| StudentQuestionResponse::build(question).map_err(ApiError::from))
        .collect()
}
