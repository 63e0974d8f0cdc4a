use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::StudySession;
use crate::db::types::{SessionMode, SessionStatus};
use crate::services::performance::SessionFact;

pub(crate) const COLUMNS: &str = "\
    id, student_id, mode, status, question_ids, filters, time_limit_seconds, \
    elapsed_seconds, last_resumed_at, paused_at, started_at, completed_at, \
    total_questions, answered_count, correct_count, created_at, updated_at";

pub(crate) struct CreateSession<'a> {
    pub(crate) id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) mode: SessionMode,
    pub(crate) question_ids: Vec<String>,
    pub(crate) filters: serde_json::Value,
    pub(crate) time_limit_seconds: Option<i32>,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    session: CreateSession<'_>,
) -> Result<StudySession, sqlx::Error> {
    let total = session.question_ids.len() as i32;
    sqlx::query_as::<_, StudySession>(&format!(
        "INSERT INTO study_sessions (
            id, student_id, mode, status, question_ids, filters, time_limit_seconds,
            elapsed_seconds, last_resumed_at, started_at, total_questions, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,0,$8,$8,$9,$8,$8)
        RETURNING {COLUMNS}"
    ))
    .bind(session.id)
    .bind(session.student_id)
    .bind(session.mode)
    .bind(SessionStatus::Active)
    .bind(Json(session.question_ids))
    .bind(Json(session.filters))
    .bind(session.time_limit_seconds)
    .bind(session.now)
    .bind(total)
    .fetch_one(executor)
    .await
}

pub(crate) async fn lock_for_student(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    student_id: &str,
) -> Result<Option<StudySession>, sqlx::Error> {
    sqlx::query_as::<_, StudySession>(&format!(
        "SELECT {COLUMNS} FROM study_sessions WHERE id = $1 AND student_id = $2 FOR UPDATE"
    ))
    .bind(id)
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn fetch_one_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<StudySession, sqlx::Error> {
    sqlx::query_as::<_, StudySession>(&format!("SELECT {COLUMNS} FROM study_sessions WHERE id = $1"))
        .bind(id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn list_by_student(
    pool: &PgPool,
    student_id: &str,
    status: Option<SessionStatus>,
    skip: i64,
    limit: i64,
) -> Result<Vec<StudySession>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {COLUMNS} FROM study_sessions WHERE student_id = "
    ));
    builder.push_bind(student_id);

    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    builder.push(" ORDER BY created_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<StudySession>().fetch_all(pool).await
}

pub(crate) async fn count_by_student(
    pool: &PgPool,
    student_id: &str,
    status: Option<SessionStatus>,
) -> Result<i64, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM study_sessions WHERE student_id = ");
    builder.push_bind(student_id);

    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) struct ClockUpdate {
    pub(crate) status: SessionStatus,
    pub(crate) elapsed_seconds: i32,
    pub(crate) last_resumed_at: Option<PrimitiveDateTime>,
    pub(crate) paused_at: Option<PrimitiveDateTime>,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn update_clock(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    params: ClockUpdate,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE study_sessions SET
            status = $1, elapsed_seconds = $2, last_resumed_at = $3, paused_at = $4,
            completed_at = $5, updated_at = $6
         WHERE id = $7",
    )
    .bind(params.status)
    .bind(params.elapsed_seconds)
    .bind(params.last_resumed_at)
    .bind(params.paused_at)
    .bind(params.completed_at)
    .bind(params.updated_at)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Recomputes the answer counters from `session_answers`.
pub(crate) async fn refresh_counts(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE study_sessions SET
            answered_count = (SELECT COUNT(*) FROM session_answers WHERE session_id = $1),
            correct_count = (
                SELECT COUNT(*) FROM session_answers WHERE session_id = $1 AND is_correct = TRUE
            ),
            updated_at = $2
         WHERE id = $1",
    )
    .bind(id)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

/// Closes running timed sessions whose limit has passed, returning their ids.
pub(crate) async fn expire_overdue(
    executor: impl sqlx::PgExecutor<'_>,
    now: PrimitiveDateTime,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "UPDATE study_sessions SET
            status = $1,
            elapsed_seconds = time_limit_seconds,
            last_resumed_at = NULL,
            completed_at = $2,
            updated_at = $2
         WHERE status = $3
           AND time_limit_seconds IS NOT NULL
           AND last_resumed_at IS NOT NULL
           AND elapsed_seconds + EXTRACT(EPOCH FROM ($2 - last_resumed_at)) >= time_limit_seconds
         RETURNING id",
    )
    .bind(SessionStatus::Expired)
    .bind(now)
    .bind(SessionStatus::Active)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_facts_by_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<SessionFact>, sqlx::Error> {
    sqlx::query_as::<_, SessionFact>(
        "SELECT mode, status, total_questions, correct_count
         FROM study_sessions WHERE student_id = $1",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
}
