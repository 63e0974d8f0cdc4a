use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::SessionAnswer;
use crate::services::performance::AnswerFact;

const COLUMNS: &str = "session_id, question_id, answer, is_correct, time_spent_seconds, answered_at";

pub(crate) struct UpsertAnswer<'a> {
    pub(crate) session_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) answer: &'a str,
    pub(crate) is_correct: Option<bool>,
    pub(crate) time_spent_seconds: i32,
    pub(crate) answered_at: PrimitiveDateTime,
}

/// Stores an answer; answering the same question again replaces the earlier one.
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    params: UpsertAnswer<'_>,
) -> Result<SessionAnswer, sqlx::Error> {
    sqlx::query_as::<_, SessionAnswer>(&format!(
        "INSERT INTO session_answers ({COLUMNS}) VALUES ($1,$2,$3,$4,$5,$6)
         ON CONFLICT (session_id, question_id) DO UPDATE SET
            answer = EXCLUDED.answer,
            is_correct = EXCLUDED.is_correct,
            time_spent_seconds = session_answers.time_spent_seconds + EXCLUDED.time_spent_seconds,
            answered_at = EXCLUDED.answered_at
         RETURNING {COLUMNS}"
    ))
    .bind(params.session_id)
    .bind(params.question_id)
    .bind(params.answer)
    .bind(params.is_correct)
    .bind(params.time_spent_seconds)
    .bind(params.answered_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_for_session(
    pool: &PgPool,
    session_id: &str,
) -> Result<Vec<SessionAnswer>, sqlx::Error> {
    sqlx::query_as::<_, SessionAnswer>(&format!(
        "SELECT {COLUMNS} FROM session_answers WHERE session_id = $1 ORDER BY answered_at"
    ))
    .bind(session_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_facts_by_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<AnswerFact>, sqlx::Error> {
    sqlx::query_as::<_, AnswerFact>(
        "SELECT s.id AS subject_id, s.name AS subject_name,
                t.id AS topic_id, t.name AS topic_name, a.is_correct
         FROM session_answers a
         JOIN study_sessions ss ON ss.id = a.session_id
         JOIN questions q ON q.id = a.question_id
         LEFT JOIN subjects s ON s.id = q.subject_id
         LEFT JOIN topics t ON t.id = q.topic_id
         WHERE ss.student_id = $1",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
}
