use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::QuestionHistoryEntry;
use crate::db::types::{HistoryAction, QuestionStatus};

pub(crate) struct CreateEntry<'a> {
    pub(crate) question_id: &'a str,
    pub(crate) action: HistoryAction,
    pub(crate) performed_by: &'a str,
    pub(crate) from_status: Option<QuestionStatus>,
    pub(crate) to_status: Option<QuestionStatus>,
    pub(crate) note: Option<&'a str>,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn append(
    executor: impl sqlx::PgExecutor<'_>,
    entry: CreateEntry<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO question_history (
            id, question_id, action, performed_by, from_status, to_status, note, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(entry.question_id)
    .bind(entry.action)
    .bind(entry.performed_by)
    .bind(entry.from_status)
    .bind(entry.to_status)
    .bind(entry.note)
    .bind(entry.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn list_for_question(
    pool: &PgPool,
    question_id: &str,
) -> Result<Vec<QuestionHistoryEntry>, sqlx::Error> {
    sqlx::query_as::<_, QuestionHistoryEntry>(
        "SELECT h.id, h.question_id, h.action, h.performed_by, u.full_name AS performed_by_name,
                h.from_status, h.to_status, h.note, h.created_at
         FROM question_history h
         LEFT JOIN users u ON u.id = h.performed_by
         WHERE h.question_id = $1
         ORDER BY h.created_at, h.id",
    )
    .bind(question_id)
    .fetch_all(pool)
    .await
}
