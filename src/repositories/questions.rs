use std::collections::BTreeMap;

use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Question;
use crate::db::types::{FlagStatus, FlagType, QuestionStatus, QuestionType, ReviewStage};

const SELECT: &str = "\
    SELECT q.id, q.question_text, q.question_type, q.options, q.correct_answer, q.explanation, \
    q.exam_id, e.name AS exam_name, q.subject_id, s.name AS subject_name, \
    q.topic_id, t.name AS topic_name, q.status, q.review_stage, \
    q.is_flagged, q.flag_type, q.flag_status, q.flag_reason, q.flagged_by, q.flagged_at, \
    q.rejection_reason, q.is_variant, q.original_question_id, q.created_by, \
    q.assigned_processor, q.assigned_creator, q.assigned_explainer, q.approved_by, \
    q.content_hash, q.created_at, q.updated_at \
    FROM questions q \
    LEFT JOIN exams e ON e.id = q.exam_id \
    LEFT JOIN subjects s ON s.id = q.subject_id \
    LEFT JOIN topics t ON t.id = q.topic_id";

/// Per-role assignment column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Assignment {
    Processor,
    Creator,
    Explainer,
}

impl Assignment {
    fn column(self) -> &'static str {
        match self {
            Self::Processor => "assigned_processor",
            Self::Creator => "assigned_creator",
            Self::Explainer => "assigned_explainer",
        }
    }
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("{SELECT} WHERE q.id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Loads the question and holds its row lock until the transaction ends.
pub(crate) async fn lock_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("{SELECT} WHERE q.id = $1 FOR UPDATE OF q"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_many_by_ids(
    pool: &PgPool,
    ids: &[String],
) -> Result<Vec<Question>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    sqlx::query_as::<_, Question>(&format!("{SELECT} WHERE q.id = ANY($1)"))
        .bind(ids)
        .fetch_all(pool)
        .await
}

/// Id of another original question with the same content hash.
pub(crate) async fn find_duplicate(
    executor: impl sqlx::PgExecutor<'_>,
    content_hash: &str,
    exclude_id: Option<&str>,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT id FROM questions
         WHERE content_hash = $1 AND is_variant = FALSE AND ($2::text IS NULL OR id <> $2)
         LIMIT 1",
    )
    .bind(content_hash)
    .bind(exclude_id)
    .fetch_optional(executor)
    .await
}

pub(crate) struct CreateQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) question_text: &'a str,
    pub(crate) question_type: QuestionType,
    pub(crate) options: BTreeMap<String, String>,
    pub(crate) correct_answer: Option<&'a str>,
    pub(crate) explanation: Option<&'a str>,
    pub(crate) exam_id: Option<&'a str>,
    pub(crate) subject_id: Option<&'a str>,
    pub(crate) topic_id: Option<&'a str>,
    pub(crate) status: QuestionStatus,
    pub(crate) review_stage: Option<ReviewStage>,
    pub(crate) original_question_id: Option<&'a str>,
    pub(crate) created_by: &'a str,
    pub(crate) content_hash: &'a str,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateQuestion<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO questions (
            id, question_text, question_type, options, correct_answer, explanation,
            exam_id, subject_id, topic_id, status, review_stage,
            is_variant, original_question_id, created_by, content_hash, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$16)",
    )
    .bind(params.id)
    .bind(params.question_text)
    .bind(params.question_type)
    .bind(Json(params.options))
    .bind(params.correct_answer)
    .bind(params.explanation)
    .bind(params.exam_id)
    .bind(params.subject_id)
    .bind(params.topic_id)
    .bind(params.status)
    .bind(params.review_stage)
    .bind(params.original_question_id.is_some())
    .bind(params.original_question_id)
    .bind(params.created_by)
    .bind(params.content_hash)
    .bind(params.now)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) struct UpdateContent {
    pub(crate) question_text: Option<String>,
    pub(crate) question_type: Option<QuestionType>,
    pub(crate) options: Option<BTreeMap<String, String>>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) exam_id: Option<String>,
    pub(crate) subject_id: Option<String>,
    pub(crate) topic_id: Option<String>,
    pub(crate) content_hash: Option<String>,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn update_content(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    params: UpdateContent,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE questions SET
            question_text = COALESCE($1, question_text),
            question_type = COALESCE($2, question_type),
            options = COALESCE($3, options),
            correct_answer = COALESCE($4, correct_answer),
            exam_id = COALESCE($5, exam_id),
            subject_id = COALESCE($6, subject_id),
            topic_id = COALESCE($7, topic_id),
            content_hash = COALESCE($8, content_hash),
            updated_at = $9
         WHERE id = $10",
    )
    .bind(params.question_text)
    .bind(params.question_type)
    .bind(params.options.map(Json))
    .bind(params.correct_answer)
    .bind(params.exam_id)
    .bind(params.subject_id)
    .bind(params.topic_id)
    .bind(params.content_hash)
    .bind(params.updated_at)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

/// How a state change treats the processor's revision note.
#[derive(Debug, Clone, Copy)]
pub(crate) enum RevisionNote<'a> {
    Keep,
    Set(&'a str),
    Clear,
}

pub(crate) struct StateUpdate<'a> {
    pub(crate) status: QuestionStatus,
    pub(crate) review_stage: Option<ReviewStage>,
    pub(crate) note: RevisionNote<'a>,
    pub(crate) approved_by: Option<&'a str>,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn update_state(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    params: StateUpdate<'_>,
) -> Result<(), sqlx::Error> {
    let (replace_note, note) = match params.note {
        RevisionNote::Keep => (false, None),
        RevisionNote::Set(note) => (true, Some(note)),
        RevisionNote::Clear => (true, None),
    };

    sqlx::query(
        "UPDATE questions SET
            status = $1,
            review_stage = $2,
            rejection_reason = CASE WHEN $3 THEN $4 ELSE rejection_reason END,
            approved_by = COALESCE($5, approved_by),
            updated_at = $6
         WHERE id = $7",
    )
    .bind(params.status)
    .bind(params.review_stage)
    .bind(replace_note)
    .bind(note)
    .bind(params.approved_by)
    .bind(params.updated_at)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn raise_flag(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    flag_type: FlagType,
    reason: &str,
    flagged_by: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE questions SET
            is_flagged = TRUE, flag_type = $1, flag_status = $2, flag_reason = $3,
            flagged_by = $4, flagged_at = $5, updated_at = $5
         WHERE id = $6",
    )
    .bind(flag_type)
    .bind(FlagStatus::Pending)
    .bind(reason)
    .bind(flagged_by)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Records the processor's decision. An accepted flag stays visible until the
/// question is resubmitted.
pub(crate) async fn resolve_flag(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    outcome: FlagStatus,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE questions SET is_flagged = $1, flag_status = $2, updated_at = $3 WHERE id = $4")
        .bind(outcome == FlagStatus::Approved)
        .bind(outcome)
        .bind(now)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn clear_flag(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE questions SET
            is_flagged = FALSE, flag_type = NULL, flag_status = NULL, flag_reason = NULL,
            flagged_by = NULL, flagged_at = NULL
         WHERE id = $1",
    )
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn set_explanation(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    explanation: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE questions SET explanation = $1, updated_at = $2 WHERE id = $3")
        .bind(explanation)
        .bind(now)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn assign(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    assignment: Assignment,
    user_id: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        "UPDATE questions SET {} = $1, updated_at = $2 WHERE id = $3",
        assignment.column()
    ))
    .bind(user_id)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn list_variants(
    pool: &PgPool,
    original_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "{SELECT} WHERE q.original_question_id = $1 ORDER BY q.created_at"
    ))
    .bind(original_id)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Default)]
pub(crate) struct QuestionFilters<'a> {
    pub(crate) statuses: &'a [QuestionStatus],
    pub(crate) exam_id: Option<&'a str>,
    pub(crate) subject_id: Option<&'a str>,
    pub(crate) topic_id: Option<&'a str>,
    pub(crate) question_type: Option<QuestionType>,
    pub(crate) pending_flag: Option<bool>,
    pub(crate) is_variant: Option<bool>,
    pub(crate) search: Option<&'a str>,
    pub(crate) created_by: Option<&'a str>,
    pub(crate) flagged_by: Option<&'a str>,
    /// Unassigned, or assigned to this user.
    pub(crate) open_to: Option<(Assignment, &'a str)>,
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, filters: &QuestionFilters<'a>) {
    builder.push(" WHERE TRUE");

    if !filters.statuses.is_empty() {
        builder.push(" AND q.status IN (");
        let mut separated = builder.separated(", ");
        for status in filters.statuses {
            separated.push_bind(*status);
        }
        separated.push_unseparated(")");
    }
    if let Some(exam_id) = filters.exam_id {
        builder.push(" AND q.exam_id = ");
        builder.push_bind(exam_id);
    }
    if let Some(subject_id) = filters.subject_id {
        builder.push(" AND q.subject_id = ");
        builder.push_bind(subject_id);
    }
    if let Some(topic_id) = filters.topic_id {
        builder.push(" AND q.topic_id = ");
        builder.push_bind(topic_id);
    }
    if let Some(question_type) = filters.question_type {
        builder.push(" AND q.question_type = ");
        builder.push_bind(question_type);
    }
    match filters.pending_flag {
        Some(true) => {
            builder.push(" AND q.flag_status = ");
            builder.push_bind(FlagStatus::Pending);
        }
        Some(false) => {
            builder.push(" AND q.flag_status IS DISTINCT FROM ");
            builder.push_bind(FlagStatus::Pending);
        }
        None => {}
    }
    if let Some(is_variant) = filters.is_variant {
        builder.push(" AND q.is_variant = ");
        builder.push_bind(is_variant);
    }
    if let Some(search) = filters.search.map(str::trim).filter(|search| !search.is_empty()) {
        builder.push(" AND q.question_text ILIKE ");
        builder.push_bind(format!("%{}%", escape_like(search)));
        builder.push(r" ESCAPE '\'");
    }
    if let Some(created_by) = filters.created_by {
        builder.push(" AND q.created_by = ");
        builder.push_bind(created_by);
    }
    if let Some(flagged_by) = filters.flagged_by {
        builder.push(" AND q.flagged_by = ");
        builder.push_bind(flagged_by);
    }
    if let Some((assignment, user_id)) = filters.open_to {
        let column = assignment.column();
        builder.push(format!(" AND (q.{column} IS NULL OR q.{column} = "));
        builder.push_bind(user_id);
        builder.push(")");
    }
}

/// Escapes LIKE wildcards so a search matches its text literally.
fn escape_like(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len());
    for c in search.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub(crate) async fn list(
    pool: &PgPool,
    filters: &QuestionFilters<'_>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Question>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(SELECT);
    push_filters(&mut builder, filters);
    builder.push(" ORDER BY q.updated_at DESC, q.id OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Question>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, filters: &QuestionFilters<'_>) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM questions q");
    push_filters(&mut builder, filters);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

/// Ids of every question matching the filters, for drawing practice sets.
pub(crate) async fn list_ids(
    pool: &PgPool,
    filters: &QuestionFilters<'_>,
) -> Result<Vec<String>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT q.id FROM questions q");
    push_filters(&mut builder, filters);
    builder.build_query_scalar::<String>().fetch_all(pool).await
}

pub(crate) async fn count_by_status(
    pool: &PgPool,
) -> Result<Vec<(QuestionStatus, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (QuestionStatus, i64)>(
        "SELECT status, COUNT(*) FROM questions GROUP BY status",
    )
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_pending_flags(
    executor: impl sqlx::PgExecutor<'_>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE flag_status = $1")
        .bind(FlagStatus::Pending)
        .fetch_one(executor)
        .await
}

pub(crate) async fn count_variants(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE is_variant = TRUE")
        .fetch_one(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%"), r"50\%");
        assert_eq!(escape_like("snake_case"), r"snake\_case");
        assert_eq!(escape_like(r"a\b"), r"a\\b");
        assert_eq!(escape_like("plain text"), "plain text");
    }
}
