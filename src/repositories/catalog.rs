use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{Exam, Subject, Topic};

pub(crate) async fn list_exams(pool: &PgPool) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>("SELECT id, name, created_at FROM exams ORDER BY name")
        .fetch_all(pool)
        .await
}

pub(crate) async fn find_exam(pool: &PgPool, id: &str) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>("SELECT id, name, created_at FROM exams WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Inserts an exam; `None` when the name is already taken.
pub(crate) async fn create_exam(
    pool: &PgPool,
    id: &str,
    name: &str,
    now: PrimitiveDateTime,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(
        "INSERT INTO exams (id, name, created_at) VALUES ($1, $2, $3)
         ON CONFLICT (name) DO NOTHING
         RETURNING id, name, created_at",
    )
    .bind(id)
    .bind(name)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_subjects(pool: &PgPool, exam_id: &str) -> Result<Vec<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(
        "SELECT id, exam_id, name, created_at FROM subjects WHERE exam_id = $1 ORDER BY name",
    )
    .bind(exam_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_subject(pool: &PgPool, id: &str) -> Result<Option<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>("SELECT id, exam_id, name, created_at FROM subjects WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn create_subject(
    pool: &PgPool,
    id: &str,
    exam_id: &str,
    name: &str,
    now: PrimitiveDateTime,
) -> Result<Option<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(
        "INSERT INTO subjects (id, exam_id, name, created_at) VALUES ($1, $2, $3, $4)
         ON CONFLICT (exam_id, name) DO NOTHING
         RETURNING id, exam_id, name, created_at",
    )
    .bind(id)
    .bind(exam_id)
    .bind(name)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_topics(pool: &PgPool, subject_id: &str) -> Result<Vec<Topic>, sqlx::Error> {
    sqlx::query_as::<_, Topic>(
        "SELECT id, subject_id, name, created_at FROM topics WHERE subject_id = $1 ORDER BY name",
    )
    .bind(subject_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_topic(pool: &PgPool, id: &str) -> Result<Option<Topic>, sqlx::Error> {
    sqlx::query_as::<_, Topic>("SELECT id, subject_id, name, created_at FROM topics WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn create_topic(
    pool: &PgPool,
    id: &str,
    subject_id: &str,
    name: &str,
    now: PrimitiveDateTime,
) -> Result<Option<Topic>, sqlx::Error> {
    sqlx::query_as::<_, Topic>(
        "INSERT INTO topics (id, subject_id, name, created_at) VALUES ($1, $2, $3, $4)
         ON CONFLICT (subject_id, name) DO NOTHING
         RETURNING id, subject_id, name, created_at",
    )
    .bind(id)
    .bind(subject_id)
    .bind(name)
    .bind(now)
    .fetch_optional(pool)
    .await
}
