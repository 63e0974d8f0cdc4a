use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentStaff, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::catalog::{CatalogEntryCreate, ExamResponse, SubjectResponse, TopicResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/exams", get(list_exams).post(create_exam))
        .route("/exams/:exam_id/subjects", get(list_subjects).post(create_subject))
        .route("/subjects/:subject_id/topics", get(list_topics).post(create_topic))
}

/// Catalog edits are reserved for processors and admins.
fn ensure_curator(user: &User) -> Result<(), ApiError> {
    if matches!(user.role, UserRole::Processor | UserRole::Admin) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Only processors and admins can edit the catalog"))
    }
}

async fn list_exams(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ExamResponse>>, ApiError> {
    let exams = repositories::catalog::list_exams(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;
    Ok(Json(exams.into_iter().map(ExamResponse::from).collect()))
}

async fn create_exam(
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<CatalogEntryCreate>,
) -> Result<(StatusCode, Json<ExamResponse>), ApiError> {
    ensure_curator(&user)?;
    payload.validate()?;

    let exam = repositories::catalog::create_exam(
        state.db(),
        &Uuid::new_v4().to_string(),
        payload.name.trim(),
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create exam"))?
    .ok_or_else(|| ApiError::Conflict("Exam with this name already exists".to_string()))?;

    tracing::info!(user_id = %user.id, exam_id = %exam.id, action = "exam_create", "Exam created");
    Ok((StatusCode::CREATED, Json(exam.into())))
}

async fn list_subjects(
    Path(exam_id): Path<String>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<SubjectResponse>>, ApiError> {
    let subjects = repositories::catalog::list_subjects(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list subjects"))?;
    Ok(Json(subjects.into_iter().map(SubjectResponse::from).collect()))
}

async fn create_subject(
    Path(exam_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<CatalogEntryCreate>,
) -> Result<(StatusCode, Json<SubjectResponse>), ApiError> {
    ensure_curator(&user)?;
    payload.validate()?;

    repositories::catalog::find_exam(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::not_found("Exam not found"))?;

    let subject = repositories::catalog::create_subject(
        state.db(),
        &Uuid::new_v4().to_string(),
        &exam_id,
        payload.name.trim(),
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create subject"))?
    .ok_or_else(|| ApiError::Conflict("Subject already exists for this exam".to_string()))?;

    Ok((StatusCode::CREATED, Json(subject.into())))
}

async fn list_topics(
    Path(subject_id): Path<String>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<TopicResponse>>, ApiError> {
    let topics = repositories::catalog::list_topics(state.db(), &subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list topics"))?;
    Ok(Json(topics.into_iter().map(TopicResponse::from).collect()))
}

async fn create_topic(
    Path(subject_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<CatalogEntryCreate>,
) -> Result<(StatusCode, Json<TopicResponse>), ApiError> {
    ensure_curator(&user)?;
    payload.validate()?;

    repositories::catalog::find_subject(state.db(), &subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch subject"))?
        .ok_or_else(|| ApiError::not_found("Subject not found"))?;

    let topic = repositories::catalog::create_topic(
        state.db(),
        &Uuid::new_v4().to_string(),
        &subject_id,
        payload.name.trim(),
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create topic"))?
    .ok_or_else(|| ApiError::Conflict("Topic already exists for this subject".to_string()))?;

    Ok((StatusCode::CREATED, Json(topic.into())))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::db::types::UserRole;
    use crate::test_support;

    #[tokio::test]
    async fn processor_builds_catalog_and_students_read_it() {
        let ctx = test_support::setup_test_context().await;
        let processor = test_support::insert_user_with_role(
            ctx.state.db(),
            "processor",
            "Processor",
            "password123",
            UserRole::Processor,
        )
        .await;
        let student =
            test_support::insert_user(ctx.state.db(), "student", "Student", "password123").await;
        let staff_token = test_support::bearer_token(&processor, ctx.state.settings());
        let student_token = test_support::bearer_token(&student, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/catalog/exams",
                Some(&staff_token),
                Some(json!({"name": "JEE"})),
            ))
            .await
            .expect("create exam");
        assert_eq!(response.status(), StatusCode::CREATED);
        let exam_id = test_support::read_json(response).await["id"]
            .as_str()
            .expect("exam id")
            .to_string();

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/catalog/exams/{exam_id}/subjects"),
                Some(&staff_token),
                Some(json!({"name": "Chemistry"})),
            ))
            .await
            .expect("create subject");
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/catalog/exams",
                Some(&staff_token),
                Some(json!({"name": "JEE"})),
            ))
            .await
            .expect("duplicate exam");
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                &format!("/api/v1/catalog/exams/{exam_id}/subjects"),
                Some(&student_token),
                None,
            ))
            .await
            .expect("list subjects");
        assert_eq!(response.status(), StatusCode::OK);
        let subjects = test_support::read_json(response).await;
        assert_eq!(subjects[0]["name"], "Chemistry");

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/catalog/exams",
                Some(&student_token),
                Some(json!({"name": "SAT"})),
            ))
            .await
            .expect("student create");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
