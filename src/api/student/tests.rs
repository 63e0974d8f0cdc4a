use std::collections::BTreeMap;

use axum::http::{Method, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::PgPool;
use time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::db::types::{QuestionStatus, QuestionType, SessionMode, SessionStatus};
use crate::repositories;
use crate::repositories::questions::CreateQuestion;
use crate::repositories::study_sessions::CreateSession;
use crate::services::content_hash;
use crate::test_support::{self, TestCatalog};

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(test_support::json_request(method, uri, Some(token), body))
        .await
        .expect("response");
    let status = response.status();
    (status, test_support::read_json(response).await)
}

async fn insert_question(
    pool: &PgPool,
    author_id: &str,
    catalog: &TestCatalog,
    text: &str,
    status: QuestionStatus,
) -> String {
    let id = Uuid::new_v4().to_string();
    let options = BTreeMap::from([
        ("A".to_string(), "Refraction".to_string()),
        ("B".to_string(), "Reflection".to_string()),
    ]);
    repositories::questions::create(
        pool,
        CreateQuestion {
            id: &id,
            question_text: text,
            question_type: QuestionType::Mcq,
            options,
            correct_answer: Some("B"),
            explanation: Some("Mirrors reflect light."),
            exam_id: Some(&catalog.exam_id),
            subject_id: Some(&catalog.subject_id),
            topic_id: Some(&catalog.topic_id),
            status,
            review_stage: None,
            original_question_id: None,
            created_by: author_id,
            content_hash: &content_hash::hash(text),
            now: primitive_now_utc(),
        },
    )
    .await
    .expect("insert question");
    id
}

async fn publish_three(pool: &PgPool, author_id: &str, catalog: &TestCatalog) -> Vec<String> {
    let mut ids = Vec::new();
    for text in ["What does a plane mirror do?", "Which law covers mirrors?", "Why do we see images?"] {
        ids.push(insert_question(pool, author_id, catalog, text, QuestionStatus::Completed).await);
    }
    ids
}

#[tokio::test]
async fn browsing_shows_only_published_questions_without_keys() {
    let ctx = test_support::setup_test_context().await;
    let crew = test_support::insert_crew(ctx.state.db()).await;
    let catalog = test_support::insert_catalog(ctx.state.db()).await;
    publish_three(ctx.state.db(), &crew.gatherer.id, &catalog).await;
    insert_question(ctx.state.db(), &crew.gatherer.id, &catalog, "Still a draft", QuestionStatus::PendingGatherer)
        .await;
    let student = test_support::bearer_token(&crew.student, ctx.state.settings());

    let (status, body) = call(&ctx.app, Method::GET, "/api/v1/student/questions", &student, None).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["total_count"], 3);
    let first = &body["items"][0];
    assert_eq!(first["display_status"], "Available");
    assert!(first.get("correct_answer").is_none());
    assert!(first.get("explanation").is_none());
    assert_eq!(first["subject"]["name"], "Physics");

    let staff = test_support::bearer_token(&crew.processor, ctx.state.settings());
    let (status, _) = call(&ctx.app, Method::GET, "/api/v1/student/questions", &staff, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn study_session_gives_feedback_and_review() {
    let ctx = test_support::setup_test_context().await;
    let crew = test_support::insert_crew(ctx.state.db()).await;
    let catalog = test_support::insert_catalog(ctx.state.db()).await;
    publish_three(ctx.state.db(), &crew.gatherer.id, &catalog).await;
    let student = test_support::bearer_token(&crew.student, ctx.state.settings());
    let app = &ctx.app;

    let (status, session) = call(
        app,
        Method::POST,
        "/api/v1/student/questions/sessions",
        &student,
        Some(json!({"mode": "study", "subject_id": catalog.subject_id, "count": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {session}");
    assert_eq!(session["status"], "active");
    assert_eq!(session["total_questions"], 2);
    assert_eq!(session["questions"].as_array().map(Vec::len), Some(2));
    let session_id = session["id"].as_str().expect("session id").to_string();
    let first = session["questions"][0]["id"].as_str().expect("question id").to_string();

    let (status, feedback) = call(
        app,
        Method::POST,
        &format!("/api/v1/student/questions/sessions/{session_id}/answers"),
        &student,
        Some(json!({"question_id": first, "answer": "b", "time_spent_seconds": 12})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {feedback}");
    assert_eq!(feedback["is_correct"], true);
    assert_eq!(feedback["correct_answer"], "B");
    assert_eq!(feedback["explanation"], "Mirrors reflect light.");
    assert_eq!(feedback["answered_count"], 1);

    let (status, _) = call(
        app,
        Method::POST,
        &format!("/api/v1/student/questions/sessions/{session_id}/answers"),
        &student,
        Some(json!({"question_id": "not-in-session", "answer": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        app,
        Method::GET,
        &format!("/api/v1/student/questions/sessions/{session_id}/review"),
        &student,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, submitted) = call(
        app,
        Method::POST,
        &format!("/api/v1/student/questions/sessions/{session_id}/submit"),
        &student,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {submitted}");
    assert_eq!(submitted["status"], "completed");
    assert_eq!(submitted["score"], 50.0);

    let (status, review) = call(
        app,
        Method::GET,
        &format!("/api/v1/student/questions/sessions/{session_id}/review"),
        &student,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {review}");
    assert_eq!(review["items"][0]["id"], first.as_str());
    assert_eq!(review["items"][0]["answer"], "b");
    assert_eq!(review["items"][0]["is_correct"], true);
    assert_eq!(review["items"][0]["time_spent_seconds"], 12);
    assert_eq!(review["items"][1]["answer"], Value::Null);
    assert_eq!(review["items"][1]["correct_answer"], "B");

    let (status, performance) =
        call(app, Method::GET, "/api/v1/student/questions/performance", &student, None).await;
    assert_eq!(status, StatusCode::OK, "response: {performance}");
    assert_eq!(performance["total_answered"], 1);
    assert_eq!(performance["correct"], 1);
    assert_eq!(performance["sessions_completed"], 1);
    assert_eq!(performance["by_subject"][0]["name"], "Physics");
    assert_eq!(performance["by_subject"][0]["id"], catalog.subject_id.as_str());
}

#[tokio::test]
async fn test_session_withholds_feedback_and_pauses() {
    let ctx = test_support::setup_test_context().await;
    let crew = test_support::insert_crew(ctx.state.db()).await;
    let catalog = test_support::insert_catalog(ctx.state.db()).await;
    publish_three(ctx.state.db(), &crew.gatherer.id, &catalog).await;
    let student = test_support::bearer_token(&crew.student, ctx.state.settings());
    let app = &ctx.app;

    let (status, session) = call(
        app,
        Method::POST,
        "/api/v1/student/questions/sessions",
        &student,
        Some(json!({"mode": "test", "time_limit_minutes": 10})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {session}");
    assert_eq!(session["time_limit_seconds"], 600);
    assert_eq!(session["correct_count"], Value::Null);
    let session_id = session["id"].as_str().expect("session id").to_string();
    let question = session["questions"][0]["id"].as_str().expect("question id").to_string();
    let base = format!("/api/v1/student/questions/sessions/{session_id}");

    let (status, feedback) = call(
        app,
        Method::POST,
        &format!("{base}/answers"),
        &student,
        Some(json!({"question_id": question, "answer": "B"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {feedback}");
    assert_eq!(feedback["accepted"], true);
    assert_eq!(feedback["is_correct"], Value::Null);
    assert_eq!(feedback["correct_answer"], Value::Null);

    let (status, paused) = call(app, Method::POST, &format!("{base}/pause"), &student, None).await;
    assert_eq!(status, StatusCode::OK, "response: {paused}");
    assert_eq!(paused["status"], "paused");

    let (status, _) = call(
        app,
        Method::POST,
        &format!("{base}/answers"),
        &student,
        Some(json!({"question_id": question, "answer": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(app, Method::POST, &format!("{base}/pause"), &student, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, resumed) = call(app, Method::POST, &format!("{base}/resume"), &student, None).await;
    assert_eq!(status, StatusCode::OK, "response: {resumed}");
    assert_eq!(resumed["status"], "active");

    let (status, detail) = call(app, Method::GET, &base, &student, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["answers"][0]["is_correct"], Value::Null);

    let (status, submitted) = call(app, Method::POST, &format!("{base}/submit"), &student, None).await;
    assert_eq!(status, StatusCode::OK, "response: {submitted}");
    assert_eq!(submitted["correct_count"], 1);

    let (status, _) = call(app, Method::POST, &format!("{base}/submit"), &student, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, listed) =
        call(app, Method::GET, "/api/v1/student/questions/sessions?status=completed", &student, None)
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total_count"], 1);
}

#[tokio::test]
async fn overdue_test_session_expires_when_read() {
    let ctx = test_support::setup_test_context().await;
    let crew = test_support::insert_crew(ctx.state.db()).await;
    let catalog = test_support::insert_catalog(ctx.state.db()).await;
    let question_ids = publish_three(ctx.state.db(), &crew.gatherer.id, &catalog).await;
    let student = test_support::bearer_token(&crew.student, ctx.state.settings());
    let app = &ctx.app;

    let session_id = Uuid::new_v4().to_string();
    repositories::study_sessions::create(
        ctx.state.db(),
        CreateSession {
            id: &session_id,
            student_id: &crew.student.id,
            mode: SessionMode::Test,
            question_ids: question_ids.clone(),
            filters: json!({}),
            time_limit_seconds: Some(300),
            now: primitive_now_utc() - Duration::hours(1),
        },
    )
    .await
    .expect("insert session");

    let (status, session) = call(
        app,
        Method::GET,
        &format!("/api/v1/student/questions/sessions/{session_id}"),
        &student,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {session}");
    assert_eq!(session["status"], "expired");
    assert_eq!(session["elapsed_seconds"], 300);
    assert!(session["completed_at"].is_string());

    let (status, _) = call(
        app,
        Method::POST,
        &format!("/api/v1/student/questions/sessions/{session_id}/answers"),
        &student,
        Some(json!({"question_id": question_ids[0], "answer": "B"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let stored = repositories::study_sessions::fetch_one_by_id(ctx.state.db(), &session_id)
        .await
        .expect("session");
    assert_eq!(stored.status, SessionStatus::Expired);
}

#[tokio::test]
async fn invalid_session_requests_are_rejected() {
    let ctx = test_support::setup_test_context().await;
    let crew = test_support::insert_crew(ctx.state.db()).await;
    let catalog = test_support::insert_catalog(ctx.state.db()).await;
    publish_three(ctx.state.db(), &crew.gatherer.id, &catalog).await;
    let student = test_support::bearer_token(&crew.student, ctx.state.settings());
    let other = test_support::insert_user(ctx.state.db(), "other", "Other Student", "password123").await;
    let other = test_support::bearer_token(&other, ctx.state.settings());
    let app = &ctx.app;

    for body in [
        json!({"mode": "study", "time_limit_minutes": 5}),
        json!({"mode": "test", "question_type": "Essay"}),
        json!({"mode": "study", "count": 0}),
        json!({"mode": "study", "count": 100000}),
    ] {
        let (status, response) =
            call(app, Method::POST, "/api/v1/student/questions/sessions", &student, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "response: {response}");
    }

    let (_, session) = call(
        app,
        Method::POST,
        "/api/v1/student/questions/sessions",
        &student,
        Some(json!({"mode": "study"})),
    )
    .await;
    let session_id = session["id"].as_str().expect("session id");
    let (status, _) = call(
        app,
        Method::GET,
        &format!("/api/v1/student/questions/sessions/{session_id}"),
        &other,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn student_flag_is_reviewed_by_processor() {
    let ctx = test_support::setup_test_context().await;
    let crew = test_support::insert_crew(ctx.state.db()).await;
    let catalog = test_support::insert_catalog(ctx.state.db()).await;
    let ids = publish_three(ctx.state.db(), &crew.gatherer.id, &catalog).await;
    let draft = insert_question(
        ctx.state.db(),
        &crew.gatherer.id,
        &catalog,
        "Unpublished",
        QuestionStatus::PendingGatherer,
    )
    .await;
    let student = test_support::bearer_token(&crew.student, ctx.state.settings());
    let processor = test_support::bearer_token(&crew.processor, ctx.state.settings());
    let app = &ctx.app;
    let flag_uri = format!("/api/v1/student/questions/{}/flag", ids[0]);

    let (status, flagged) =
        call(app, Method::POST, &flag_uri, &student, Some(json!({"reason": "Option B is wrong"}))).await;
    assert_eq!(status, StatusCode::OK, "response: {flagged}");
    assert_eq!(flagged["display_status"], "Under Review");

    let (status, _) =
        call(app, Method::POST, &flag_uri, &student, Some(json!({"reason": "Again"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        app,
        Method::POST,
        &format!("/api/v1/student/questions/{draft}/flag"),
        &student,
        Some(json!({"reason": "Not published"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, staff_view) = call(
        app,
        Method::GET,
        &format!("/api/v1/admin/questions/{}", ids[0]),
        &processor,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(staff_view["display_status"], "Flagged by Student");

    let (status, reviewed) = call(
        app,
        Method::POST,
        &format!("/api/v1/admin/questions/{}/flag/review", ids[0]),
        &processor,
        Some(json!({"decision": "approved"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {reviewed}");
    assert_eq!(reviewed["status"], "pending_gatherer");
    assert_eq!(reviewed["display_status"], "Needs Revision");

    let (status, flags) =
        call(app, Method::GET, "/api/v1/student/questions/flags", &student, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(flags[0]["id"], ids[0].as_str());
    assert_eq!(flags[0]["flag_status"], "approved");
    assert_eq!(flags[0]["display_status"], "Flag Accepted");
    assert_eq!(flags[0]["reason"], "Option B is wrong");

    let (_, listing) = call(app, Method::GET, "/api/v1/student/questions", &student, None).await;
    assert_eq!(listing["total_count"], 2);
}
