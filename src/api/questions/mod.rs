pub(crate) mod helpers;
mod handlers;
mod queries;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_questions).post(handlers::create_question))
        .route("/stats", get(handlers::question_stats))
        .route("/queue", get(handlers::work_queue))
        .route("/:question_id", get(handlers::get_question).patch(handlers::update_question))
        .route("/:question_id/history", get(handlers::question_history))
        // Gatherer
        .route("/:question_id/submit", post(handlers::submit_question))
        // Processor
        .route("/:question_id/approve", post(handlers::approve_question))
        .route("/:question_id/reject", post(handlers::reject_question))
        .route("/:question_id/return", post(handlers::return_question))
        .route("/:question_id/assign", post(handlers::assign_question))
        .route("/:question_id/flag/review", post(handlers::review_flag))
        // Creator
        .route("/:question_id/variants", post(handlers::create_variant))
        .route("/:question_id/variants/complete", post(handlers::complete_variants))
        // Explainer
        .route("/:question_id/explanation", put(handlers::update_explanation))
        .route("/:question_id/explanation/submit", post(handlers::submit_explanation))
        // Creator and explainer
        .route("/:question_id/flag", post(handlers::flag_question))
}
