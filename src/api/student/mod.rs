use axum::{
    routing::{get, post},
    Router,
};

use crate::core::state::AppState;

mod performance;
mod questions;
mod queries;
mod sessions;

#[cfg(test)]
mod tests;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(questions::list_questions))
        .route("/flags", get(questions::my_flags))
        .route("/performance", get(performance::my_performance))
        .route("/sessions", get(sessions::list_sessions).post(sessions::start_session))
        .route("/sessions/:session_id", get(sessions::get_session))
        .route("/sessions/:session_id/answers", post(sessions::submit_answer))
        .route("/sessions/:session_id/pause", post(sessions::pause_session))
        .route("/sessions/:session_id/resume", post(sessions::resume_session))
        .route("/sessions/:session_id/submit", post(sessions::submit_session))
        .route("/sessions/:session_id/review", get(sessions::review_session))
        .route("/:question_id/flag", post(questions::flag_question))
}
