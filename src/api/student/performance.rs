use axum::{extract::State, Json};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStudent;
use crate::core::state::AppState;
use crate::repositories;
use crate::services::performance::{self, PerformanceSummary};

pub(super) async fn my_performance(
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<PerformanceSummary>, ApiError> {
    let answers = repositories::session_answers::list_facts_by_student(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load answers"))?;
    let sessions = repositories::study_sessions::list_facts_by_student(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load sessions"))?;

    Ok(Json(performance::summarize(&answers, &sessions)))
}
