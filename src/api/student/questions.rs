use axum::{
    extract::{Path, Query, State},
    Json,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStudent;
use crate::api::pagination::{clamp_page, PaginatedResponse};
use crate::api::questions::helpers;
use crate::core::state::AppState;
use crate::db::types::{FlagType, QuestionStatus};
use crate::repositories;
use crate::repositories::questions::QuestionFilters;
use crate::schemas::question::{ReasonRequest, StudentFlagResponse, StudentQuestionResponse};

use super::queries::BrowseQuery;

/// Published questions, with answers and explanations withheld.
pub(super) async fn list_questions(
    Query(params): Query<BrowseQuery>,
    CurrentStudent(_user): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<StudentQuestionResponse>>, ApiError> {
    let (skip, limit) = clamp_page(params.skip, params.limit);
    let filters = QuestionFilters {
        statuses: &[QuestionStatus::Completed],
        exam_id: params.exam_id.as_deref(),
        subject_id: params.subject_id.as_deref(),
        topic_id: params.topic_id.as_deref(),
        question_type: params.question_type,
        search: params.search.as_deref(),
        ..QuestionFilters::default()
    };

    let questions = repositories::questions::list(state.db(), &filters, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list questions"))?;
    let total_count = repositories::questions::count(state.db(), &filters)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count questions"))?;

    let items = questions
        .into_iter()
        .map(StudentQuestionResponse::build)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(PaginatedResponse { items, total_count, skip, limit }))
}

pub(super) async fn flag_question(
    Path(question_id): Path<String>,
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<ReasonRequest>,
) -> Result<Json<StudentQuestionResponse>, ApiError> {
    payload.validate()?;
    let question =
        helpers::raise_flag(&state, &user, &question_id, FlagType::Student, &payload.reason).await?;
    Ok(Json(StudentQuestionResponse::build(question)?))
}

/// Questions the student has flagged and whose flag is still on record.
pub(super) async fn my_flags(
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentFlagResponse>>, ApiError> {
    let filters = QuestionFilters { flagged_by: Some(&user.id), ..QuestionFilters::default() };
    let questions = repositories::questions::list(state.db(), &filters, 0, 1000)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list flags"))?;

    let flags = questions
        .into_iter()
        .map(StudentFlagResponse::build)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(flags))
}
