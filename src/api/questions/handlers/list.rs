use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use sqlx::PgPool;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStaff;
use crate::api::pagination::{clamp_page, PaginatedResponse};
use crate::core::state::AppState;
use crate::db::models::{Question, User};
use crate::db::types::{QuestionStatus, UserRole};
use crate::repositories;
use crate::repositories::questions::{Assignment, QuestionFilters};
use crate::schemas::question::{
    HistoryEntryResponse, QuestionDetailResponse, QuestionResponse, QuestionStatsResponse,
};
use crate::services::question_merge::{merge_unique, parse_status_filter};

use super::super::helpers;
use super::super::queries::{ListQuestionsQuery, QueueQuery};

const MERGE_WINDOW: i64 = 1000;

pub(in crate::api::questions) async fn list_questions(
    Query(params): Query<ListQuestionsQuery>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<QuestionResponse>>, ApiError> {
    let (skip, limit) = clamp_page(params.skip, params.limit);
    let statuses = parse_status_filter(params.status.as_deref().unwrap_or_default())?;

    let filters = QuestionFilters {
        statuses: &statuses,
        exam_id: params.exam_id.as_deref(),
        subject_id: params.subject_id.as_deref(),
        topic_id: params.topic_id.as_deref(),
        question_type: params.question_type,
        pending_flag: params.flagged,
        is_variant: params.is_variant,
        search: params.search.as_deref(),
        created_by: (user.role == UserRole::Gatherer).then_some(user.id.as_str()),
        ..QuestionFilters::default()
    };

    let questions = repositories::questions::list(state.db(), &filters, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list questions"))?;
    let total_count = repositories::questions::count(state.db(), &filters)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count questions"))?;

    Ok(Json(PaginatedResponse {
        items: QuestionResponse::build_all(questions, user.role)?,
        total_count,
        skip,
        limit,
    }))
}

pub(in crate::api::questions) async fn question_stats(
    CurrentStaff(_user): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<QuestionStatsResponse>, ApiError> {
    let counts = repositories::questions::count_by_status(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count questions by status"))?;
    let pending_flags = repositories::questions::count_pending_flags(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count flags"))?;
    let variants = repositories::questions::count_variants(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count variants"))?;

    let mut by_status: BTreeMap<&'static str, i64> =
        QuestionStatus::ALL.into_iter().map(|status| (status.as_str(), 0)).collect();
    for (status, count) in &counts {
        by_status.insert(status.as_str(), *count);
    }

    Ok(Json(QuestionStatsResponse {
        total: counts.iter().map(|(_, count)| count).sum(),
        by_status,
        pending_flags,
        variants,
    }))
}

/// Questions waiting on the caller's role. Processors get their review queue
/// merged with every question carrying a pending flag, creators get their own
/// returned variants alongside the originals open to them.
pub(in crate::api::questions) async fn work_queue(
    Query(params): Query<QueueQuery>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<QuestionResponse>>, ApiError> {
    let (skip, limit) = clamp_page(params.skip, params.limit);
    let questions = queue_for(&state, &user, skip, limit).await?;
    let total_count = questions.len() as i64;

    Ok(Json(PaginatedResponse {
        items: QuestionResponse::build_all(questions, user.role)?,
        total_count,
        skip,
        limit,
    }))
}

async fn queue_for(
    state: &AppState,
    user: &User,
    skip: i64,
    limit: i64,
) -> Result<Vec<Question>, ApiError> {
    let pool = state.db();

    match user.role {
        UserRole::Gatherer => {
            let statuses = [QuestionStatus::PendingGatherer, QuestionStatus::Rejected];
            fetch(
                pool,
                QuestionFilters {
                    statuses: &statuses,
                    created_by: Some(&user.id),
                    ..QuestionFilters::default()
                },
                skip,
                limit,
            )
            .await
        }
        UserRole::Processor | UserRole::Admin => {
            let statuses = [QuestionStatus::PendingProcessor];
            merged(
                pool,
                [
                    QuestionFilters { statuses: &statuses, ..QuestionFilters::default() },
                    QuestionFilters { pending_flag: Some(true), ..QuestionFilters::default() },
                ],
                skip,
                limit,
            )
            .await
        }
        UserRole::Creator => {
            // Returned and rejected variants go back to the creator who wrote them.
            let originals = [QuestionStatus::PendingCreator];
            let own_variants = [QuestionStatus::PendingGatherer, QuestionStatus::Rejected];
            merged(
                pool,
                [
                    QuestionFilters {
                        statuses: &originals,
                        is_variant: Some(false),
                        open_to: Some((Assignment::Creator, &user.id)),
                        ..QuestionFilters::default()
                    },
                    QuestionFilters {
                        statuses: &own_variants,
                        is_variant: Some(true),
                        created_by: Some(&user.id),
                        ..QuestionFilters::default()
                    },
                ],
                skip,
                limit,
            )
            .await
        }
        UserRole::Explainer => {
            let statuses = [QuestionStatus::PendingExplainer];
            fetch(
                pool,
                QuestionFilters {
                    statuses: &statuses,
                    open_to: Some((Assignment::Explainer, &user.id)),
                    ..QuestionFilters::default()
                },
                skip,
                limit,
            )
            .await
        }
        UserRole::Student => Err(ApiError::forbidden("Staff access required")),
    }
}

/// Reads each source from the start so the merged order can be sliced.
async fn merged<const N: usize>(
    pool: &PgPool,
    sources: [QuestionFilters<'_>; N],
    skip: i64,
    limit: i64,
) -> Result<Vec<Question>, ApiError> {
    let window = skip.saturating_add(limit).min(MERGE_WINDOW);
    let mut lists = Vec::with_capacity(N);
    for filters in sources {
        lists.push(fetch(pool, filters, 0, window).await?);
    }
    Ok(merge_unique(lists)
        .into_iter()
        .skip(usize::try_from(skip).unwrap_or(usize::MAX))
        .take(usize::try_from(limit).unwrap_or_default())
        .collect())
}

async fn fetch(
    pool: &PgPool,
    filters: QuestionFilters<'_>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Question>, ApiError> {
    repositories::questions::list(pool, &filters, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load work queue"))
}

pub(in crate::api::questions) async fn get_question(
    Path(question_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<QuestionDetailResponse>, ApiError> {
    let question = helpers::fetch_question(state.db(), &question_id).await?;
    helpers::ensure_visible(&user, &question)?;

    let variants = repositories::questions::list_variants(state.db(), &question.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch variants"))?;
    let history = repositories::question_history::list_for_question(state.db(), &question.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question history"))?;

    Ok(Json(QuestionDetailResponse {
        question: QuestionResponse::build(question, user.role)?,
        variants: QuestionResponse::build_all(variants, user.role)?,
        history: history.into_iter().map(HistoryEntryResponse::from).collect(),
    }))
}

pub(in crate::api::questions) async fn question_history(
    Path(question_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<HistoryEntryResponse>>, ApiError> {
    let question = helpers::fetch_question(state.db(), &question_id).await?;
    helpers::ensure_visible(&user, &question)?;

    let history = repositories::question_history::list_for_question(state.db(), &question.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question history"))?;
    Ok(Json(history.into_iter().map(HistoryEntryResponse::from).collect()))
}
