use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{
    FlagStatus, FlagType, HistoryAction, QuestionStatus, QuestionType, ReviewStage, SessionMode,
    SessionStatus, UserRole,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) hashed_password: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Subject {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) name: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Topic {
    pub(crate) id: String,
    pub(crate) subject_id: String,
    pub(crate) name: String,
    pub(crate) created_at: PrimitiveDateTime,
}

/// A question row joined with the names of its catalog entries.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) question_text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) options: Json<BTreeMap<String, String>>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) explanation: Option<String>,
    pub(crate) exam_id: Option<String>,
    pub(crate) exam_name: Option<String>,
    pub(crate) subject_id: Option<String>,
    pub(crate) subject_name: Option<String>,
    pub(crate) topic_id: Option<String>,
    pub(crate) topic_name: Option<String>,
    pub(crate) status: QuestionStatus,
    pub(crate) review_stage: Option<ReviewStage>,
    pub(crate) is_flagged: bool,
    pub(crate) flag_type: Option<FlagType>,
    pub(crate) flag_status: Option<FlagStatus>,
    pub(crate) flag_reason: Option<String>,
    pub(crate) flagged_by: Option<String>,
    pub(crate) flagged_at: Option<PrimitiveDateTime>,
    pub(crate) rejection_reason: Option<String>,
    pub(crate) is_variant: bool,
    pub(crate) original_question_id: Option<String>,
    pub(crate) created_by: String,
    pub(crate) assigned_processor: Option<String>,
    pub(crate) assigned_creator: Option<String>,
    pub(crate) assigned_explainer: Option<String>,
    pub(crate) approved_by: Option<String>,
    pub(crate) content_hash: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct QuestionHistoryEntry {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) action: HistoryAction,
    pub(crate) performed_by: String,
    pub(crate) performed_by_name: Option<String>,
    pub(crate) from_status: Option<QuestionStatus>,
    pub(crate) to_status: Option<QuestionStatus>,
    pub(crate) note: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct StudySession {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) mode: SessionMode,
    pub(crate) status: SessionStatus,
    pub(crate) question_ids: Json<Vec<String>>,
    pub(crate) filters: Json<serde_json::Value>,
    pub(crate) time_limit_seconds: Option<i32>,
    pub(crate) elapsed_seconds: i32,
    pub(crate) last_resumed_at: Option<PrimitiveDateTime>,
    pub(crate) paused_at: Option<PrimitiveDateTime>,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
    pub(crate) total_questions: i32,
    pub(crate) answered_count: i32,
    pub(crate) correct_count: i32,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct SessionAnswer {
    pub(crate) session_id: String,
    pub(crate) question_id: String,
    pub(crate) answer: String,
    pub(crate) is_correct: Option<bool>,
    pub(crate) time_spent_seconds: i32,
    pub(crate) answered_at: PrimitiveDateTime,
}
