use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Question, QuestionHistoryEntry};
use crate::db::types::{
    FlagStatus, FlagType, HistoryAction, QuestionStatus, QuestionType, ReviewStage, UserRole,
};
use crate::schemas::NamedRef;
use crate::services::status_view::{display_status, StatusInput};
use crate::services::workflow::{NextReviewer, WorkflowError};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[serde(alias = "questionText")]
    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub(crate) question_text: String,
    #[serde(alias = "questionType")]
    pub(crate) question_type: QuestionType,
    #[serde(default)]
    pub(crate) options: BTreeMap<String, String>,
    #[serde(default)]
    #[serde(alias = "correctAnswer")]
    pub(crate) correct_answer: Option<String>,
    #[serde(default)]
    #[serde(alias = "examId")]
    pub(crate) exam_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "subjectId")]
    pub(crate) subject_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "topicId")]
    pub(crate) topic_id: Option<String>,
    /// Submit for review right away instead of keeping a draft.
    #[serde(default)]
    pub(crate) submit: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionUpdate {
    #[serde(default)]
    #[serde(alias = "questionText")]
    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub(crate) question_text: Option<String>,
    #[serde(default)]
    #[serde(alias = "questionType")]
    pub(crate) question_type: Option<QuestionType>,
    #[serde(default)]
    pub(crate) options: Option<BTreeMap<String, String>>,
    #[serde(default)]
    #[serde(alias = "correctAnswer")]
    pub(crate) correct_answer: Option<String>,
    #[serde(default)]
    #[serde(alias = "examId")]
    pub(crate) exam_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "subjectId")]
    pub(crate) subject_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "topicId")]
    pub(crate) topic_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApproveRequest {
    #[serde(default)]
    pub(crate) next: Option<NextReviewer>,
    #[serde(default)]
    pub(crate) note: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ReasonRequest {
    #[validate(length(min = 1, max = 2000, message = "reason must be 1-2000 characters"))]
    pub(crate) reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum AssignRole {
    Processor,
    Creator,
    Explainer,
}

impl AssignRole {
    pub(crate) fn user_role(self) -> UserRole {
        match self {
            Self::Processor => UserRole::Processor,
            Self::Creator => UserRole::Creator,
            Self::Explainer => UserRole::Explainer,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignRequest {
    pub(crate) role: AssignRole,
    #[serde(alias = "userId")]
    pub(crate) user_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum FlagDecision {
    Approved,
    Rejected,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FlagReviewRequest {
    pub(crate) decision: FlagDecision,
    #[serde(default)]
    pub(crate) note: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct VariantCreate {
    #[serde(alias = "questionText")]
    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub(crate) question_text: String,
    #[serde(default)]
    #[serde(alias = "questionType")]
    pub(crate) question_type: Option<QuestionType>,
    #[serde(default)]
    pub(crate) options: BTreeMap<String, String>,
    #[serde(default)]
    #[serde(alias = "correctAnswer")]
    pub(crate) correct_answer: Option<String>,
    #[serde(default)]
    pub(crate) explanation: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExplanationUpdate {
    #[validate(length(min = 1, message = "explanation must not be empty"))]
    pub(crate) explanation: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct FlagInfo {
    #[serde(rename = "type")]
    pub(crate) flag_type: Option<FlagType>,
    pub(crate) status: Option<FlagStatus>,
    pub(crate) reason: Option<String>,
    pub(crate) flagged_by: Option<String>,
    pub(crate) flagged_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) question_text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) options: BTreeMap<String, String>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) explanation: Option<String>,
    pub(crate) exam: Option<NamedRef>,
    pub(crate) subject: Option<NamedRef>,
    pub(crate) topic: Option<NamedRef>,
    pub(crate) status: QuestionStatus,
    pub(crate) review_stage: Option<ReviewStage>,
    pub(crate) display_status: &'static str,
    pub(crate) is_flagged: bool,
    pub(crate) flag: Option<FlagInfo>,
    pub(crate) rejection_reason: Option<String>,
    pub(crate) is_variant: bool,
    pub(crate) original_question_id: Option<String>,
    pub(crate) created_by: String,
    pub(crate) assigned_processor: Option<String>,
    pub(crate) assigned_creator: Option<String>,
    pub(crate) assigned_explainer: Option<String>,
    pub(crate) approved_by: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl QuestionResponse {
    pub(crate) fn build(question: Question, viewer: UserRole) -> Result<Self, WorkflowError> {
        let display_status = display_status(viewer, &StatusInput::from_question(&question)?);
        let flag = question.flag_status.map(|status| FlagInfo {
            flag_type: question.flag_type,
            status: Some(status),
            reason: question.flag_reason.clone(),
            flagged_by: question.flagged_by.clone(),
            flagged_at: question.flagged_at.map(format_primitive),
        });

        Ok(Self {
            id: question.id,
            question_text: question.question_text,
            question_type: question.question_type,
            options: question.options.0,
            correct_answer: question.correct_answer,
            explanation: question.explanation,
            exam: NamedRef::from_parts(question.exam_id, question.exam_name),
            subject: NamedRef::from_parts(question.subject_id, question.subject_name),
            topic: NamedRef::from_parts(question.topic_id, question.topic_name),
            status: question.status,
            review_stage: question.review_stage,
            display_status,
            is_flagged: question.is_flagged,
            flag,
            rejection_reason: question.rejection_reason,
            is_variant: question.is_variant,
            original_question_id: question.original_question_id,
            created_by: question.created_by,
            assigned_processor: question.assigned_processor,
            assigned_creator: question.assigned_creator,
            assigned_explainer: question.assigned_explainer,
            approved_by: question.approved_by,
            created_at: format_primitive(question.created_at),
            updated_at: format_primitive(question.updated_at),
        })
    }

    pub(crate) fn build_all(
        questions: Vec<Question>,
        viewer: UserRole,
    ) -> Result<Vec<Self>, WorkflowError> {
        questions.into_iter().map(|question| Self::build(question, viewer)).collect()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct HistoryEntryResponse {
    pub(crate) id: String,
    pub(crate) action: HistoryAction,
    pub(crate) performed_by: String,
    pub(crate) performed_by_name: Option<String>,
    pub(crate) from_status: Option<QuestionStatus>,
    pub(crate) to_status: Option<QuestionStatus>,
    pub(crate) note: Option<String>,
    pub(crate) created_at: String,
}

impl From<QuestionHistoryEntry> for HistoryEntryResponse {
    fn from(entry: QuestionHistoryEntry) -> Self {
        Self {
            id: entry.id,
            action: entry.action,
            performed_by: entry.performed_by,
            performed_by_name: entry.performed_by_name,
            from_status: entry.from_status,
            to_status: entry.to_status,
            note: entry.note,
            created_at: format_primitive(entry.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionDetailResponse {
    #[serde(flatten)]
    pub(crate) question: QuestionResponse,
    pub(crate) variants: Vec<QuestionResponse>,
    pub(crate) history: Vec<HistoryEntryResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionStatsResponse {
    pub(crate) total: i64,
    pub(crate) by_status: BTreeMap<&'static str, i64>,
    pub(crate) pending_flags: i64,
    pub(crate) variants: i64,
}

/// A question as a student sees it: no key, no explanation, no workflow data.
#[derive(Debug, Serialize)]
pub(crate) struct StudentQuestionResponse {
    pub(crate) id: String,
    pub(crate) question_text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) options: BTreeMap<String, String>,
    pub(crate) exam: Option<NamedRef>,
    pub(crate) subject: Option<NamedRef>,
    pub(crate) topic: Option<NamedRef>,
    pub(crate) display_status: &'static str,
}

impl StudentQuestionResponse {
    pub(crate) fn build(question: Question) -> Result<Self, WorkflowError> {
        let display_status =
            display_status(UserRole::Student, &StatusInput::from_question(&question)?);
        Ok(Self {
            id: question.id,
            question_text: question.question_text,
            question_type: question.question_type,
            options: question.options.0,
            exam: NamedRef::from_parts(question.exam_id, question.exam_name),
            subject: NamedRef::from_parts(question.subject_id, question.subject_name),
            topic: NamedRef::from_parts(question.topic_id, question.topic_name),
            display_status,
        })
    }
}

/// A flag the student raised, with the question it concerns.
#[derive(Debug, Serialize)]
pub(crate) struct StudentFlagResponse {
    #[serde(flatten)]
    pub(crate) question: StudentQuestionResponse,
    pub(crate) flag_status: Option<FlagStatus>,
    pub(crate) reason: Option<String>,
    pub(crate) flagged_at: Option<String>,
}

impl StudentFlagResponse {
    pub(crate) fn build(mut question: Question) -> Result<Self, WorkflowError> {
        let flag_status = question.flag_status;
        let reason = question.flag_reason.take();
        let flagged_at = question.flagged_at.map(format_primitive);
        Ok(Self { question: StudentQuestionResponse::build(question)?, flag_status, reason, flagged_at })
    }
}
