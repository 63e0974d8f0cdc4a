use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{SessionAnswer, StudySession};
use crate::db::types::{QuestionType, SessionMode, SessionStatus};
use crate::schemas::question::StudentQuestionResponse;
use crate::services::performance::accuracy;
use crate::services::session_timing::SessionClock;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct SessionCreate {
    pub(crate) mode: SessionMode,
    #[serde(default)]
    #[serde(alias = "examId")]
    pub(crate) exam_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "subjectId")]
    pub(crate) subject_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "topicId")]
    pub(crate) topic_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "questionType")]
    pub(crate) question_type: Option<QuestionType>,
    #[serde(default)]
    #[validate(range(min = 1, message = "count must be positive"))]
    pub(crate) count: Option<u32>,
    #[serde(default)]
    #[serde(alias = "timeLimitMinutes")]
    pub(crate) time_limit_minutes: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AnswerSubmit {
    #[serde(alias = "questionId")]
    pub(crate) question_id: String,
    #[validate(length(min = 1, max = 10000, message = "answer must be 1-10000 characters"))]
    pub(crate) answer: String,
    #[serde(default)]
    #[serde(alias = "timeSpentSeconds")]
    pub(crate) time_spent_seconds: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    pub(crate) id: String,
    pub(crate) mode: SessionMode,
    pub(crate) status: SessionStatus,
    pub(crate) total_questions: i32,
    pub(crate) answered_count: i32,
    /// Withheld for running test sessions.
    pub(crate) correct_count: Option<i32>,
    pub(crate) score: Option<f64>,
    pub(crate) time_limit_seconds: Option<i32>,
    pub(crate) elapsed_seconds: i64,
    pub(crate) remaining_seconds: Option<i64>,
    pub(crate) filters: serde_json::Value,
    pub(crate) started_at: String,
    pub(crate) completed_at: Option<String>,
}

impl SessionResponse {
    pub(crate) fn build(session: StudySession, now: PrimitiveDateTime) -> Self {
        let clock = SessionClock::of(&session);
        let reveal = session.mode == SessionMode::Study || session.status.is_finished();
        let score = session.status.is_finished().then(|| {
            accuracy(i64::from(session.correct_count), i64::from(session.total_questions))
        });

        Self {
            id: session.id,
            mode: session.mode,
            status: session.status,
            total_questions: session.total_questions,
            answered_count: session.answered_count,
            correct_count: reveal.then_some(session.correct_count),
            score,
            time_limit_seconds: session.time_limit_seconds,
            elapsed_seconds: clock.elapsed_at(now),
            remaining_seconds: clock.remaining_at(now),
            filters: session.filters.0,
            started_at: format_primitive(session.started_at),
            completed_at: session.completed_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerView {
    pub(crate) question_id: String,
    pub(crate) answer: String,
    pub(crate) is_correct: Option<bool>,
    pub(crate) time_spent_seconds: i32,
    pub(crate) answered_at: String,
}

impl AnswerView {
    pub(crate) fn build(answer: SessionAnswer, reveal: bool) -> Self {
        Self {
            question_id: answer.question_id,
            answer: answer.answer,
            is_correct: if reveal { answer.is_correct } else { None },
            time_spent_seconds: answer.time_spent_seconds,
            answered_at: format_primitive(answer.answered_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionDetailResponse {
    #[serde(flatten)]
    pub(crate) session: SessionResponse,
    pub(crate) questions: Vec<StudentQuestionResponse>,
    pub(crate) answers: Vec<AnswerView>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerFeedback {
    pub(crate) question_id: String,
    pub(crate) accepted: bool,
    pub(crate) answered_count: i32,
    pub(crate) is_correct: Option<bool>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) explanation: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReviewItem {
    #[serde(flatten)]
    pub(crate) question: StudentQuestionResponse,
    pub(crate) correct_answer: Option<String>,
    pub(crate) explanation: Option<String>,
    pub(crate) answer: Option<String>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) time_spent_seconds: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionReviewResponse {
    pub(crate) session: SessionResponse,
    pub(crate) items: Vec<ReviewItem>,
}
