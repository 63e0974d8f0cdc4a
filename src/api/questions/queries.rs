use serde::Deserialize;

use crate::db::types::QuestionType;

#[derive(Debug, Deserialize)]
pub(super) struct ListQuestionsQuery {
    /// Comma separated statuses, e.g. `pending_processor,rejected`.
    #[serde(default)]
    pub(super) status: Option<String>,
    #[serde(default)]
    #[serde(alias = "examId")]
    pub(super) exam_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "subjectId")]
    pub(super) subject_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "topicId")]
    pub(super) topic_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "questionType")]
    pub(super) question_type: Option<QuestionType>,
    #[serde(default)]
    pub(super) flagged: Option<bool>,
    #[serde(default)]
    #[serde(alias = "isVariant")]
    pub(super) is_variant: Option<bool>,
    #[serde(default)]
    pub(super) search: Option<String>,
    #[serde(default)]
    pub(super) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(super) limit: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct QueueQuery {
    #[serde(default)]
    pub(super) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(super) limit: i64,
}
