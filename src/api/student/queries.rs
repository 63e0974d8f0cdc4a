use serde::Deserialize;

use crate::db::types::{QuestionType, SessionStatus};

#[derive(Debug, Deserialize)]
pub(super) struct BrowseQuery {
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
    pub(super) search: Option<String>,
    #[serde(default)]
    pub(super) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(super) limit: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct SessionListQuery {
    #[serde(default)]
    pub(super) status: Option<SessionStatus>,
    #[serde(default)]
    pub(super) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(super) limit: i64,
}
