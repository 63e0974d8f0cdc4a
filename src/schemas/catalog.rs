use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Exam, Subject, Topic};

/// Body for creating an exam, subject or topic.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CatalogEntryCreate {
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub(crate) name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) created_at: String,
}

impl From<Exam> for ExamResponse {
    fn from(exam: Exam) -> Self {
        Self { id: exam.id, name: exam.name, created_at: format_primitive(exam.created_at) }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubjectResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) name: String,
    pub(crate) created_at: String,
}

impl From<Subject> for SubjectResponse {
    fn from(subject: Subject) -> Self {
        Self {
            id: subject.id,
            exam_id: subject.exam_id,
            name: subject.name,
            created_at: format_primitive(subject.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TopicResponse {
    pub(crate) id: String,
    pub(crate) subject_id: String,
    pub(crate) name: String,
    pub(crate) created_at: String,
}

impl From<Topic> for TopicResponse {
    fn from(topic: Topic) -> Self {
        Self {
            id: topic.id,
            subject_id: topic.subject_id,
            name: topic.name,
            created_at: format_primitive(topic.created_at),
        }
    }
}
