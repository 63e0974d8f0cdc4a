use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Student,
    Gatherer,
    Processor,
    Creator,
    Explainer,
    Admin,
}

impl UserRole {
    pub(crate) fn is_staff(self) -> bool {
        !matches!(self, Self::Student)
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Gatherer => "gatherer",
            Self::Processor => "processor",
            Self::Creator => "creator",
            Self::Explainer => "explainer",
            Self::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "questiontype", rename_all = "snake_case")]
pub(crate) enum QuestionType {
    #[serde(alias = "MCQ")]
    Mcq,
    #[serde(alias = "TrueFalse")]
    TrueFalse,
    #[serde(alias = "ShortAnswer")]
    ShortAnswer,
    #[serde(alias = "Essay")]
    Essay,
}

/// Persisted workflow status. Interpreted through `services::workflow::WorkflowState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "questionstatus", rename_all = "snake_case")]
pub(crate) enum QuestionStatus {
    PendingGatherer,
    PendingProcessor,
    PendingCreator,
    PendingExplainer,
    Completed,
    Rejected,
}

impl QuestionStatus {
    pub(crate) const ALL: [QuestionStatus; 6] = [
        Self::PendingGatherer,
        Self::PendingProcessor,
        Self::PendingCreator,
        Self::PendingExplainer,
        Self::Completed,
        Self::Rejected,
    ];

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::PendingGatherer => "pending_gatherer",
            Self::PendingProcessor => "pending_processor",
            Self::PendingCreator => "pending_creator",
            Self::PendingExplainer => "pending_explainer",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

/// Which hand-off a `pending_processor` question represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "reviewstage", rename_all = "lowercase")]
pub(crate) enum ReviewStage {
    Gathered,
    Variants,
    Explained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "flagtype", rename_all = "lowercase")]
pub(crate) enum FlagType {
    Student,
    Creator,
    Explainer,
}

impl FlagType {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Creator => "Creator",
            Self::Explainer => "Explainer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "flagstatus", rename_all = "lowercase")]
pub(crate) enum FlagStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "historyaction", rename_all = "snake_case")]
pub(crate) enum HistoryAction {
    Created,
    Edited,
    Submitted,
    Approved,
    Rejected,
    Returned,
    Assigned,
    Flagged,
    FlagApproved,
    FlagRejected,
    VariantCreated,
    VariantsCompleted,
    ExplanationUpdated,
    ExplanationSubmitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "sessionmode", rename_all = "lowercase")]
pub(crate) enum SessionMode {
    Study,
    Test,
}

impl SessionMode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Study => "study",
            Self::Test => "test",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "sessionstatus", rename_all = "lowercase")]
pub(crate) enum SessionStatus {
    Active,
    Paused,
    Completed,
    Expired,
}

impl SessionStatus {
    pub(crate) fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_type_accepts_client_spellings() {
        let parsed: Vec<QuestionType> =
            serde_json::from_str(r#"["MCQ","TrueFalse","short_answer","Essay"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                QuestionType::Mcq,
                QuestionType::TrueFalse,
                QuestionType::ShortAnswer,
                QuestionType::Essay
            ]
        );
        assert_eq!(serde_json::to_string(&QuestionType::TrueFalse).unwrap(), "\"true_false\"");
    }

    #[test]
    fn question_status_parse_matches_serde_names() {
        for status in QuestionStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json.trim_matches('"'), status.as_str());
            assert_eq!(QuestionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(QuestionStatus::parse("approved"), None);
    }
}
