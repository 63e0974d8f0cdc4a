//! Role-specific display labels for a question's workflow position.

use crate::db::models::Question;
use crate::db::types::{FlagStatus, FlagType, ReviewStage, UserRole};
use crate::services::workflow::{WorkflowError, WorkflowState};

#[derive(Debug, Clone, Copy)]
pub(crate) struct StatusInput {
    pub(crate) state: WorkflowState,
    pub(crate) flag_type: Option<FlagType>,
    pub(crate) flag_status: Option<FlagStatus>,
    /// A processor left a rejection or return note on the question.
    pub(crate) has_revision_note: bool,
}

impl StatusInput {
    pub(crate) fn from_question(question: &Question) -> Result<Self, WorkflowError> {
        Ok(Self {
            state: WorkflowState::from_parts(question.status, question.review_stage)?,
            flag_type: question.flag_type,
            flag_status: question.flag_status,
            has_revision_note: question
                .rejection_reason
                .as_deref()
                .is_some_and(|reason| !reason.trim().is_empty()),
        })
    }
}

pub(crate) fn display_status(viewer: UserRole, input: &StatusInput) -> &'static str {
    if let Some(label) = flag_label(viewer, input) {
        return label;
    }

    match viewer {
        UserRole::Gatherer => gatherer_label(input),
        UserRole::Processor | UserRole::Admin => processor_label(input),
        UserRole::Creator => creator_label(input),
        UserRole::Explainer => explainer_label(input),
        UserRole::Student => match input.state {
            WorkflowState::Completed => "Available",
            _ => "Unavailable",
        },
    }
}

fn flag_label(viewer: UserRole, input: &StatusInput) -> Option<&'static str> {
    match (input.flag_status?, viewer) {
        (FlagStatus::Pending, UserRole::Student) => Some("Under Review"),
        (FlagStatus::Pending, _) => Some(match input.flag_type? {
            FlagType::Student => "Flagged by Student",
            FlagType::Creator => "Flagged by Creator",
            FlagType::Explainer => "Flagged by Explainer",
        }),
        (FlagStatus::Approved, UserRole::Student) => {
            (input.flag_type == Some(FlagType::Student)).then_some("Flag Accepted")
        }
        (FlagStatus::Approved, _) => Some("Needs Revision"),
        (FlagStatus::Rejected, _) => None,
    }
}

fn revision_or(input: &StatusInput, otherwise: &'static str) -> &'static str {
    if input.has_revision_note {
        "Returned for Revision"
    } else {
        otherwise
    }
}

fn gatherer_label(input: &StatusInput) -> &'static str {
    match input.state {
        WorkflowState::Draft => revision_or(input, "Draft"),
        WorkflowState::AwaitingProcessor(ReviewStage::Gathered) => "Pending Review",
        WorkflowState::AwaitingProcessor(_)
        | WorkflowState::WithCreator
        | WorkflowState::WithExplainer => "In Progress",
        WorkflowState::Completed => "Approved",
        WorkflowState::Rejected => "Rejected",
    }
}

fn processor_label(input: &StatusInput) -> &'static str {
    match input.state {
        WorkflowState::Draft => revision_or(input, "With Gatherer"),
        WorkflowState::AwaitingProcessor(ReviewStage::Gathered) => "Pending Review",
        WorkflowState::AwaitingProcessor(ReviewStage::Variants) => "Variants Ready for Review",
        WorkflowState::AwaitingProcessor(ReviewStage::Explained) => "Explanation Ready for Review",
        WorkflowState::WithCreator => "With Creator",
        WorkflowState::WithExplainer => "With Explainer",
        WorkflowState::Completed => "Approved",
        WorkflowState::Rejected => "Rejected",
    }
}

fn creator_label(input: &StatusInput) -> &'static str {
    match input.state {
        WorkflowState::Draft => revision_or(input, "Not Ready"),
        WorkflowState::AwaitingProcessor(ReviewStage::Gathered) => "Not Ready",
        WorkflowState::WithCreator => "Awaiting Variants",
        WorkflowState::AwaitingProcessor(ReviewStage::Variants) => "Variants Submitted",
        WorkflowState::WithExplainer
        | WorkflowState::AwaitingProcessor(ReviewStage::Explained)
        | WorkflowState::Completed => "Approved",
        WorkflowState::Rejected => "Rejected",
    }
}

fn explainer_label(input: &StatusInput) -> &'static str {
    match input.state {
        WorkflowState::Draft
        | WorkflowState::AwaitingProcessor(ReviewStage::Gathered | ReviewStage::Variants)
        | WorkflowState::WithCreator => "Not Ready",
        WorkflowState::WithExplainer => "Awaiting Explanation",
        WorkflowState::AwaitingProcessor(ReviewStage::Explained) => "Explanation Submitted",
        WorkflowState::Completed => "Approved",
        WorkflowState::Rejected => "Rejected",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(state: WorkflowState) -> StatusInput {
        StatusInput { state, flag_type: None, flag_status: None, has_revision_note: false }
    }

    fn with_flag(state: WorkflowState, flag_type: FlagType, status: FlagStatus) -> StatusInput {
        StatusInput { flag_type: Some(flag_type), flag_status: Some(status), ..plain(state) }
    }

    #[test]
    fn same_state_reads_differently_per_role() {
        let input = plain(WorkflowState::AwaitingProcessor(ReviewStage::Variants));
        assert_eq!(display_status(UserRole::Gatherer, &input), "In Progress");
        assert_eq!(display_status(UserRole::Processor, &input), "Variants Ready for Review");
        assert_eq!(display_status(UserRole::Creator, &input), "Variants Submitted");
        assert_eq!(display_status(UserRole::Explainer, &input), "Not Ready");
        assert_eq!(display_status(UserRole::Student, &input), "Unavailable");
    }

    #[test]
    fn admin_sees_processor_labels() {
        let input = plain(WorkflowState::WithExplainer);
        assert_eq!(
            display_status(UserRole::Admin, &input),
            display_status(UserRole::Processor, &input)
        );
    }

    #[test]
    fn returned_draft_is_labelled_for_revision() {
        let mut input = plain(WorkflowState::Draft);
        assert_eq!(display_status(UserRole::Gatherer, &input), "Draft");
        input.has_revision_note = true;
        assert_eq!(display_status(UserRole::Gatherer, &input), "Returned for Revision");
    }

    #[test]
    fn pending_flag_overrides_base_label() {
        let input = with_flag(WorkflowState::Completed, FlagType::Student, FlagStatus::Pending);
        assert_eq!(display_status(UserRole::Processor, &input), "Flagged by Student");
        assert_eq!(display_status(UserRole::Student, &input), "Under Review");

        let input = with_flag(WorkflowState::WithCreator, FlagType::Creator, FlagStatus::Pending);
        assert_eq!(display_status(UserRole::Creator, &input), "Flagged by Creator");
    }

    #[test]
    fn approved_flag_labels() {
        let input = with_flag(WorkflowState::Draft, FlagType::Student, FlagStatus::Approved);
        assert_eq!(display_status(UserRole::Student, &input), "Flag Accepted");
        assert_eq!(display_status(UserRole::Gatherer, &input), "Needs Revision");

        let input = with_flag(WorkflowState::Draft, FlagType::Explainer, FlagStatus::Approved);
        assert_eq!(display_status(UserRole::Student, &input), "Unavailable");
    }

    #[test]
    fn dismissed_flag_falls_back_to_base_label() {
        let input = with_flag(WorkflowState::Completed, FlagType::Student, FlagStatus::Rejected);
        assert_eq!(display_status(UserRole::Student, &input), "Available");
        assert_eq!(display_status(UserRole::Processor, &input), "Approved");
    }
}
