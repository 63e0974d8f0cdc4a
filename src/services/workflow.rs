//! Question review workflow.
//!
//! A question moves Gatherer → Processor → Creator → Processor → Explainer →
//! Processor → completed. The processor is the only gate between hand-offs, so
//! `pending_processor` carries a [`ReviewStage`] telling which hand-off is being
//! reviewed. Flags are an overlay on top of the state: a pending flag freezes
//! forward progress until a processor resolves it.
//!
//! Everything here is pure. Handlers load the row, call [`WorkflowState::apply`]
//! and persist the returned [`Transition`] inside one transaction.

use serde::Deserialize;
use thiserror::Error;

use crate::db::types::{FlagStatus, FlagType, HistoryAction, QuestionStatus, ReviewStage, UserRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkflowState {
    Draft,
    AwaitingProcessor(ReviewStage),
    WithCreator,
    WithExplainer,
    Completed,
    Rejected,
}

/// Where a processor sends a freshly gathered question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum NextReviewer {
    Creator,
    Explainer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkflowAction {
    Submit,
    Approve { next: Option<NextReviewer> },
    Reject,
    ReturnForRevision,
    CompleteVariants,
    UpdateExplanation,
    SubmitExplanation,
    CreateVariant,
    Flag(FlagType),
    ResolveFlag { approved: bool },
}

/// Facts about the row that influence legality but are not part of the state.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct QuestionFacts {
    pub(crate) flag_status: Option<FlagStatus>,
    pub(crate) has_explanation: bool,
    pub(crate) is_variant: bool,
}

impl QuestionFacts {
    pub(crate) fn has_pending_flag(&self) -> bool {
        self.flag_status == Some(FlagStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlagEffect {
    Keep,
    Raise(FlagType),
    Approve,
    Dismiss,
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Transition {
    pub(crate) from: WorkflowState,
    pub(crate) to: WorkflowState,
    pub(crate) flag: FlagEffect,
    pub(crate) history: HistoryAction,
}

impl Transition {
    pub(crate) fn changes_state(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum WorkflowError {
    #[error("cannot {action} a question in status {from}")]
    IllegalTransition { from: &'static str, action: &'static str },
    #[error("question has a pending flag that must be resolved first")]
    FlagPending,
    #[error("question already has a pending flag")]
    AlreadyFlagged,
    #[error("question has no pending flag")]
    NoPendingFlag,
    #[error("an explanation is required before submitting")]
    MissingExplanation,
    #[error("the next reviewer can only be chosen for newly gathered questions")]
    UnexpectedRouting,
    #[error("role {role} may not {action}")]
    RoleNotPermitted { role: &'static str, action: &'static str },
    #[error("stored workflow state is inconsistent: {0}")]
    Inconsistent(&'static str),
}

impl WorkflowAction {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve { .. } => "approve",
            Self::Reject => "reject",
            Self::ReturnForRevision => "return",
            Self::CompleteVariants => "complete_variants",
            Self::UpdateExplanation => "update_explanation",
            Self::SubmitExplanation => "submit_explanation",
            Self::CreateVariant => "create_variant",
            Self::Flag(_) => "flag",
            Self::ResolveFlag { .. } => "resolve_flag",
        }
    }

    fn moves_forward(&self) -> bool {
        matches!(
            self,
            Self::Submit
                | Self::Approve { .. }
                | Self::CompleteVariants
                | Self::SubmitExplanation
                | Self::CreateVariant
        )
    }
}

/// Role gate, independent of the question's state. Admins may do everything
/// except raise flags, which always belong to the role that found the problem.
pub(crate) fn role_permits(role: UserRole, action: &WorkflowAction) -> bool {
    use WorkflowAction as A;

    match (role, action) {
        (UserRole::Admin, A::Flag(_)) => false,
        (UserRole::Admin, _) => true,
        (UserRole::Gatherer, A::Submit) => true,
        (UserRole::Creator, A::Submit | A::CreateVariant | A::CompleteVariants) => true,
        (UserRole::Creator, A::Flag(FlagType::Creator)) => true,
        (UserRole::Explainer, A::UpdateExplanation | A::SubmitExplanation) => true,
        (UserRole::Explainer, A::Flag(FlagType::Explainer)) => true,
        (
            UserRole::Processor,
            A::Approve { .. } | A::Reject | A::ReturnForRevision | A::ResolveFlag { .. },
        ) => true,
        (UserRole::Student, A::Flag(FlagType::Student)) => true,
        _ => false,
    }
}

/// The flag type a role raises, if that role can raise flags at all.
pub(crate) fn flag_type_for(role: UserRole) -> Option<FlagType> {
    match role {
        UserRole::Student => Some(FlagType::Student),
        UserRole::Creator => Some(FlagType::Creator),
        UserRole::Explainer => Some(FlagType::Explainer),
        _ => None,
    }
}

pub(crate) fn authorize(role: UserRole, action: &WorkflowAction) -> Result<(), WorkflowError> {
    if role_permits(role, action) {
        Ok(())
    } else {
        Err(WorkflowError::RoleNotPermitted { role: role.as_str(), action: action.name() })
    }
}

impl WorkflowState {
    pub(crate) fn from_parts(
        status: QuestionStatus,
        stage: Option<ReviewStage>,
    ) -> Result<Self, WorkflowError> {
        Ok(match status {
            QuestionStatus::PendingGatherer => Self::Draft,
            QuestionStatus::PendingProcessor => Self::AwaitingProcessor(
                stage.ok_or(WorkflowError::Inconsistent("pending_processor without review stage"))?,
            ),
            QuestionStatus::PendingCreator => Self::WithCreator,
            QuestionStatus::PendingExplainer => Self::WithExplainer,
            QuestionStatus::Completed => Self::Completed,
            QuestionStatus::Rejected => Self::Rejected,
        })
    }

    pub(crate) fn into_parts(self) -> (QuestionStatus, Option<ReviewStage>) {
        match self {
            Self::Draft => (QuestionStatus::PendingGatherer, None),
            Self::AwaitingProcessor(stage) => (QuestionStatus::PendingProcessor, Some(stage)),
            Self::WithCreator => (QuestionStatus::PendingCreator, None),
            Self::WithExplainer => (QuestionStatus::PendingExplainer, None),
            Self::Completed => (QuestionStatus::Completed, None),
            Self::Rejected => (QuestionStatus::Rejected, None),
        }
    }

    pub(crate) fn status(self) -> QuestionStatus {
        self.into_parts().0
    }

    pub(crate) fn apply(
        self,
        action: WorkflowAction,
        facts: QuestionFacts,
    ) -> Result<Transition, WorkflowError> {
        use WorkflowAction as A;
        use WorkflowState as S;

        if action.moves_forward() && facts.has_pending_flag() {
            return Err(WorkflowError::FlagPending);
        }

        let illegal =
            || WorkflowError::IllegalTransition { from: self.status().as_str(), action: action.name() };
        let step = |to: WorkflowState,
                    flag: FlagEffect,
                    history: HistoryAction|
         -> Result<Transition, WorkflowError> {
            Ok(Transition { from: self, to, flag, history })
        };

        match (self, action) {
            (S::Draft | S::Rejected, A::Submit) => {
                let stage =
                    if facts.is_variant { ReviewStage::Variants } else { ReviewStage::Gathered };
                let flag = if facts.flag_status == Some(FlagStatus::Approved) {
                    FlagEffect::Clear
                } else {
                    FlagEffect::Keep
                };
                step(S::AwaitingProcessor(stage), flag, HistoryAction::Submitted)
            }

            (S::AwaitingProcessor(ReviewStage::Gathered), A::Approve { next }) => {
                let to = match next.unwrap_or(NextReviewer::Creator) {
                    NextReviewer::Creator => S::WithCreator,
                    NextReviewer::Explainer => S::WithExplainer,
                };
                step(to, FlagEffect::Keep, HistoryAction::Approved)
            }
            (S::AwaitingProcessor(_), A::Approve { next: Some(_) }) => {
                Err(WorkflowError::UnexpectedRouting)
            }
            (S::AwaitingProcessor(ReviewStage::Variants), A::Approve { next: None }) => {
                step(S::WithExplainer, FlagEffect::Keep, HistoryAction::Approved)
            }
            (S::AwaitingProcessor(ReviewStage::Explained), A::Approve { next: None }) => {
                step(S::Completed, FlagEffect::Keep, HistoryAction::Approved)
            }
            (S::AwaitingProcessor(_), A::Reject) => {
                step(S::Rejected, FlagEffect::Keep, HistoryAction::Rejected)
            }
            (S::AwaitingProcessor(_), A::ReturnForRevision) => {
                step(S::Draft, FlagEffect::Keep, HistoryAction::Returned)
            }

            (S::WithCreator, A::CreateVariant) => {
                if facts.is_variant {
                    return Err(illegal());
                }
                step(S::WithCreator, FlagEffect::Keep, HistoryAction::VariantCreated)
            }
            (S::WithCreator, A::CompleteVariants) => step(
                S::AwaitingProcessor(ReviewStage::Variants),
                FlagEffect::Keep,
                HistoryAction::VariantsCompleted,
            ),

            (S::WithExplainer, A::UpdateExplanation) => {
                step(S::WithExplainer, FlagEffect::Keep, HistoryAction::ExplanationUpdated)
            }
            (S::WithExplainer, A::SubmitExplanation) => {
                if !facts.has_explanation {
                    return Err(WorkflowError::MissingExplanation);
                }
                step(
                    S::AwaitingProcessor(ReviewStage::Explained),
                    FlagEffect::Keep,
                    HistoryAction::ExplanationSubmitted,
                )
            }

            (S::WithCreator, A::Flag(flag_type @ FlagType::Creator))
            | (S::WithExplainer, A::Flag(flag_type @ FlagType::Explainer))
            | (S::Completed, A::Flag(flag_type @ FlagType::Student)) => {
                if facts.has_pending_flag() {
                    return Err(WorkflowError::AlreadyFlagged);
                }
                step(self, FlagEffect::Raise(flag_type), HistoryAction::Flagged)
            }

            (_, A::ResolveFlag { approved }) => {
                if !facts.has_pending_flag() {
                    return Err(WorkflowError::NoPendingFlag);
                }
                if approved {
                    step(S::Draft, FlagEffect::Approve, HistoryAction::FlagApproved)
                } else {
                    step(self, FlagEffect::Dismiss, HistoryAction::FlagRejected)
                }
            }

            _ => Err(illegal()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use WorkflowAction as A;
    use WorkflowState as S;

    fn clean() -> QuestionFacts {
        QuestionFacts::default()
    }

    fn flagged(status: FlagStatus) -> QuestionFacts {
        QuestionFacts { flag_status: Some(status), ..QuestionFacts::default() }
    }

    fn run(state: S, actions: &[A]) -> S {
        let facts = QuestionFacts { has_explanation: true, ..QuestionFacts::default() };
        actions.iter().fold(state, |current, action| {
            current.apply(*action, facts).unwrap_or_else(|err| panic!("{action:?}: {err}")).to
        })
    }

    #[test]
    fn full_happy_path_reaches_completed() {
        let end = run(
            S::Draft,
            &[
                A::Submit,
                A::Approve { next: None },
                A::CreateVariant,
                A::CompleteVariants,
                A::Approve { next: None },
                A::UpdateExplanation,
                A::SubmitExplanation,
                A::Approve { next: None },
            ],
        );
        assert_eq!(end, S::Completed);
    }

    #[test]
    fn processor_can_skip_the_creator() {
        let transition = S::AwaitingProcessor(ReviewStage::Gathered)
            .apply(A::Approve { next: Some(NextReviewer::Explainer) }, clean())
            .unwrap();
        assert_eq!(transition.to, S::WithExplainer);
        assert_eq!(transition.history, HistoryAction::Approved);
    }

    #[test]
    fn routing_is_only_allowed_for_gathered_questions() {
        let err = S::AwaitingProcessor(ReviewStage::Variants)
            .apply(A::Approve { next: Some(NextReviewer::Creator) }, clean())
            .unwrap_err();
        assert_eq!(err, WorkflowError::UnexpectedRouting);
    }

    #[test]
    fn rejected_question_cannot_be_treated_as_pending_creator() {
        for action in [A::CreateVariant, A::CompleteVariants, A::Approve { next: None }] {
            let err = S::Rejected.apply(action, clean()).unwrap_err();
            assert!(matches!(err, WorkflowError::IllegalTransition { from: "rejected", .. }));
        }
    }

    #[test]
    fn rejected_question_can_be_resubmitted() {
        let transition = S::Rejected.apply(A::Submit, clean()).unwrap();
        assert_eq!(transition.to, S::AwaitingProcessor(ReviewStage::Gathered));
    }

    #[test]
    fn variants_resubmit_into_variant_review() {
        let facts = QuestionFacts { is_variant: true, ..QuestionFacts::default() };
        let transition = S::Draft.apply(A::Submit, facts).unwrap();
        assert_eq!(transition.to, S::AwaitingProcessor(ReviewStage::Variants));
    }

    #[test]
    fn variants_cannot_spawn_variants() {
        let facts = QuestionFacts { is_variant: true, ..QuestionFacts::default() };
        assert!(S::WithCreator.apply(A::CreateVariant, facts).is_err());
    }

    #[test]
    fn explanation_is_required_to_submit() {
        let err = S::WithExplainer.apply(A::SubmitExplanation, clean()).unwrap_err();
        assert_eq!(err, WorkflowError::MissingExplanation);
    }

    #[test]
    fn pending_flag_blocks_forward_progress_but_not_rejection() {
        let facts = flagged(FlagStatus::Pending);
        assert_eq!(
            S::AwaitingProcessor(ReviewStage::Gathered)
                .apply(A::Approve { next: None }, facts)
                .unwrap_err(),
            WorkflowError::FlagPending
        );
        assert_eq!(S::WithCreator.apply(A::CompleteVariants, facts).unwrap_err(), WorkflowError::FlagPending);
        assert_eq!(
            S::AwaitingProcessor(ReviewStage::Gathered).apply(A::Reject, facts).unwrap().to,
            S::Rejected
        );
    }

    #[test]
    fn flags_are_raised_only_where_the_role_works() {
        let transition = S::WithCreator.apply(A::Flag(FlagType::Creator), clean()).unwrap();
        assert_eq!(transition.to, S::WithCreator);
        assert_eq!(transition.flag, FlagEffect::Raise(FlagType::Creator));
        assert!(!transition.changes_state());

        assert!(S::WithCreator.apply(A::Flag(FlagType::Explainer), clean()).is_err());
        assert!(S::WithExplainer.apply(A::Flag(FlagType::Student), clean()).is_err());
        assert!(S::Completed.apply(A::Flag(FlagType::Student), clean()).is_ok());
    }

    #[test]
    fn second_flag_is_refused() {
        let err = S::Completed
            .apply(A::Flag(FlagType::Student), flagged(FlagStatus::Pending))
            .unwrap_err();
        assert_eq!(err, WorkflowError::AlreadyFlagged);
    }

    #[test]
    fn approving_a_flag_returns_question_to_gatherer() {
        let transition = S::Completed
            .apply(A::ResolveFlag { approved: true }, flagged(FlagStatus::Pending))
            .unwrap();
        assert_eq!(transition.to, S::Draft);
        assert_eq!(transition.flag, FlagEffect::Approve);

        let resubmit = S::Draft.apply(A::Submit, flagged(FlagStatus::Approved)).unwrap();
        assert_eq!(resubmit.flag, FlagEffect::Clear);
    }

    #[test]
    fn dismissing_a_flag_keeps_state() {
        let transition = S::WithExplainer
            .apply(A::ResolveFlag { approved: false }, flagged(FlagStatus::Pending))
            .unwrap();
        assert_eq!(transition.to, S::WithExplainer);
        assert_eq!(transition.flag, FlagEffect::Dismiss);
    }

    #[test]
    fn resolving_without_flag_fails() {
        let err = S::Completed.apply(A::ResolveFlag { approved: true }, clean()).unwrap_err();
        assert_eq!(err, WorkflowError::NoPendingFlag);
    }

    #[test]
    fn parts_roundtrip_and_inconsistency() {
        let states = [
            S::Draft,
            S::AwaitingProcessor(ReviewStage::Gathered),
            S::AwaitingProcessor(ReviewStage::Variants),
            S::AwaitingProcessor(ReviewStage::Explained),
            S::WithCreator,
            S::WithExplainer,
            S::Completed,
            S::Rejected,
        ];
        for state in states {
            let (status, stage) = state.into_parts();
            assert_eq!(S::from_parts(status, stage).unwrap(), state);
        }
        assert!(matches!(
            S::from_parts(QuestionStatus::PendingProcessor, None),
            Err(WorkflowError::Inconsistent(_))
        ));
    }

    #[test]
    fn role_gate() {
        assert!(role_permits(UserRole::Processor, &A::Approve { next: None }));
        assert!(!role_permits(UserRole::Gatherer, &A::Approve { next: None }));
        assert!(!role_permits(UserRole::Explainer, &A::CreateVariant));
        assert!(role_permits(UserRole::Admin, &A::CompleteVariants));
        assert!(!role_permits(UserRole::Admin, &A::Flag(FlagType::Student)));
        assert!(!role_permits(UserRole::Student, &A::Flag(FlagType::Creator)));
        assert_eq!(
            authorize(UserRole::Student, &A::Submit).unwrap_err().to_string(),
            "role student may not submit"
        );
    }
}
