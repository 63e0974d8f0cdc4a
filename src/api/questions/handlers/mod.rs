mod creator;
mod explainer;
mod flags;
mod gatherer;
mod list;
mod processor;

pub(super) use creator::{complete_variants, create_variant};
pub(super) use explainer::{submit_explanation, update_explanation};
pub(super) use flags::{flag_question, review_flag};
pub(super) use gatherer::{create_question, submit_question, update_question};
pub(super) use list::{get_question, list_questions, question_history, question_stats, work_queue};
pub(super) use processor::{approve_question, assign_question, reject_question, return_question};
