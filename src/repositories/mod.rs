pub(crate) mod catalog;
pub(crate) mod health;
pub(crate) mod question_history;
pub(crate) mod questions;
pub(crate) mod session_answers;
pub(crate) mod study_sessions;
pub(crate) mod users;
