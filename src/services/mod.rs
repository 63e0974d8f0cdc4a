pub(crate) mod answer_check;
pub(crate) mod content_hash;
pub(crate) mod performance;
pub(crate) mod question_merge;
pub(crate) mod session_timing;
pub(crate) mod status_view;
pub(crate) mod workflow;
