use std::collections::HashSet;

use thiserror::Error;
use time::PrimitiveDateTime;

use crate::db::models::Question;
use crate::db::types::QuestionStatus;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown question status: {0}")]
pub(crate) struct UnknownStatus(pub(crate) String);

/// Parses `status=a,b` into distinct statuses, keeping the caller's order.
/// Blank segments are ignored, so an empty filter means "no restriction".
pub(crate) fn parse_status_filter(raw: &str) -> Result<Vec<QuestionStatus>, UnknownStatus> {
    let mut statuses = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let status = QuestionStatus::parse(part).ok_or_else(|| UnknownStatus(part.to_string()))?;
        if !statuses.contains(&status) {
            statuses.push(status);
        }
    }
    Ok(statuses)
}

pub(crate) trait Listed {
    fn id(&self) -> &str;
    fn updated_at(&self) -> PrimitiveDateTime;
}

impl Listed for Question {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> PrimitiveDateTime {
        self.updated_at
    }
}

/// Concatenates several result pages, keeping the first copy of every id,
/// newest first.
pub(crate) fn merge_unique<T, I>(pages: I) -> Vec<T>
where
    T: Listed,
    I: IntoIterator<Item = Vec<T>>,
{
    let mut seen = HashSet::new();
    let mut merged: Vec<T> = pages
        .into_iter()
        .flatten()
        .filter(|item| seen.insert(item.id().to_string()))
        .collect();
    merged.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
    merged
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[derive(Debug)]
    struct Row(&'static str, PrimitiveDateTime, &'static str);

    impl Listed for Row {
        fn id(&self) -> &str {
            self.0
        }

        fn updated_at(&self) -> PrimitiveDateTime {
            self.1
        }
    }

    #[test]
    fn parses_comma_separated_statuses() {
        let parsed = parse_status_filter("pending_processor, completed,pending_processor,").unwrap();
        assert_eq!(parsed, vec![QuestionStatus::PendingProcessor, QuestionStatus::Completed]);
        assert!(parse_status_filter("").unwrap().is_empty());
    }

    #[test]
    fn rejects_unknown_status() {
        assert_eq!(
            parse_status_filter("completed,approved").unwrap_err(),
            UnknownStatus("approved".to_string())
        );
    }

    #[test]
    fn merge_dedupes_and_orders_newest_first() {
        let merged = merge_unique(vec![
            vec![
                Row("a", datetime!(2025-01-01 10:00), "queue"),
                Row("b", datetime!(2025-01-03 10:00), "queue"),
            ],
            vec![
                Row("a", datetime!(2025-01-01 10:00), "flagged"),
                Row("c", datetime!(2025-01-02 10:00), "flagged"),
            ],
        ]);
        let ids: Vec<_> = merged.iter().map(|row| row.0).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert_eq!(merged[2].2, "queue");
    }
}
