use std::collections::BTreeMap;

use serde::Serialize;

use crate::db::types::{SessionMode, SessionStatus};

/// One answered question, joined with the question's catalog entries.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct AnswerFact {
    pub(crate) subject_id: Option<String>,
    pub(crate) subject_name: Option<String>,
    pub(crate) topic_id: Option<String>,
    pub(crate) topic_name: Option<String>,
    pub(crate) is_correct: Option<bool>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct SessionFact {
    pub(crate) mode: SessionMode,
    pub(crate) status: SessionStatus,
    pub(crate) total_questions: i32,
    pub(crate) correct_count: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub(crate) struct Breakdown {
    pub(crate) id: Option<String>,
    pub(crate) name: String,
    pub(crate) answered: i64,
    pub(crate) graded: i64,
    pub(crate) correct: i64,
    pub(crate) accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct PerformanceSummary {
    pub(crate) total_answered: i64,
    pub(crate) graded: i64,
    pub(crate) correct: i64,
    pub(crate) accuracy: f64,
    pub(crate) sessions_completed: i64,
    pub(crate) average_test_score: Option<f64>,
    pub(crate) by_subject: Vec<Breakdown>,
    pub(crate) by_topic: Vec<Breakdown>,
}

const UNCATEGORIZED: &str = "Uncategorized";

/// Percentage rounded to two decimals; zero when nothing was graded.
pub(crate) fn accuracy(correct: i64, graded: i64) -> f64 {
    if graded == 0 {
        return 0.0;
    }
    (correct as f64 * 10_000.0 / graded as f64).round() / 100.0
}

pub(crate) fn summarize(answers: &[AnswerFact], sessions: &[SessionFact]) -> PerformanceSummary {
    let mut overall = Breakdown::default();
    let mut subjects = BTreeMap::new();
    let mut topics = BTreeMap::new();

    for answer in answers {
        for bucket in [
            &mut overall,
            bucket_for(
                &mut subjects,
                answer.subject_id.as_deref(),
                answer.subject_name.as_deref(),
            ),
            bucket_for(&mut topics, answer.topic_id.as_deref(), answer.topic_name.as_deref()),
        ] {
            bucket.answered += 1;
            if let Some(correct) = answer.is_correct {
                bucket.graded += 1;
                bucket.correct += i64::from(correct);
            }
        }
    }

    let finished: Vec<&SessionFact> =
        sessions.iter().filter(|session| session.status.is_finished()).collect();
    let test_scores: Vec<f64> = finished
        .iter()
        .filter(|session| session.mode == SessionMode::Test && session.total_questions > 0)
        .map(|session| {
            accuracy(i64::from(session.correct_count), i64::from(session.total_questions))
        })
        .collect();
    let average_test_score = (!test_scores.is_empty()).then(|| {
        let mean = test_scores.iter().sum::<f64>() / test_scores.len() as f64;
        (mean * 100.0).round() / 100.0
    });

    PerformanceSummary {
        total_answered: overall.answered,
        graded: overall.graded,
        correct: overall.correct,
        accuracy: accuracy(overall.correct, overall.graded),
        sessions_completed: finished.len() as i64,
        average_test_score,
        by_subject: finish(subjects),
        by_topic: finish(topics),
    }
}

// Catalog names are only unique within their parent, so buckets are keyed by id.
fn bucket_for<'m, 'k>(
    buckets: &'m mut BTreeMap<Option<&'k str>, Breakdown>,
    id: Option<&'k str>,
    name: Option<&str>,
) -> &'m mut Breakdown {
    buckets.entry(id).or_insert_with(|| Breakdown {
        id: id.map(str::to_string),
        name: name.unwrap_or(UNCATEGORIZED).to_string(),
        ..Breakdown::default()
    })
}

fn finish(buckets: BTreeMap<Option<&str>, Breakdown>) -> Vec<Breakdown> {
    let mut breakdowns: Vec<Breakdown> = buckets
        .into_values()
        .map(|bucket| Breakdown { accuracy: accuracy(bucket.correct, bucket.graded), ..bucket })
        .collect();
    breakdowns.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    breakdowns
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test catalog ids are the lower-cased names.
    fn answer(subject: Option<&str>, topic: Option<&str>, correct: Option<bool>) -> AnswerFact {
        AnswerFact {
            subject_id: subject.map(str::to_ascii_lowercase),
            subject_name: subject.map(str::to_string),
            topic_id: topic.map(str::to_ascii_lowercase),
            topic_name: topic.map(str::to_string),
            is_correct: correct,
        }
    }

    #[test]
    fn empty_history_has_zero_accuracy() {
        let summary = summarize(&[], &[]);
        assert_eq!(summary.total_answered, 0);
        assert_eq!(summary.accuracy, 0.0);
        assert_eq!(summary.average_test_score, None);
        assert!(summary.by_subject.is_empty());
    }

    #[test]
    fn breakdowns_group_by_subject_and_topic() {
        let answers = vec![
            answer(Some("Physics"), Some("Optics"), Some(true)),
            answer(Some("Physics"), Some("Optics"), Some(false)),
            answer(Some("Physics"), Some("Waves"), Some(true)),
            answer(Some("Biology"), None, None),
        ];
        let summary = summarize(&answers, &[]);

        assert_eq!(summary.total_answered, 4);
        assert_eq!(summary.graded, 3);
        assert_eq!(summary.correct, 2);
        assert_eq!(summary.accuracy, 66.67);

        let physics = summary.by_subject.iter().find(|b| b.name == "Physics").unwrap();
        assert_eq!((physics.answered, physics.correct), (3, 2));
        let biology = summary.by_subject.iter().find(|b| b.name == "Biology").unwrap();
        assert_eq!(biology.accuracy, 0.0);

        let names: Vec<_> = summary.by_topic.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Optics", "Uncategorized", "Waves"]);
    }

    #[test]
    fn same_named_topics_under_different_subjects_stay_apart() {
        let answers = vec![
            AnswerFact {
                topic_id: Some("physics-intro".to_string()),
                ..answer(Some("Physics"), Some("Introduction"), Some(true))
            },
            AnswerFact {
                topic_id: Some("biology-intro".to_string()),
                ..answer(Some("Biology"), Some("Introduction"), Some(false))
            },
        ];
        let summary = summarize(&answers, &[]);

        assert_eq!(summary.by_topic.len(), 2);
        let physics = summary
            .by_topic
            .iter()
            .find(|b| b.id.as_deref() == Some("physics-intro"))
            .unwrap();
        assert_eq!(
            (physics.name.as_str(), physics.answered, physics.accuracy),
            ("Introduction", 1, 100.0)
        );
        let biology = summary
            .by_topic
            .iter()
            .find(|b| b.id.as_deref() == Some("biology-intro"))
            .unwrap();
        assert_eq!(
            (biology.name.as_str(), biology.answered, biology.accuracy),
            ("Introduction", 1, 0.0)
        );
    }

    #[test]
    fn average_score_uses_finished_test_sessions_only() {
        let sessions = vec![
            SessionFact {
                mode: SessionMode::Test,
                status: SessionStatus::Completed,
                total_questions: 10,
                correct_count: 8,
            },
            SessionFact {
                mode: SessionMode::Test,
                status: SessionStatus::Expired,
                total_questions: 4,
                correct_count: 1,
            },
            SessionFact {
                mode: SessionMode::Test,
                status: SessionStatus::Active,
                total_questions: 10,
                correct_count: 0,
            },
            SessionFact {
                mode: SessionMode::Study,
                status: SessionStatus::Completed,
                total_questions: 5,
                correct_count: 5,
            },
        ];
        let summary = summarize(&[], &sessions);
        assert_eq!(summary.sessions_completed, 3);
        assert_eq!(summary.average_test_score, Some(52.5));
    }
}
