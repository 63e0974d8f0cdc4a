use crate::db::types::QuestionType;

/// Grades a submitted answer. `None` means the question cannot be graded
/// automatically (essays, or no key recorded).
pub(crate) fn check(
    question_type: QuestionType,
    correct_answer: Option<&str>,
    given: &str,
) -> Option<bool> {
    let key = correct_answer.map(str::trim).filter(|key| !key.is_empty())?;

    match question_type {
        QuestionType::Mcq => Some(key.eq_ignore_ascii_case(given.trim())),
        QuestionType::TrueFalse => {
            let expected = parse_bool(key)?;
            Some(parse_bool(given) == Some(expected))
        }
        QuestionType::ShortAnswer => Some(normalize(key) == normalize(given)),
        QuestionType::Essay => None,
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

fn normalize(value: &str) -> String {
    value.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mcq_compares_option_keys() {
        assert_eq!(check(QuestionType::Mcq, Some("B"), " b "), Some(true));
        assert_eq!(check(QuestionType::Mcq, Some("B"), "C"), Some(false));
    }

    #[test]
    fn true_false_accepts_synonyms() {
        assert_eq!(check(QuestionType::TrueFalse, Some("True"), "yes"), Some(true));
        assert_eq!(check(QuestionType::TrueFalse, Some("false"), "1"), Some(false));
        assert_eq!(check(QuestionType::TrueFalse, Some("false"), "F"), Some(true));
    }

    #[test]
    fn unparseable_true_false_answer_is_wrong() {
        assert_eq!(check(QuestionType::TrueFalse, Some("true"), "maybe"), Some(false));
    }

    #[test]
    fn short_answer_ignores_case_and_spacing() {
        assert_eq!(
            check(QuestionType::ShortAnswer, Some("Photo synthesis"), "photo   SYNTHESIS"),
            Some(true)
        );
    }

    #[test]
    fn essays_and_missing_keys_are_ungraded() {
        assert_eq!(check(QuestionType::Essay, Some("anything"), "anything"), None);
        assert_eq!(check(QuestionType::Mcq, None, "A"), None);
        assert_eq!(check(QuestionType::Mcq, Some("  "), "A"), None);
    }
}
