use std::collections::BTreeMap;

use crate::api::errors::ApiError;
use crate::db::types::QuestionType;

const MCQ_OPTION_KEYS: [&str; 4] = ["A", "B", "C", "D"];

/// Lower-cases a username and checks its alphabet.
pub(crate) fn normalize_username(username: &str) -> Result<String, ApiError> {
    let normalized = username.trim().to_ascii_lowercase();
    let valid = (3..=64).contains(&normalized.len())
        && normalized.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(normalized)
    } else {
        Err(ApiError::BadRequest(
            "Username must be 3-64 characters of letters, digits, '_', '-' or '.'".to_string(),
        ))
    }
}

/// Trims question text and rejects text that is blank once trimmed.
pub(crate) fn normalize_question_text(text: &str) -> Result<&str, ApiError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest("question_text must not be empty".to_string()));
    }
    Ok(text)
}

/// Keeps the option map consistent with the question type: MCQ uses keys A-D,
/// other types carry no options.
pub(crate) fn normalize_options(
    question_type: QuestionType,
    options: BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, ApiError> {
    if question_type != QuestionType::Mcq {
        return Ok(BTreeMap::new());
    }

    let mut normalized = BTreeMap::new();
    for (key, text) in options {
        let key = key.trim().to_ascii_uppercase();
        if !MCQ_OPTION_KEYS.contains(&key.as_str()) {
            return Err(ApiError::BadRequest(format!("Unknown option key '{key}'")));
        }
        let text = text.trim();
        if !text.is_empty() {
            normalized.insert(key, text.to_string());
        }
    }
    Ok(normalized)
}

/// Trims the answer key and brings it to the canonical spelling for the type.
pub(crate) fn normalize_answer(question_type: QuestionType, answer: Option<&str>) -> Option<String> {
    let answer = answer.map(str::trim).filter(|answer| !answer.is_empty())?;
    Some(match question_type {
        QuestionType::Mcq => answer.to_ascii_uppercase(),
        QuestionType::TrueFalse => answer.to_ascii_lowercase(),
        QuestionType::ShortAnswer | QuestionType::Essay => answer.to_string(),
    })
}

/// Checks that a question is complete enough to enter review.
pub(crate) fn ensure_submittable(
    question_type: QuestionType,
    options: &BTreeMap<String, String>,
    correct_answer: Option<&str>,
) -> Result<(), ApiError> {
    let answer = correct_answer.map(str::trim).filter(|answer| !answer.is_empty());
    match question_type {
        QuestionType::Mcq => {
            if options.len() < 2 {
                return Err(ApiError::BadRequest(
                    "Multiple choice questions need at least two options".to_string(),
                ));
            }
            let answer = answer.ok_or_else(|| {
                ApiError::BadRequest("Multiple choice questions need a correct answer".to_string())
            })?;
            if !options.contains_key(&answer.to_ascii_uppercase()) {
                return Err(ApiError::BadRequest(
                    "Correct answer must be one of the option keys".to_string(),
                ));
            }
        }
        QuestionType::TrueFalse => {
            let valid = answer
                .map(|value| matches!(value.to_ascii_lowercase().as_str(), "true" | "false"))
                .unwrap_or(false);
            if !valid {
                return Err(ApiError::BadRequest(
                    "True/false questions need 'true' or 'false' as the answer".to_string(),
                ));
            }
        }
        QuestionType::ShortAnswer => {
            if answer.is_none() {
                return Err(ApiError::BadRequest(
                    "Short answer questions need a correct answer".to_string(),
                ));
            }
        }
        QuestionType::Essay => {}
    }
    Ok(())
}
