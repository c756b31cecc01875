//! Deterministic quiz grading.
//!
//! [`grade`] is a pure function of the quiz version and the submitted
//! answers: no clock, no randomness, no attempt-count checks. The same inputs
//! always produce the same [`GradeResult`].

use std::collections::HashMap;

use crate::error::ValidationError;
use crate::model::{
    AnswerEntry, AnswerValue, GradeResult, Question, QuestionKind, QuestionResult, QuizVersion,
};

/// Grade a submission against a quiz version.
///
/// Every question of the quiz contributes its points to `total_points`,
/// answered or not. The submission is rejected as a whole if it names an
/// unknown or duplicate question, mismatches a question's type, or picks an
/// option the question does not have.
pub fn grade(quiz: &QuizVersion, answers: &[AnswerEntry]) -> Result<GradeResult, ValidationError> {
    let total_points = quiz.checked_total_points().ok_or_else(|| {
        ValidationError::Malformed(format!(
            "quiz {} v{} is worth more than {} points",
            quiz.lesson_id,
            quiz.version,
            u32::MAX
        ))
    })?;
    let submitted = validate_answers(quiz, answers)?;

    let results: Vec<QuestionResult> = quiz
        .questions
        .iter()
        .map(|q| grade_question(q, submitted.get(q.id.as_str()).copied()))
        .collect();

    // Earned points never exceed the checked total.
    let score = results
        .iter()
        .fold(0u32, |sum, r| sum.saturating_add(r.earned_points));
    let percentage = percentage(score, total_points);
    let passed = total_points > 0 && percentage >= u32::from(quiz.config.passing_score_percent);

    tracing::debug!(
        lesson = %quiz.lesson_id,
        version = quiz.version,
        score,
        total_points,
        percentage,
        passed,
        "graded submission"
    );

    Ok(GradeResult {
        score,
        total_points,
        percentage,
        passed,
        results,
    })
}

/// Check a submission against the quiz and index it by question id.
pub fn validate_answers<'a>(
    quiz: &QuizVersion,
    answers: &'a [AnswerEntry],
) -> Result<HashMap<&'a str, &'a AnswerValue>, ValidationError> {
    let mut by_question = HashMap::with_capacity(answers.len());

    for entry in answers {
        let question = quiz
            .question(&entry.question_id)
            .ok_or_else(|| ValidationError::UnknownQuestion(entry.question_id.clone()))?;

        if question.question_type() != entry.answer.question_type() {
            return Err(ValidationError::AnswerTypeMismatch {
                question_id: question.id.clone(),
                expected: question.question_type(),
            });
        }

        if let AnswerValue::Mcq { option_id } = &entry.answer {
            if !option_id.is_empty() && question.option_text(option_id).is_none() {
                return Err(ValidationError::UnknownOption {
                    question_id: question.id.clone(),
                    option_id: option_id.clone(),
                });
            }
        }

        if by_question
            .insert(entry.question_id.as_str(), &entry.answer)
            .is_some()
        {
            return Err(ValidationError::DuplicateQuestion(entry.question_id.clone()));
        }
    }

    Ok(by_question)
}

fn grade_question(question: &Question, answer: Option<&AnswerValue>) -> QuestionResult {
    let answer = answer.filter(|a| !a.is_empty());

    let (correct, correct_answer, manual_review) = match (&question.kind, answer) {
        (QuestionKind::Mcq {
            correct_option_id, ..
        }, Some(AnswerValue::Mcq { option_id })) => (
            option_id == correct_option_id,
            Some(correct_option_id.clone()),
            false,
        ),
        (QuestionKind::Mcq {
            correct_option_id, ..
        }, _) => (false, Some(correct_option_id.clone()), false),
        (QuestionKind::Short {
            correct_answer_text: Some(expected),
        }, Some(AnswerValue::Short { text })) => (
            normalize_text(text) == normalize_text(expected),
            Some(expected.clone()),
            false,
        ),
        (QuestionKind::Short {
            correct_answer_text: Some(expected),
        }, _) => (false, Some(expected.clone()), false),
        // No canonical answer: earns nothing automatically, queued for review.
        (QuestionKind::Short {
            correct_answer_text: None,
        }, _) => (false, None, true),
    };

    QuestionResult {
        question_id: question.id.clone(),
        correct,
        user_answer: answer.cloned(),
        correct_answer,
        earned_points: if correct { question.points } else { 0 },
        points: question.points,
        manual_review,
    }
}

/// Trim, case-fold, and collapse internal whitespace.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `round(score / total * 100)` with halves rounded up; 0 when `total` is 0.
pub fn percentage(score: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let score = u64::from(score);
    let total = u64::from(total);
    ((score * 200 + total) / (total * 2)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerOption, QuizConfig};

    fn mcq(id: &str, correct: &str, points: u32, order: i32) -> Question {
        Question {
            id: id.into(),
            prompt: format!("Question {id}"),
            kind: QuestionKind::Mcq {
                options: ["a", "b", "c"]
                    .iter()
                    .map(|o| AnswerOption {
                        id: (*o).into(),
                        text: o.to_uppercase(),
                    })
                    .collect(),
                correct_option_id: correct.into(),
            },
            points,
            order,
        }
    }

    fn short(id: &str, canonical: Option<&str>, points: u32, order: i32) -> Question {
        Question {
            id: id.into(),
            prompt: format!("Question {id}"),
            kind: QuestionKind::Short {
                correct_answer_text: canonical.map(String::from),
            },
            points,
            order,
        }
    }

    fn quiz(questions: Vec<Question>, passing: u8) -> QuizVersion {
        QuizVersion {
            lesson_id: "geo-101".into(),
            version: 1,
            title: "Capitals".into(),
            questions,
            config: QuizConfig {
                time_limit_seconds: None,
                passing_score_percent: passing,
                max_attempts: 0,
            },
        }
    }

    fn scenario_quiz() -> QuizVersion {
        quiz(
            vec![
                mcq("q1", "a", 1, 1),
                mcq("q2", "b", 1, 2),
                short("q3", Some("paris"), 2, 3),
            ],
            75,
        )
    }

    #[test]
    fn scenario_partial_credit_passes_at_threshold() {
        let answers = vec![
            AnswerEntry::new("q1", AnswerValue::mcq("a")),
            AnswerEntry::new("q2", AnswerValue::mcq("c")),
            AnswerEntry::new("q3", AnswerValue::short("Paris")),
        ];
        let result = grade(&scenario_quiz(), &answers).unwrap();
        assert_eq!(result.score, 3);
        assert_eq!(result.total_points, 4);
        assert_eq!(result.percentage, 75);
        assert!(result.passed);
        assert!(!result.results[1].correct);
        assert_eq!(result.results[1].correct_answer.as_deref(), Some("b"));
    }

    #[test]
    fn oversized_point_total_is_rejected() {
        let half = u32::MAX / 2 + 1;
        let q = quiz(
            vec![short("big1", Some("a"), half, 1), short("big2", Some("b"), half, 2)],
            50,
        );
        let answers = vec![AnswerEntry::new("big1", AnswerValue::short("a"))];
        assert!(matches!(grade(&q, &answers), Err(ValidationError::Malformed(_))));
        assert_eq!(q.total_points(), u32::MAX);
    }

    #[test]
    fn largest_representable_total_grades() {
        let q = quiz(
            vec![short("big1", Some("a"), u32::MAX - 1, 1), short("one", Some("b"), 1, 2)],
            50,
        );
        let answers = vec![AnswerEntry::new("big1", AnswerValue::short("a"))];
        let result = grade(&q, &answers).unwrap();
        assert_eq!(result.total_points, u32::MAX);
        assert_eq!(result.score, u32::MAX - 1);
        assert_eq!(result.percentage, 100);
        assert!(result.passed);
    }

    #[test]
    fn scenario_empty_submission_fails() {
        let result = grade(&scenario_quiz(), &[]).unwrap();
        assert_eq!(result.score, 0);
        assert_eq!(result.total_points, 4);
        assert_eq!(result.percentage, 0);
        assert!(!result.passed);
        assert!(result.results.iter().all(|r| r.user_answer.is_none()));
    }

    #[test]
    fn all_correct_is_one_hundred_percent() {
        let answers = vec![
            AnswerEntry::new("q1", AnswerValue::mcq("a")),
            AnswerEntry::new("q2", AnswerValue::mcq("b")),
            AnswerEntry::new("q3", AnswerValue::short("  PARIS ")),
        ];
        let result = grade(&scenario_quiz(), &answers).unwrap();
        assert_eq!(result.percentage, 100);
        assert!(result.passed);
    }

    #[test]
    fn zero_total_points_never_passes() {
        let result = grade(&quiz(vec![], 0), &[]).unwrap();
        assert_eq!(result.total_points, 0);
        assert_eq!(result.percentage, 0);
        assert!(!result.passed);
    }

    #[test]
    fn short_answer_normalization() {
        let q = quiz(vec![short("q1", Some("New  York City"), 1, 1)], 50);
        let answers = vec![AnswerEntry::new("q1", AnswerValue::short("\tnew york\n city "))];
        assert!(grade(&q, &answers).unwrap().results[0].correct);
    }

    #[test]
    fn short_without_canonical_needs_review() {
        let q = quiz(vec![short("q1", None, 3, 1), mcq("q2", "a", 1, 2)], 50);
        let answers = vec![
            AnswerEntry::new("q1", AnswerValue::short("an essay")),
            AnswerEntry::new("q2", AnswerValue::mcq("a")),
        ];
        let result = grade(&q, &answers).unwrap();
        assert_eq!(result.score, 1);
        assert_eq!(result.total_points, 4);
        assert_eq!(result.percentage, 25);
        assert!(result.results[0].manual_review);
        assert_eq!(result.pending_review().count(), 1);
    }

    #[test]
    fn duplicate_question_rejected() {
        let answers = vec![
            AnswerEntry::new("q1", AnswerValue::mcq("a")),
            AnswerEntry::new("q1", AnswerValue::mcq("b")),
        ];
        assert_eq!(
            grade(&scenario_quiz(), &answers).unwrap_err(),
            ValidationError::DuplicateQuestion("q1".into())
        );
    }

    #[test]
    fn unknown_question_rejected() {
        let answers = vec![AnswerEntry::new("q9", AnswerValue::mcq("a"))];
        assert_eq!(
            grade(&scenario_quiz(), &answers).unwrap_err(),
            ValidationError::UnknownQuestion("q9".into())
        );
    }

    #[test]
    fn type_mismatch_rejected() {
        let answers = vec![AnswerEntry::new("q1", AnswerValue::short("a"))];
        assert!(matches!(
            grade(&scenario_quiz(), &answers).unwrap_err(),
            ValidationError::AnswerTypeMismatch { .. }
        ));
    }

    #[test]
    fn unknown_option_rejected() {
        let answers = vec![AnswerEntry::new("q1", AnswerValue::mcq("z"))];
        assert!(matches!(
            grade(&scenario_quiz(), &answers).unwrap_err(),
            ValidationError::UnknownOption { .. }
        ));
    }

    #[test]
    fn blank_answers_count_as_unanswered() {
        let answers = vec![
            AnswerEntry::new("q1", AnswerValue::mcq("")),
            AnswerEntry::new("q3", AnswerValue::short("   ")),
        ];
        let result = grade(&scenario_quiz(), &answers).unwrap();
        assert_eq!(result.score, 0);
        assert_eq!(result.answered_count(), 0);
    }

    #[test]
    fn grading_is_deterministic() {
        let answers = vec![
            AnswerEntry::new("q3", AnswerValue::short("paris")),
            AnswerEntry::new("q1", AnswerValue::mcq("b")),
        ];
        let first = grade(&scenario_quiz(), &answers).unwrap();
        let second = grade(&scenario_quiz(), &answers).unwrap();
        assert_eq!(first, second);
        // Results follow quiz order, not submission order.
        assert_eq!(first.results[0].question_id, "q1");
    }

    #[test]
    fn percentage_rounding() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(5, 5), 100);
    }
}
