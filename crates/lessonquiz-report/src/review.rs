//! Per-question review rows.
//!
//! A `GradeResult` carries ids (question ids, option ids); presenters need
//! prompts and display text. [`review_items`] joins the two.

use serde::Serialize;

use lessonquiz_core::model::{
    AnswerValue, GradeResult, Question, QuestionKind, QuestionResult, QuestionType, QuizVersion,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    Incorrect,
    Unanswered,
    PendingReview,
}

impl Verdict {
    pub fn label(self) -> &'static str {
        match self {
            Verdict::Correct => "correct",
            Verdict::Incorrect => "incorrect",
            Verdict::Unanswered => "unanswered",
            Verdict::PendingReview => "pending review",
        }
    }
}

/// One question as shown in a result review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewItem {
    /// 1-based position in the quiz.
    pub number: usize,
    pub question_id: String,
    pub question_type: QuestionType,
    pub prompt: String,
    /// The user's answer as display text.
    pub your_answer: Option<String>,
    pub correct_answer: Option<String>,
    pub earned_points: u32,
    pub points: u32,
    pub verdict: Verdict,
}

/// Build review rows in quiz order.
///
/// Results for questions the quiz no longer has are shown with their id as
/// the prompt.
pub fn review_items(quiz: &QuizVersion, grade: &GradeResult) -> Vec<ReviewItem> {
    grade
        .results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let question = quiz.question(&result.question_id);
            ReviewItem {
                number: quiz.position(&result.question_id).unwrap_or(i) + 1,
                question_id: result.question_id.clone(),
                question_type: question
                    .map(Question::question_type)
                    .or_else(|| result.user_answer.as_ref().map(AnswerValue::question_type))
                    .unwrap_or(QuestionType::Short),
                prompt: question
                    .map(|q| q.prompt.clone())
                    .unwrap_or_else(|| result.question_id.clone()),
                your_answer: result
                    .user_answer
                    .as_ref()
                    .filter(|a| !a.is_empty())
                    .map(|a| answer_text(question, a)),
                correct_answer: correct_text(question, result),
                earned_points: result.earned_points,
                points: result.points,
                verdict: verdict(result),
            }
        })
        .collect()
}

fn verdict(result: &QuestionResult) -> Verdict {
    if result.manual_review {
        Verdict::PendingReview
    } else if result.correct {
        Verdict::Correct
    } else if !result.user_answer.as_ref().is_some_and(|a| !a.is_empty()) {
        Verdict::Unanswered
    } else {
        Verdict::Incorrect
    }
}

fn answer_text(question: Option<&Question>, answer: &AnswerValue) -> String {
    match answer {
        AnswerValue::Mcq { option_id } => question
            .and_then(|q| q.option_text(option_id))
            .map(str::to_string)
            .unwrap_or_else(|| option_id.clone()),
        AnswerValue::Short { text } => text.trim().to_string(),
    }
}

fn correct_text(question: Option<&Question>, result: &QuestionResult) -> Option<String> {
    match question.map(|q| &q.kind) {
        Some(QuestionKind::Mcq {
            correct_option_id, ..
        }) => question
            .and_then(|q| q.option_text(correct_option_id))
            .map(str::to_string)
            .or_else(|| Some(correct_option_id.clone())),
        Some(QuestionKind::Short {
            correct_answer_text,
        }) => correct_answer_text.clone(),
        None => result.correct_answer.clone(),
    }
}
