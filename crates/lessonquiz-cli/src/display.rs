//! Terminal rendering shared by the commands.

use std::time::Duration;

use comfy_table::{Cell, Table};

use lessonquiz_core::model::{GradeResult, Question, QuestionKind, QuizVersion};
use lessonquiz_core::session::SessionState;
use lessonquiz_report::review_items;

/// Per-question review table followed by the score line.
pub fn review_table(quiz: &QuizVersion, grade: &GradeResult) -> String {
    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Your answer", "Correct answer", "Points", "Result"]);

    for item in review_items(quiz, grade) {
        table.add_row(vec![
            Cell::new(item.number),
            Cell::new(&item.prompt),
            Cell::new(item.your_answer.as_deref().unwrap_or("-")),
            Cell::new(item.correct_answer.as_deref().unwrap_or("-")),
            Cell::new(format!("{}/{}", item.earned_points, item.points)),
            Cell::new(item.verdict.label()),
        ]);
    }

    format!("{table}\n{}", score_line(grade, quiz.config.passing_score_percent))
}

pub fn score_line(grade: &GradeResult, passing: u8) -> String {
    let mut line = format!(
        "Score: {}/{} ({}%, pass mark {}%) {}",
        grade.score,
        grade.total_points,
        grade.percentage,
        passing,
        if grade.passed { "PASSED" } else { "NOT PASSED" }
    );
    let pending = grade.pending_review().count();
    if pending > 0 {
        line.push_str(&format!("\n{pending} answer(s) pending manual review."));
    }
    line
}

/// Question results without quiz text, for remote submissions.
pub fn result_table(grade: &GradeResult) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Question", "Answer", "Points", "Correct"]);
    for r in &grade.results {
        table.add_row(vec![
            Cell::new(&r.question_id),
            Cell::new(
                r.user_answer
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "-".into()),
            ),
            Cell::new(format!("{}/{}", r.earned_points, r.points)),
            Cell::new(if r.manual_review {
                "review"
            } else if r.correct {
                "yes"
            } else {
                "no"
            }),
        ]);
    }
    table.to_string()
}

pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// The current question with its options and any recorded answer.
pub fn question_view(state: &SessionState) -> String {
    let Some(question) = state.current_question() else {
        return String::new();
    };
    let mut out = format!(
        "\nQuestion {}/{} [{}, {} pt{}]{}\n{}\n",
        state.current_index() + 1,
        state.total_questions(),
        question.question_type(),
        question.points,
        if question.points == 1 { "" } else { "s" },
        if state.is_answered(&question.id) { " (answered)" } else { "" },
        question.prompt
    );
    out.push_str(&options_view(question, state));
    out
}

fn options_view(question: &Question, state: &SessionState) -> String {
    let current = state.answer_for(&question.id).map(ToString::to_string);
    match &question.kind {
        QuestionKind::Mcq { options, .. } => options
            .iter()
            .map(|o| {
                let marker = if current.as_deref() == Some(o.id.as_str()) { '*' } else { ' ' };
                format!(" {marker} {}) {}\n", o.id, o.text)
            })
            .collect(),
        QuestionKind::Short { .. } => match current {
            Some(text) => format!("  your answer: {text}\n"),
            None => "  (type: a <your answer>)\n".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_is_minutes_and_seconds() {
        assert_eq!(format_remaining(Duration::from_secs(0)), "0:00");
        assert_eq!(format_remaining(Duration::from_secs(65)), "1:05");
        assert_eq!(format_remaining(Duration::from_millis(599_900)), "9:59");
    }

    #[test]
    fn score_line_mentions_pending_review() {
        let grade = GradeResult {
            score: 1,
            total_points: 2,
            percentage: 50,
            passed: false,
            results: vec![lessonquiz_core::model::QuestionResult {
                question_id: "q".into(),
                correct: false,
                user_answer: None,
                correct_answer: None,
                earned_points: 0,
                points: 1,
                manual_review: true,
            }],
        };
        let line = score_line(&grade, 70);
        assert!(line.contains("1/2 (50%, pass mark 70%) NOT PASSED"));
        assert!(line.contains("1 answer(s) pending manual review"));
    }
}
