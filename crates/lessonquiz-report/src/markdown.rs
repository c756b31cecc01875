//! Markdown result summary, for pasting into tickets and chat.

use lessonquiz_core::model::QuizVersion;
use lessonquiz_core::report::AttemptReport;

use crate::review::review_items;

/// Pipes and newlines would break a table row.
fn cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

pub fn generate_markdown(report: &AttemptReport, quiz: &QuizVersion) -> String {
    let grade = &report.grade;
    let mut md = String::new();

    md.push_str(&format!("# {}\n\n", report.quiz.title));
    md.push_str(&format!(
        "Lesson `{}` v{}",
        report.quiz.lesson_id, report.quiz.version
    ));
    if let Some(attempt) = &report.attempt {
        md.push_str(&format!(
            ", {} attempt #{}",
            attempt.user_id, attempt.attempt_number
        ));
    }
    md.push_str("\n\n");

    md.push_str(&format!(
        "**{}** with {}/{} points ({}%, pass mark {}%)\n\n",
        if grade.passed { "Passed" } else { "Not passed" },
        grade.score,
        grade.total_points,
        grade.percentage,
        report.quiz.passing_score_percent
    ));

    md.push_str("| # | Question | Your answer | Correct answer | Points | Result |\n");
    md.push_str("|---|----------|-------------|----------------|--------|--------|\n");
    for item in review_items(quiz, grade) {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {}/{} | {} |\n",
            item.number,
            cell(&item.prompt),
            item.your_answer.as_deref().map(cell).unwrap_or_else(|| "_none_".into()),
            item.correct_answer.as_deref().map(cell).unwrap_or_else(|| "-".into()),
            item.earned_points,
            item.points,
            item.verdict.label()
        ));
    }

    let pending = grade.pending_review().count();
    if pending > 0 {
        md.push_str(&format!(
            "\n{pending} answer(s) await manual review and are not yet scored.\n"
        ));
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::tests::{sample_grade, sample_quiz};

    #[test]
    fn markdown_has_one_row_per_question() {
        let quiz = sample_quiz();
        let report = AttemptReport::new(&quiz, vec![], sample_grade(&quiz));
        let md = generate_markdown(&report, &quiz);

        assert!(md.starts_with("# Capitals <Europe>\n"));
        assert!(md.contains("**Passed** with 3/5 points (60%, pass mark 60%)"));
        assert_eq!(md.lines().filter(|l| l.starts_with("| ")).count(), 5);
        assert!(md.contains("| 2 | Capital of Portugal? | _none_ | Lisbon | 0/1 | unanswered |"));
        assert!(md.contains("1 answer(s) await manual review"));
    }

    #[test]
    fn cells_escape_pipes() {
        assert_eq!(cell("a|b\nc"), "a\\|b c");
    }
}
