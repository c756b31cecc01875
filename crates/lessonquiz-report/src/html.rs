//! HTML result page.
//!
//! Produces a self-contained HTML file with all CSS inlined.

use anyhow::{Context, Result};
use std::path::Path;

use lessonquiz_core::model::QuizVersion;
use lessonquiz_core::report::AttemptReport;

use crate::review::{review_items, Verdict};

/// Escape a string for safe HTML insertion.
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Generate a review page for a graded attempt.
pub fn generate_html(report: &AttemptReport, quiz: &QuizVersion) -> String {
    let grade = &report.grade;
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>Quiz results: {}</title>\n",
        html_escape(&report.quiz.title)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    html.push_str("<header>\n");
    html.push_str(&format!("<h1>{}</h1>\n", html_escape(&report.quiz.title)));
    let attempt = report
        .attempt
        .as_ref()
        .map(|a| format!(" | {} | attempt #{}", html_escape(&a.user_id), a.attempt_number))
        .unwrap_or_default();
    html.push_str(&format!(
        "<p class=\"meta\">Lesson <strong>{}</strong> v{}{} | {}</p>\n",
        html_escape(&report.quiz.lesson_id),
        report.quiz.version,
        attempt,
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    // Verdict banner
    let (class, verdict) = if grade.passed {
        ("pass", "Passed")
    } else {
        ("fail", "Not passed")
    };
    html.push_str(&format!(
        "<section class=\"score {class}\">\n<p class=\"verdict\">{verdict}</p>\n\
         <p><strong>{}</strong> / {} points | <strong>{}%</strong> (pass mark {}%)</p>\n",
        grade.score, grade.total_points, grade.percentage, report.quiz.passing_score_percent
    ));
    let pending = grade.pending_review().count();
    if pending > 0 {
        html.push_str(&format!(
            "<p class=\"note\">{pending} answer(s) awaiting manual review are not yet scored.</p>\n"
        ));
    }
    html.push_str("</section>\n");

    // Per-question review
    html.push_str("<section class=\"review\">\n<h2>Review</h2>\n");
    html.push_str("<table>\n");
    html.push_str("<thead><tr><th>#</th><th>Question</th><th>Your answer</th><th>Correct answer</th><th>Points</th><th>Result</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for item in review_items(quiz, grade) {
        let row_class = match item.verdict {
            Verdict::Correct => "pass",
            Verdict::PendingReview => "pending",
            Verdict::Incorrect | Verdict::Unanswered => "fail",
        };
        html.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}/{}</td><td>{}</td></tr>\n",
            row_class,
            item.number,
            html_escape(&item.prompt),
            item.your_answer
                .as_deref()
                .map(html_escape)
                .unwrap_or_else(|| "<em>no answer</em>".to_string()),
            item.correct_answer
                .as_deref()
                .map(html_escape)
                .unwrap_or_else(|| "-".to_string()),
            item.earned_points,
            item.points,
            item.verdict.label(),
        ));
    }
    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(report).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write a review page to a file.
pub fn write_html_report(report: &AttemptReport, quiz: &QuizVersion, path: &Path) -> Result<()> {
    let html = generate_html(report, quiz);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report to {}", path.display()))?;
    Ok(())
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; --pending: #fef9c3; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; --pending: #713f12; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta, .note { color: #6b7280; }
.score { padding: 1rem 1.5rem; border-radius: 8px; }
.verdict { font-size: 1.5rem; font-weight: bold; margin: 0; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
.pending { background: var(--pending); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
"#;
