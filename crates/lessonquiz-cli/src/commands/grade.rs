//! The `lessonquiz grade` command: offline grading of an answers file.

use std::path::PathBuf;

use anyhow::{Context, Result};

use lessonquiz_core::grading;
use lessonquiz_core::parser;
use lessonquiz_core::report::AttemptReport;
use lessonquiz_report::{generate_html, generate_markdown};

use crate::display;

pub fn execute(
    quiz_path: PathBuf,
    answers_path: PathBuf,
    format: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let quiz = parser::parse_quiz(&quiz_path)?;
    let answers = parser::load_answers(&answers_path)?;

    let grade = grading::grade(&quiz, &answers)
        .with_context(|| format!("answers in {} were rejected", answers_path.display()))?;
    let report = AttemptReport::new(&quiz, answers, grade);

    let rendered = match format.as_str() {
        "text" => format!(
            "{} [{} v{}]\n{}\n",
            quiz.title,
            quiz.lesson_id,
            quiz.version,
            display::review_table(&quiz, &report.grade)
        ),
        "json" => serde_json::to_string_pretty(&report).context("failed to serialize report")?,
        "html" => generate_html(&report, &quiz),
        "markdown" | "md" => generate_markdown(&report, &quiz),
        other => anyhow::bail!("unknown format '{other}' (expected text, json, html, markdown)"),
    };

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Result written to: {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}
