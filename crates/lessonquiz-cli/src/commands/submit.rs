//! The `lessonquiz submit` command: send answers to a remote grading service.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use uuid::Uuid;

use lessonquiz_client::{load_config_from, HttpTransport};
use lessonquiz_core::coordinator::SubmissionCoordinator;
use lessonquiz_core::error::SubmitError;
use lessonquiz_core::parser;
use lessonquiz_core::traits::SubmitRequest;

use crate::display;

pub async fn execute(
    lesson: String,
    attempt: Uuid,
    answers_path: PathBuf,
    server: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config_from(config_path.as_deref())?;
    if let Some(server) = server {
        config.server_url = Some(server);
    }
    tracing::debug!(?config, "client configuration");

    let answers = parser::load_answers(&answers_path)?;
    let transport = HttpTransport::from_config(&config)?;
    let coordinator = SubmissionCoordinator::new(Arc::new(transport), config.submit_config());

    let request = SubmitRequest {
        lesson_id: lesson,
        attempt_id: attempt,
        answers,
    };

    let grade = match coordinator.submit(&request).await {
        Ok(grade) => {
            println!("Attempt {attempt} graded.");
            grade
        }
        Err(SubmitError::AlreadySubmitted(original)) => {
            println!("Attempt {attempt} was already submitted; showing the original result.");
            *original
        }
        Err(e) => {
            let hint = if e.is_retryable() {
                " (answers unchanged; safe to retry with the same attempt id)"
            } else {
                ""
            };
            return Err(e).with_context(|| format!("submission of attempt {attempt} failed{hint}"));
        }
    };

    println!("{}", display::result_table(&grade));
    println!(
        "Score: {}/{} ({}%) {}",
        grade.score,
        grade.total_points,
        grade.percentage,
        if grade.passed { "PASSED" } else { "NOT PASSED" }
    );

    Ok(())
}
