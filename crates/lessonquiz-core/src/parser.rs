//! TOML quiz parser.
//!
//! Loads quiz versions from TOML files and directories, and validates them.
//! Also reads JSON answer files used by offline grading and remote submission.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{
    AnswerEntry, AnswerOption, Question, QuestionKind, QuestionType, QuizConfig, QuizVersion,
};

/// Intermediate TOML structure for parsing quiz files.
#[derive(Debug, Deserialize)]
struct TomlQuizFile {
    quiz: TomlQuizHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlQuizHeader {
    lesson_id: String,
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    title: String,
    #[serde(default)]
    time_limit_secs: Option<u64>,
    #[serde(default = "default_passing")]
    passing_score_percent: u8,
    #[serde(default)]
    max_attempts: u32,
}

fn default_version() -> u32 {
    1
}

fn default_passing() -> u8 {
    70
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    #[serde(rename = "type")]
    question_type: String,
    prompt: String,
    #[serde(default = "default_points")]
    points: u32,
    #[serde(default)]
    order: Option<i32>,
    #[serde(default)]
    options: Vec<TomlOption>,
    #[serde(default)]
    correct_option: Option<String>,
    #[serde(default)]
    correct_answer: Option<String>,
}

fn default_points() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct TomlOption {
    id: String,
    text: String,
}

/// Parse a single TOML file into a `QuizVersion`.
pub fn parse_quiz(path: &Path) -> Result<QuizVersion> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read quiz file: {}", path.display()))?;

    parse_quiz_str(&content, path)
}

/// Parse a TOML string into a `QuizVersion` (useful for testing).
pub fn parse_quiz_str(content: &str, source_path: &Path) -> Result<QuizVersion> {
    let parsed: TomlQuizFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    anyhow::ensure!(
        parsed.quiz.passing_score_percent <= 100,
        "passing_score_percent must be between 0 and 100, got {}",
        parsed.quiz.passing_score_percent
    );

    let mut seen = HashSet::new();
    let mut questions = parsed
        .questions
        .into_iter()
        .enumerate()
        .map(|(index, q)| -> Result<Question> {
            anyhow::ensure!(seen.insert(q.id.clone()), "duplicate question id: {}", q.id);
            anyhow::ensure!(q.points > 0, "question {} must be worth at least 1 point", q.id);

            let question_type: QuestionType = q
                .question_type
                .parse()
                .map_err(|e: String| anyhow::anyhow!("question {}: {}", q.id, e))?;

            let kind = match question_type {
                QuestionType::Mcq => {
                    anyhow::ensure!(!q.options.is_empty(), "question {} has no options", q.id);
                    let correct_option_id = q.correct_option.with_context(|| {
                        format!("question {} is missing correct_option", q.id)
                    })?;
                    anyhow::ensure!(
                        q.options.iter().any(|o| o.id == correct_option_id),
                        "question {}: correct_option {} is not one of its options",
                        q.id,
                        correct_option_id
                    );
                    QuestionKind::Mcq {
                        options: q
                            .options
                            .into_iter()
                            .map(|o| AnswerOption {
                                id: o.id,
                                text: o.text,
                            })
                            .collect(),
                        correct_option_id,
                    }
                }
                QuestionType::Short => QuestionKind::Short {
                    correct_answer_text: q.correct_answer.filter(|a| !a.trim().is_empty()),
                },
            };

            Ok(Question {
                id: q.id,
                prompt: q.prompt,
                kind,
                points: q.points,
                order: q.order.unwrap_or(index as i32 + 1),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    // Stable sort keeps file order for equal `order` values.
    questions.sort_by_key(|q| q.order);

    anyhow::ensure!(
        questions
            .iter()
            .try_fold(0u32, |total, q| total.checked_add(q.points))
            .is_some(),
        "total points of {} exceed {}",
        source_path.display(),
        u32::MAX
    );

    Ok(QuizVersion {
        lesson_id: parsed.quiz.lesson_id,
        version: parsed.quiz.version,
        title: parsed.quiz.title,
        questions,
        config: QuizConfig {
            time_limit_seconds: parsed.quiz.time_limit_secs,
            passing_score_percent: parsed.quiz.passing_score_percent,
            max_attempts: parsed.quiz.max_attempts,
        },
    })
}

/// Recursively load all `.toml` quiz files from a directory.
pub fn load_quiz_directory(dir: &Path) -> Result<Vec<QuizVersion>> {
    let mut quizzes = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            quizzes.extend(load_quiz_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_quiz(&path) {
                Ok(quiz) => quizzes.push(quiz),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(quizzes)
}

/// A warning from quiz validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub question_id: Option<String>,
    pub message: String,
}

/// Check a parsed quiz for problems that do not prevent grading.
pub fn validate_quiz(quiz: &QuizVersion) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if quiz.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "quiz has no questions; every attempt will score 0%".into(),
        });
    }

    let mut orders = HashSet::new();
    for q in &quiz.questions {
        if !orders.insert(q.order) {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: format!("order {} is shared with another question", q.order),
            });
        }

        match &q.kind {
            QuestionKind::Short {
                correct_answer_text: None,
            } => warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: "no canonical answer; answers are queued for manual review and earn 0 points"
                    .into(),
            }),
            QuestionKind::Mcq { options, .. } => {
                let mut ids = HashSet::new();
                for option in options {
                    if !ids.insert(option.id.as_str()) {
                        warnings.push(ValidationWarning {
                            question_id: Some(q.id.clone()),
                            message: format!("duplicate option id: {}", option.id),
                        });
                    }
                }
                if options.len() < 2 {
                    warnings.push(ValidationWarning {
                        question_id: Some(q.id.clone()),
                        message: "multiple-choice question has a single option".into(),
                    });
                }
            }
            QuestionKind::Short { .. } => {}
        }
    }

    warnings
}

/// Answers file: either a bare array of entries or a submit-body envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum AnswersFile {
    Envelope { answers: Vec<AnswerEntry> },
    Entries(Vec<AnswerEntry>),
}

/// Read submitted answers from a JSON file.
pub fn load_answers(path: &Path) -> Result<Vec<AnswerEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read answers file: {}", path.display()))?;
    parse_answers_str(&content)
        .with_context(|| format!("failed to parse answers JSON: {}", path.display()))
}

pub fn parse_answers_str(content: &str) -> Result<Vec<AnswerEntry>> {
    let file: AnswersFile = serde_json::from_str(content)?;
    Ok(match file {
        AnswersFile::Envelope { answers } => answers,
        AnswersFile::Entries(entries) => entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnswerValue;
    use std::path::PathBuf;

    const SAMPLE: &str = r#"
[quiz]
lesson_id = "geo-101"
version = 2
title = "Capitals"
time_limit_secs = 300
passing_score_percent = 75
max_attempts = 3

[[questions]]
id = "q3"
type = "short"
prompt = "Capital of France?"
points = 2
order = 3
correct_answer = "paris"

[[questions]]
id = "q1"
type = "mcq"
prompt = "Capital of Spain?"
order = 1
correct_option = "a"
options = [{ id = "a", text = "Madrid" }, { id = "b", text = "Lisbon" }]

[[questions]]
id = "q2"
type = "mcq"
prompt = "Capital of Italy?"
order = 2
correct_option = "b"
options = [{ id = "a", text = "Milan" }, { id = "b", text = "Rome" }]
"#;

    fn path() -> PathBuf {
        PathBuf::from("test.toml")
    }

    #[test]
    fn parses_and_orders_questions() {
        let quiz = parse_quiz_str(SAMPLE, &path()).unwrap();
        assert_eq!(quiz.lesson_id, "geo-101");
        assert_eq!(quiz.version, 2);
        assert_eq!(quiz.config.time_limit_seconds, Some(300));
        assert_eq!(quiz.config.max_attempts, 3);
        let ids: Vec<&str> = quiz.questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, ["q1", "q2", "q3"]);
        assert_eq!(quiz.total_points(), 4);
        assert!(validate_quiz(&quiz).is_empty());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let toml = r#"
[quiz]
lesson_id = "x"

[[questions]]
id = "q1"
type = "short"
prompt = "a"

[[questions]]
id = "q1"
type = "short"
prompt = "b"
"#;
        let err = parse_quiz_str(toml, &path()).unwrap_err();
        assert!(err.to_string().contains("duplicate question id"));
    }

    #[test]
    fn rejects_correct_option_outside_options() {
        let toml = r#"
[quiz]
lesson_id = "x"

[[questions]]
id = "q1"
type = "mcq"
prompt = "a"
correct_option = "z"
options = [{ id = "a", text = "A" }]
"#;
        assert!(parse_quiz_str(toml, &path()).is_err());
    }

    #[test]
    fn rejects_zero_points_and_bad_threshold() {
        let zero = r#"
[quiz]
lesson_id = "x"

[[questions]]
id = "q1"
type = "short"
prompt = "a"
points = 0
"#;
        assert!(parse_quiz_str(zero, &path()).is_err());

        let threshold = "[quiz]\nlesson_id = \"x\"\npassing_score_percent = 120\n";
        assert!(parse_quiz_str(threshold, &path()).is_err());
    }

    #[test]
    fn rejects_point_total_beyond_u32() {
        let toml = r#"
[quiz]
lesson_id = "x"

[[questions]]
id = "q1"
type = "short"
prompt = "a"
points = 2147483648

[[questions]]
id = "q2"
type = "short"
prompt = "b"
points = 2147483648
"#;
        let err = parse_quiz_str(toml, &path()).unwrap_err();
        assert!(err.to_string().contains("total points"));
    }

    #[test]
    fn warns_on_manual_review_questions() {
        let toml = r#"
[quiz]
lesson_id = "x"

[[questions]]
id = "essay"
type = "short"
prompt = "Explain"
correct_answer = "  "
"#;
        let quiz = parse_quiz_str(toml, &path()).unwrap();
        let warnings = validate_quiz(&quiz);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].question_id.as_deref(), Some("essay"));
    }

    #[test]
    fn loads_directory_and_skips_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("geo.toml"), SAMPLE).unwrap();
        std::fs::write(dir.path().join("broken.toml"), "not = [valid").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let quizzes = load_quiz_directory(dir.path()).unwrap();
        assert_eq!(quizzes.len(), 1);
    }

    #[test]
    fn answers_file_shapes() {
        let bare = r#"[{"questionId": "q1", "answer": {"type": "MCQ", "optionId": "a"}}]"#;
        let envelope = r#"{"answers": [{"questionId": "q3", "answer": {"type": "SHORT", "text": "Paris"}}]}"#;

        let entries = parse_answers_str(bare).unwrap();
        assert_eq!(entries[0].answer, AnswerValue::mcq("a"));

        let entries = parse_answers_str(envelope).unwrap();
        assert_eq!(entries[0].question_id, "q3");
    }
}
