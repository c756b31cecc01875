//! In-process question bank.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::BankError;
use crate::model::QuizVersion;
use crate::parser;
use crate::traits::QuestionBank;

/// Question bank holding every loaded version of each lesson's quiz.
#[derive(Debug, Default, Clone)]
pub struct InMemoryQuestionBank {
    quizzes: HashMap<String, Vec<QuizVersion>>,
}

impl InMemoryQuestionBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a quiz version, replacing any version with the same number.
    pub fn insert(&mut self, quiz: QuizVersion) {
        let versions = self.quizzes.entry(quiz.lesson_id.clone()).or_default();
        versions.retain(|v| v.version != quiz.version);
        versions.push(quiz);
        versions.sort_by_key(|v| v.version);
    }

    pub fn with_quiz(mut self, quiz: QuizVersion) -> Self {
        self.insert(quiz);
        self
    }

    /// Load a single quiz file or every quiz file under a directory.
    pub fn load(path: &Path) -> Result<Self> {
        let quizzes = if path.is_dir() {
            parser::load_quiz_directory(path)?
        } else {
            vec![parser::parse_quiz(path)?]
        };
        let mut bank = Self::new();
        for quiz in quizzes {
            bank.insert(quiz);
        }
        Ok(bank)
    }

    pub fn lessons(&self) -> impl Iterator<Item = &str> {
        self.quizzes.keys().map(String::as_str)
    }
}

#[async_trait]
impl QuestionBank for InMemoryQuestionBank {
    async fn quiz(&self, lesson_id: &str, version: Option<u32>) -> Result<QuizVersion, BankError> {
        let versions = self
            .quizzes
            .get(lesson_id)
            .ok_or_else(|| BankError::LessonNotFound(lesson_id.to_string()))?;

        let found = match version {
            Some(v) => versions.iter().find(|q| q.version == v),
            None => versions.last(),
        };

        found.cloned().ok_or_else(|| match version {
            Some(version) => BankError::VersionNotFound {
                lesson_id: lesson_id.to_string(),
                version,
            },
            None => BankError::LessonNotFound(lesson_id.to_string()),
        })
    }
}
