use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use lessonquiz_core::grading::{grade, normalize_text};
use lessonquiz_core::model::{
    AnswerEntry, AnswerOption, AnswerValue, Question, QuestionKind, QuizConfig, QuizVersion,
};
use lessonquiz_core::parser::parse_quiz_str;

fn make_quiz(n: usize) -> QuizVersion {
    let questions = (0..n)
        .map(|i| {
            let kind = if i % 2 == 0 {
                QuestionKind::Mcq {
                    options: (0..4)
                        .map(|o| AnswerOption {
                            id: format!("o{o}"),
                            text: format!("Option {o}"),
                        })
                        .collect(),
                    correct_option_id: "o1".into(),
                }
            } else {
                QuestionKind::Short {
                    correct_answer_text: Some("  The Quick  Brown Fox ".into()),
                }
            };
            Question {
                id: format!("q{i}"),
                prompt: format!("Question {i}"),
                kind,
                points: 1 + (i % 3) as u32,
                order: i as i32,
            }
        })
        .collect();

    QuizVersion {
        lesson_id: "bench".into(),
        version: 1,
        title: "Bench".into(),
        questions,
        config: QuizConfig::default(),
    }
}

fn make_answers(quiz: &QuizVersion) -> Vec<AnswerEntry> {
    quiz.questions
        .iter()
        .map(|q| match q.kind {
            QuestionKind::Mcq { .. } => AnswerEntry::new(q.id.clone(), AnswerValue::mcq("o1")),
            QuestionKind::Short { .. } => {
                AnswerEntry::new(q.id.clone(), AnswerValue::short("the quick brown   fox"))
            }
        })
        .collect()
}

fn bench_grade(c: &mut Criterion) {
    let mut group = c.benchmark_group("grade");

    for n in [10, 100, 1000] {
        let quiz = make_quiz(n);
        let answers = make_answers(&quiz);
        group.bench_function(format!("questions={n}"), |b| {
            b.iter(|| grade(black_box(&quiz), black_box(&answers)))
        });
    }

    let quiz = make_quiz(100);
    let none: Vec<AnswerEntry> = Vec::new();
    group.bench_function("unanswered", |b| {
        b.iter(|| grade(black_box(&quiz), black_box(&none)))
    });

    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_text");

    group.bench_function("short", |b| {
        b.iter(|| normalize_text(black_box("  Paris ")))
    });

    let long = "Lorem  ipsum\tdolor SIT amet ".repeat(50);
    group.bench_function("long", |b| b.iter(|| normalize_text(black_box(&long))));

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let toml = r#"
[quiz]
lesson_id = "geo-101"
title = "Capitals"
time_limit_secs = 300

[[questions]]
id = "q1"
type = "mcq"
prompt = "Capital of Spain?"
correct_option = "a"
options = [
    { id = "a", text = "Madrid" },
    { id = "b", text = "Lisbon" },
]

[[questions]]
id = "q2"
type = "short"
prompt = "Capital of France?"
correct_answer = "Paris"
points = 2
"#;

    c.bench_function("parse_quiz_str", |b| {
        b.iter(|| parse_quiz_str(black_box(toml), Path::new("bench.toml")))
    });
}

criterion_group!(benches, bench_grade, bench_normalize, bench_parse);
criterion_main!(benches);
