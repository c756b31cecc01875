//! The `lessonquiz init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("lessonquiz.toml").exists() {
        println!("lessonquiz.toml already exists, skipping.");
    } else {
        std::fs::write("lessonquiz.toml", SAMPLE_CONFIG)?;
        println!("Created lessonquiz.toml");
    }

    std::fs::create_dir_all("quizzes")?;
    let example_path = Path::new("quizzes/example.toml");
    if example_path.exists() {
        println!("quizzes/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_QUIZ)?;
        println!("Created quizzes/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: lessonquiz validate --quiz quizzes/example.toml");
    println!("  2. Run: lessonquiz take --quiz quizzes/example.toml --store attempts.json");
    println!("  3. Set server_url and token in lessonquiz.toml to submit remotely");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# lessonquiz configuration

# Grading service used by `lessonquiz submit`.
# server_url = "https://lessons.example.org/api"
token = "${LESSONQUIZ_TOKEN}"

timeout_secs = 30
auto_retries = 1
retry_delay_ms = 500

default_user = "local"
output_dir = "./lessonquiz-results"
"#;

const EXAMPLE_QUIZ: &str = r#"[quiz]
lesson_id = "example"
version = 1
title = "Example Quiz"
time_limit_secs = 300
passing_score_percent = 70
max_attempts = 3

[[questions]]
id = "planets"
type = "mcq"
prompt = "Which planet is closest to the Sun?"
points = 1
correct_option = "mercury"
options = [
    { id = "venus", text = "Venus" },
    { id = "mercury", text = "Mercury" },
    { id = "mars", text = "Mars" },
]

[[questions]]
id = "water"
type = "short"
prompt = "What is the chemical formula of water?"
points = 2
correct_answer = "H2O"

[[questions]]
id = "reflection"
type = "short"
prompt = "In one sentence, what did you find hardest in this lesson?"
points = 1
# No correct_answer: queued for manual review.
"#;
