//! lessonquiz CLI: take, grade, and submit lesson quizzes.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;
mod display;

#[derive(Parser)]
#[command(name = "lessonquiz", version, about = "Timed lesson quizzes with deterministic grading")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a quiz interactively on the terminal
    Take {
        /// Path to a .toml quiz file or a directory of quizzes
        #[arg(long)]
        quiz: PathBuf,

        /// Lesson to take when the quiz path holds several
        #[arg(long)]
        lesson: Option<String>,

        /// User taking the quiz (default: `default_user` from config)
        #[arg(long)]
        user: Option<String>,

        /// JSON file holding attempts across runs
        #[arg(long)]
        store: Option<PathBuf>,

        /// Directory for the attempt report (default: `output_dir` from config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Grade an answers file offline
    Grade {
        /// Path to the .toml quiz file
        #[arg(long)]
        quiz: PathBuf,

        /// JSON answers file: [{"questionId", "answer"}]
        #[arg(long)]
        answers: PathBuf,

        /// Output format: text, json, html, markdown
        #[arg(long, default_value = "text")]
        format: String,

        /// Write the rendered result here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Submit an attempt's answers to a grading server
    Submit {
        /// Lesson the attempt belongs to
        #[arg(long)]
        lesson: String,

        /// Attempt id (also the idempotency key)
        #[arg(long)]
        attempt: Uuid,

        /// JSON answers file
        #[arg(long)]
        answers: PathBuf,

        /// Server base URL (overrides config)
        #[arg(long)]
        server: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate quiz TOML files
    Validate {
        /// Path to a quiz file or directory
        #[arg(long)]
        quiz: PathBuf,
    },

    /// Create starter config and example quiz
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lessonquiz=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Take {
            quiz,
            lesson,
            user,
            store,
            output,
            config,
        } => commands::take::execute(quiz, lesson, user, store, output, config).await,
        Commands::Grade {
            quiz,
            answers,
            format,
            output,
        } => commands::grade::execute(quiz, answers, format, output),
        Commands::Submit {
            lesson,
            attempt,
            answers,
            server,
            config,
        } => commands::submit::execute(lesson, attempt, answers, server, config).await,
        Commands::Validate { quiz } => commands::validate::execute(quiz),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
