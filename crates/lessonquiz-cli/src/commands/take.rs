//! The `lessonquiz take` command: an interactive, optionally timed session.
//!
//! Reads one command per line from stdin while the countdown runs in the
//! background. Grading happens in process against the quiz files; attempts
//! persist to `--store` so quotas, resumption and first-submission-wins hold
//! across runs, including runs that overlap.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use lessonquiz_client::load_config_from;
use lessonquiz_core::bank::InMemoryQuestionBank;
use lessonquiz_core::controller::SessionController;
use lessonquiz_core::coordinator::SubmissionCoordinator;
use lessonquiz_core::model::{AnswerEntry, AnswerValue, QuestionType};
use lessonquiz_core::report::AttemptReport;
use lessonquiz_core::service::{LocalTransport, QuizService};
use lessonquiz_core::session::{SessionError, SessionPhase, TickOutcome};
use lessonquiz_core::store::{FileAttemptStore, InMemoryAttemptStore};
use lessonquiz_core::traits::AttemptStore;

use crate::display;

const HELP: &str = "Commands:
  n / p        next / previous question
  g <N>        go to question N
  a <answer>   answer the current question (option id or text)
  c            clear the current answer
  l            list questions and what you answered
  s            submit (asks for confirmation if some are unanswered)
  s!           submit without confirmation
  q            quit; the attempt stays open and can be resumed
  ?            show this help";

enum Flow {
    Continue,
    Quit,
}

pub async fn execute(
    quiz_path: PathBuf,
    lesson: Option<String>,
    user: Option<String>,
    store_path: Option<PathBuf>,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let user = user.unwrap_or_else(|| config.default_user.clone());

    let bank = InMemoryQuestionBank::load(&quiz_path)?;
    let lesson = match lesson {
        Some(lesson) => lesson,
        None => {
            let mut lessons: Vec<&str> = bank.lessons().collect();
            lessons.sort_unstable();
            match lessons.as_slice() {
                [only] => only.to_string(),
                [] => anyhow::bail!("no quizzes found in {}", quiz_path.display()),
                many => anyhow::bail!(
                    "{} holds several lessons ({}); pick one with --lesson",
                    quiz_path.display(),
                    many.join(", ")
                ),
            }
        }
    };

    let store: Arc<dyn AttemptStore> = match store_path {
        Some(path) => Arc::new(FileAttemptStore::new(path)),
        None => Arc::new(InMemoryAttemptStore::new()),
    };
    let service = QuizService::new(Arc::new(bank), store.clone());
    let started = service
        .start_attempt(&user, &lesson)
        .await
        .with_context(|| format!("could not start an attempt at {lesson} for {user}"))?;

    let quiz = started.quiz.clone();
    let attempt_id = started.attempt.id;
    let transport = LocalTransport::new(service, user.clone());
    let mut controller = SessionController::new(SubmissionCoordinator::new(
        Arc::new(transport),
        config.submit_config(),
    ));
    controller.start(started.quiz, &started.attempt)?;

    println!(
        "{} [{} v{}], attempt #{} for {}",
        quiz.title, quiz.lesson_id, quiz.version, started.attempt.attempt_number, user
    );
    if let Some(remaining) = controller.remaining() {
        println!("Time remaining: {}", display::format_remaining(remaining));
    }
    println!("{HELP}");
    println!("{}", display::question_view(controller.state()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if controller.state().grade().is_some() {
            break;
        }

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read input")? else {
                    break;
                };
                if let Flow::Quit = handle_command(&mut controller, line.trim()).await {
                    break;
                }
            }
            Some(event) = controller.next_timer_event() => {
                match controller.handle_timer_event(event).await? {
                    TickOutcome::Running { remaining } => announce(remaining),
                    TickOutcome::Expired => println!("\nTime is up."),
                    TickOutcome::Idle => {}
                }
                if *controller.state().phase() == SessionPhase::Expired {
                    if let Some(e) = controller.state().last_error() {
                        println!("Automatic submission failed: {e}. Type s to retry.");
                    }
                }
            }
        }
    }

    let Some(grade) = controller.state().grade().cloned() else {
        println!("\nAttempt {attempt_id} left in progress; run take again to resume it.");
        return Ok(());
    };

    println!("\n{}", display::review_table(&quiz, &grade));

    let attempt = store
        .get_attempt(attempt_id)
        .await?
        .with_context(|| format!("attempt {attempt_id} vanished from the store"))?;
    let answers = quiz
        .questions
        .iter()
        .filter_map(|q| {
            attempt
                .answers
                .get(&q.id)
                .map(|a| AnswerEntry::new(q.id.clone(), a.clone()))
        })
        .collect();
    let report = AttemptReport::new(&quiz, answers, grade).with_attempt(&attempt);

    let output_dir = output.unwrap_or(config.output_dir);
    let path = output_dir.join(format!("attempt-{attempt_id}.json"));
    report.save_json(&path)?;
    eprintln!("Report saved to: {}", path.display());

    Ok(())
}

async fn handle_command(controller: &mut SessionController, input: &str) -> Flow {
    let (cmd, arg) = match input.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (input, ""),
    };

    let moved = match cmd {
        "" => return Flow::Continue,
        "n" => controller.next(),
        "p" => controller.previous(),
        "g" => match arg.parse::<usize>() {
            Ok(n) if n >= 1 => controller.navigate(n - 1),
            _ => {
                println!("usage: g <question number>");
                return Flow::Continue;
            }
        },
        "a" => {
            answer_current(controller, arg);
            return Flow::Continue;
        }
        "c" => {
            if let Some(id) = controller.state().current_question().map(|q| q.id.clone()) {
                match controller.clear_answer(&id) {
                    Ok(()) => println!("Answer cleared."),
                    Err(e) => println!("! {e}"),
                }
            }
            return Flow::Continue;
        }
        "l" => {
            list_questions(controller);
            return Flow::Continue;
        }
        "s" | "s!" => {
            match controller.submit(cmd == "s!").await {
                Ok(_) => {}
                Err(SessionError::ConfirmationRequired { answered, total }) => println!(
                    "Only {answered} of {total} questions answered. Type s! to submit anyway."
                ),
                Err(e) => println!("! {e}"),
            }
            return Flow::Continue;
        }
        "q" => return Flow::Quit,
        "?" | "h" | "help" => {
            println!("{HELP}");
            return Flow::Continue;
        }
        other => {
            println!("unknown command '{other}'; type ? for help");
            return Flow::Continue;
        }
    };

    match moved {
        Ok(()) => println!("{}", display::question_view(controller.state())),
        Err(e) => println!("! {e}"),
    }
    Flow::Continue
}

fn answer_current(controller: &mut SessionController, arg: &str) {
    let Some(question) = controller.state().current_question().cloned() else {
        return;
    };
    if arg.is_empty() {
        println!("usage: a <answer>");
        return;
    }

    let value = match question.question_type() {
        QuestionType::Mcq => {
            if question.option_text(arg).is_none() {
                let ids: Vec<&str> = question.options().iter().map(|o| o.id.as_str()).collect();
                println!("! '{arg}' is not an option here (choose one of: {})", ids.join(", "));
                return;
            }
            AnswerValue::mcq(arg)
        }
        QuestionType::Short => AnswerValue::short(arg),
    };

    match controller.answer(&question.id, value) {
        Ok(()) => println!(
            "Answer recorded ({} of {} answered).",
            controller.state().answered_count(),
            controller.state().total_questions()
        ),
        Err(e) => println!("! {e}"),
    }
}

fn list_questions(controller: &SessionController) {
    let state = controller.state();
    let Some(quiz) = state.quiz() else {
        return;
    };
    for (i, q) in quiz.questions.iter().enumerate() {
        let marker = if i == state.current_index() { '>' } else { ' ' };
        let answer = state
            .answer_for(&q.id)
            .filter(|a| !a.is_empty())
            .map(ToString::to_string)
            .unwrap_or_else(|| "-".into());
        println!("{marker} {:>2}. {} [{answer}]", i + 1, q.prompt);
    }
    if let Some(remaining) = controller.remaining() {
        println!("Time remaining: {}", display::format_remaining(remaining));
    }
}

/// Print the countdown on whole minutes and during the last seconds.
fn announce(remaining: Duration) {
    let secs = (remaining.as_millis() + 500) / 1000;
    if secs > 0 && (secs % 60 == 0 || secs == 30 || secs <= 10) {
        println!("[{} remaining]", display::format_remaining(Duration::from_secs(secs as u64)));
    }
}
