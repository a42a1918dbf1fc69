//! The `examkit take` command.
//!
//! Runs a timed test interactively: questions are rendered to stdout,
//! commands are read line by line from stdin, and timer events from the
//! session drive warnings and forced submission.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use examkit_core::bank;
use examkit_core::coordinator::{ResultPersistenceCoordinator, SaveOutcomeKind};
use examkit_core::generator::TestGenerator;
use examkit_core::history::HistoryRecord;
use examkit_core::model::{AnswerSheet, ChoiceLabel, Mode, RotationSet, Test, UserId};
use examkit_core::scoring::ExamResult;
use examkit_core::session::{SessionEvent, TestSession};
use examkit_core::traits::{load_rotation_set, ResultStore};
use examkit_store::config::load_config_from;
use examkit_store::create_store;

/// One line of user input, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Answer(ChoiceLabel),
    Next,
    Prev,
    /// 1-based question number, as displayed.
    Goto(usize),
    Mark,
    Pause,
    Resume,
    Grid,
    Submit,
    Quit,
    Help,
    Unknown(String),
}

fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    if let Ok(label) = trimmed.parse::<ChoiceLabel>() {
        return Command::Answer(label);
    }

    let lower = trimmed.to_lowercase();
    let mut parts = lower.split_whitespace();
    match parts.next() {
        Some("n") | Some("next") => Command::Next,
        Some("p") | Some("prev") => Command::Prev,
        Some("g") | Some("goto") => parts
            .next()
            .and_then(|s| s.parse().ok())
            .map(Command::Goto)
            .unwrap_or_else(|| Command::Unknown(trimmed.to_string())),
        Some("m") | Some("mark") => Command::Mark,
        Some("pause") => Command::Pause,
        Some("resume") => Command::Resume,
        Some("grid") | Some("status") => Command::Grid,
        Some("submit") => Command::Submit,
        Some("q") | Some("quit") => Command::Quit,
        Some("h") | Some("help") | Some("?") => Command::Help,
        _ => Command::Unknown(trimmed.to_string()),
    }
}

enum LoopExit {
    Submit,
    Quit,
}

pub async fn execute(
    bank_path: Option<PathBuf>,
    user: Option<String>,
    duration_mins: Option<u64>,
    seed: Option<u64>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let bank_path = bank_path.unwrap_or_else(|| config.bank_path.clone());
    let bank = bank::load_bank(&bank_path)?;

    for warning in bank::validate_bank(&bank) {
        eprintln!("Warning: {}", warning.message);
    }

    let mode = match user {
        Some(user) => Mode::Authenticated(UserId::new(user)),
        None => Mode::Guest,
    };
    let duration = Duration::from_secs(duration_mins.unwrap_or(config.test_duration_mins) * 60);

    let mut rng: StdRng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let generator = TestGenerator::default();

    let store = mode.user().map(|_| create_store(&config.store));
    let mut rotation = RotationSet::default();
    let test = match (&mode, &store) {
        (Mode::Authenticated(user), Some(store)) => {
            rotation = match load_rotation_set(store.as_ref(), user).await {
                Ok(set) => set,
                Err(err) => {
                    eprintln!("Warning: could not load rotation state ({err}); starting fresh.");
                    RotationSet::default()
                }
            };
            generator.generate_with_rotation(&bank, &mut rotation, &mut rng)?
        }
        _ => generator.generate(&bank, &mut rng)?,
    };

    let (mut session, mut events) = TestSession::begin(test, duration);
    println!(
        "Test started: {} questions, {} minutes. Type 'help' for commands.",
        session.test().len(),
        duration.as_secs() / 60
    );
    render_question(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut exit = LoopExit::Submit;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::Tick { remaining_secs }) => {
                    if remaining_secs > 0 && (remaining_secs % 60 == 0 || remaining_secs <= 10) {
                        eprintln!("  [{} remaining]", format_remaining(remaining_secs));
                    }
                }
                Some(SessionEvent::Expired) => {
                    eprintln!("Time is up! The test will be submitted automatically.");
                    break;
                }
                None => {}
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    // EOF submits whatever has been answered.
                    break;
                };
                match parse_command(&line) {
                    Command::Answer(label) => {
                        let valid = session
                            .current_question()
                            .map_or(false, |q| q.choices.contains_key(&label));
                        if valid {
                            session.answer_current(label);
                            render_question(&session);
                        } else {
                            eprintln!("No choice {label} on this question.");
                        }
                    }
                    Command::Next => {
                        session.next();
                        render_question(&session);
                    }
                    Command::Prev => {
                        session.prev();
                        render_question(&session);
                    }
                    Command::Goto(number) => {
                        session.goto(number.saturating_sub(1));
                        render_question(&session);
                    }
                    Command::Mark => {
                        let marked = session.toggle_mark();
                        eprintln!(
                            "Question {} {}.",
                            session.current_position() + 1,
                            if marked { "marked for review" } else { "unmarked" }
                        );
                    }
                    Command::Pause => {
                        session.pause().await;
                        eprintln!("Paused. Type 'resume' to continue.");
                    }
                    Command::Resume => {
                        session.resume().await;
                        eprintln!(
                            "Resumed with {} remaining.",
                            format_remaining(session.remaining_secs())
                        );
                    }
                    Command::Grid => render_grid(&session),
                    Command::Submit => {
                        let unanswered = session.test().len() - session.answered_count();
                        if unanswered > 0 {
                            eprintln!("{unanswered} question(s) unanswered.");
                        }
                        break;
                    }
                    Command::Quit => {
                        exit = LoopExit::Quit;
                        break;
                    }
                    Command::Help => print_help(),
                    Command::Unknown(input) => {
                        eprintln!("Unknown command: {input} (type 'help')");
                    }
                }
            }
        }
    }

    if let LoopExit::Quit = exit {
        session.quit().await;
        println!("Test abandoned; nothing was scored or saved.");
        return Ok(());
    }

    let (test, answers, result) = session.submit().await;
    print_result(&result);
    print_review(&test, &answers);

    if let (Mode::Authenticated(user), Some(store)) = (&mode, &store) {
        save_with_retry(
            Arc::clone(store),
            user.clone(),
            &test,
            &answers,
            result,
            rotation,
            &mut lines,
            Duration::from_secs(config.write_timeout_secs),
        )
        .await?;
    }

    Ok(())
}

/// Submit the snapshot, offering manual retries until the user gives up
/// or everything lands. The local result is never discarded.
#[allow(clippy::too_many_arguments)]
async fn save_with_retry(
    store: Arc<dyn ResultStore>,
    user: UserId,
    test: &Test,
    answers: &AnswerSheet,
    result: ExamResult,
    rotation: RotationSet,
    lines: &mut Lines<BufReader<Stdin>>,
    write_timeout: Duration,
) -> Result<()> {
    let record = HistoryRecord::from_submission(user, test, answers, result);
    let mut coordinator =
        ResultPersistenceCoordinator::new(store).with_write_timeout(write_timeout);
    let mut outcome = coordinator.submit(record, rotation).await;

    loop {
        if let SaveOutcomeKind::Saved = outcome.kind() {
            println!("Result saved.");
            return Ok(());
        }

        if let Err(err) = &outcome.history {
            eprintln!("History write failed: {err}");
        }
        if let Err(err) = &outcome.rotation {
            eprintln!("Rotation write failed: {err}");
        }
        eprintln!("Retry? [r/N]");

        let wants_retry = matches!(
            lines.next_line().await?,
            Some(line) if line.trim().eq_ignore_ascii_case("r")
        );
        if !wants_retry {
            println!("Not saved remotely; the result shown above stays valid.");
            return Ok(());
        }

        match coordinator.retry().await {
            Some(next) => outcome = next,
            None => return Ok(()),
        }
    }
}

fn render_question(session: &TestSession) {
    let Some(question) = session.current_question() else {
        return;
    };
    let position = session.current_position();
    let marked = if session.is_marked(position) {
        " [marked]"
    } else {
        ""
    };

    println!();
    println!(
        "Question {} of {} ({} points){marked}",
        position + 1,
        session.test().len(),
        question.points.points()
    );
    println!("{}", question.question);
    if let Some(image) = &question.image {
        println!("  (see image: {image})");
    }
    for (label, text) in &question.choices {
        let chosen = if session.answers().get(position) == Some(*label) {
            ">"
        } else {
            " "
        };
        println!(" {chosen} {label}) {text}");
    }
}

/// One row of 8 per tier block; `*` answered, `!` marked.
fn render_grid(session: &TestSession) {
    println!("Answered: {} of {}", session.answered_count(), session.test().len());
    for (position, _) in session.test().questions().iter().enumerate() {
        let answered = if session.answers().get(position).is_some() {
            "*"
        } else {
            " "
        };
        let marked = if session.is_marked(position) { "!" } else { " " };
        print!("{:>3}{answered}{marked}", position + 1);
        if (position + 1) % 8 == 0 {
            println!();
        }
    }
    if session.test().len() % 8 != 0 {
        println!();
    }
    println!("(* answered, ! marked)");
}

fn print_result(result: &ExamResult) {
    use comfy_table::Table;

    let mut table = Table::new();
    table.set_header(vec![
        "Score",
        "Correct",
        "Wrong",
        "Unanswered",
        "Accuracy",
        "Time",
    ]);
    table.add_row(vec![
        format!("{}/{}", result.score, result.max_score),
        result.correct.to_string(),
        result.wrong.to_string(),
        result.unanswered.to_string(),
        format!("{}%", result.accuracy),
        result.elapsed_display(),
    ]);

    println!("\n{table}");
}

fn print_review(test: &Test, answers: &AnswerSheet) {
    let mut printed_header = false;
    for (position, question) in test.questions().iter().enumerate() {
        let line = match answers.get(position) {
            Some(choice) if choice == question.answer => continue,
            Some(choice) => format!(
                "Q{} ({}pt): you answered {choice}, correct is {}",
                position + 1,
                question.points.points(),
                question.answer
            ),
            None => format!(
                "Q{} ({}pt): not answered, correct is {}",
                position + 1,
                question.points.points(),
                question.answer
            ),
        };
        if !printed_header {
            println!("Review:");
            printed_header = true;
        }
        println!("  {line}");
    }
}

fn format_remaining(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn print_help() {
    eprintln!("Commands:");
    eprintln!("  a-e        answer the current question");
    eprintln!("  n / p      next / previous question");
    eprintln!("  g <num>    go to question <num>");
    eprintln!("  m          mark the current question for review");
    eprintln!("  grid       show answered/marked overview");
    eprintln!("  pause      pause the timer");
    eprintln!("  resume     resume the timer");
    eprintln!("  submit     finish and score the test");
    eprintln!("  quit       abandon the test without scoring");
}
