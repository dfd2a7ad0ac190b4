use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use quiz_game::config::LoggingConfig;
use quiz_game::{
    AnswerValue, Config, PreferenceStore, QuestionBank, QuestionKind, QuestionTimer, QuizError,
    QuizService, Session, SessionQuestion, SessionState, Theme, TimerEvent, build_review,
    log_system_event, score,
};

type Input = Lines<BufReader<Stdin>>;

/// What the question loop should do after a line of input
enum Flow {
    Stay,
    Leave,
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let _guard = setup_logging(&config.logging)?;
    config.log_configuration_summary();
    config.validate()?;

    log_system_event!(startup, component = "terminal", "Quiz starting");

    let bank = match &config.bank.path {
        Some(path) => QuestionBank::from_path(path)?,
        None => QuestionBank::builtin()?,
    };
    let service = QuizService::new(bank, config.quiz.clone());
    let preferences = PreferenceStore::new(config.preferences.path.clone());

    let mut input = BufReader::new(tokio::io::stdin()).lines();

    banner(preferences.load().theme);
    let Some(mut session) = welcome(&service, &mut input).await? else {
        return Ok(());
    };

    loop {
        if !run_questions(&mut session, &mut input, &preferences, service.config().tick_interval)
            .await?
        {
            break;
        }

        show_results(&session)?;
        if !results_menu(&session, &mut input).await? {
            break;
        }
        session = service.retake(&session)?;
    }

    log_system_event!(shutdown, component = "terminal", "Quiz finished");
    Ok(())
}

fn banner(theme: Theme) {
    let rule = match theme {
        Theme::Light => "-".repeat(48),
        Theme::Dark => "=".repeat(48),
    };
    println!("{rule}\n  QUIZ GAME\n{rule}");
}

async fn prompt(input: &mut Input, text: &str) -> Result<Option<String>> {
    println!("{text}");
    Ok(input
        .next_line()
        .await
        .context("failed to read from stdin")?
        .map(|line| line.trim().to_string()))
}

/// Ask for a name and a difficulty until a session starts. `None` on end of input.
async fn welcome(service: &QuizService, input: &mut Input) -> Result<Option<Session>> {
    loop {
        let Some(name) = prompt(input, "Enter your name:").await? else {
            return Ok(None);
        };
        let Some(choice) =
            prompt(input, "Choose a difficulty [easy / medium / hard / mixed]:").await?
        else {
            return Ok(None);
        };

        match service.start_session(&name, service.policy_for(&choice)) {
            Ok(session) => return Ok(Some(session)),
            Err(QuizError::ValidationError(message)) => println!("{message}. Please try again."),
            Err(err) => return Err(err.into()),
        }
    }
}

/// Drive the session to completion. Returns `false` if the player quit or input ended.
async fn run_questions(
    session: &mut Session,
    input: &mut Input,
    preferences: &PreferenceStore,
    tick_interval: Duration,
) -> Result<bool> {
    while session.state() == SessionState::InProgress {
        let position = session.current_index();
        let question = session.load_current()?.clone();
        render_question(session, &question);

        let (mut timer, mut ticks) = QuestionTimer::start(position, tick_interval);
        loop {
            tokio::select! {
                Some(tick) = ticks.recv() => {
                    if tick.position != session.current_index() {
                        continue;
                    }
                    match session.tick()? {
                        TimerEvent::Ticked { remaining } => {
                            if remaining <= 5 || remaining % 10 == 0 {
                                println!("  [{remaining}s left]");
                            }
                        }
                        TimerEvent::Expired { .. } => {
                            println!("Time's up!");
                            break;
                        }
                    }
                }
                line = input.next_line() => {
                    let Some(line) = line.context("failed to read from stdin")? else {
                        timer.cancel();
                        return Ok(false);
                    };
                    match handle_line(session, &question, preferences, line.trim())? {
                        Flow::Stay => {}
                        Flow::Leave => break,
                        Flow::Quit => {
                            timer.cancel();
                            return Ok(false);
                        }
                    }
                }
            }
        }
        timer.cancel();
    }

    Ok(true)
}

fn render_question(session: &Session, question: &SessionQuestion) {
    let q = &question.question;
    println!();
    println!(
        "Question {}/{} [{}]  ({:.0}% done)",
        session.current_index() + 1,
        session.len(),
        q.difficulty,
        session.progress() * 100.0
    );
    println!("{}", q.prompt);
    if let Some(image) = &q.image_ref {
        println!("  (image: {image})");
    }

    match &q.kind {
        QuestionKind::Single { options, .. } => {
            for (i, option) in options.iter().enumerate() {
                println!("  {}. {}", i + 1, option);
            }
            println!("Type the number of your answer.");
        }
        QuestionKind::Multi { options, .. } => {
            for (i, option) in options.iter().enumerate() {
                println!("  {}. {}", i + 1, option);
            }
            println!("Type every correct number, separated by commas.");
        }
        QuestionKind::Fill { .. } => println!("Type your answer."),
    }

    let hint_state = if session.is_hinted(session.current_index()) {
        "hint already used"
    } else {
        "`hint` costs points"
    };
    println!(
        "You have {}s. Commands: `next`, `hint` ({hint_state}), `theme`, `quit`.",
        session.time_remaining().unwrap_or_default()
    );
}

fn handle_line(
    session: &mut Session,
    question: &SessionQuestion,
    preferences: &PreferenceStore,
    line: &str,
) -> Result<Flow> {
    match line.to_lowercase().as_str() {
        "" => return Ok(Flow::Stay),
        "quit" | "exit" => return Ok(Flow::Quit),
        "theme" => {
            let theme = preferences.toggle_theme()?;
            println!("Theme set to {:?}.", theme);
            return Ok(Flow::Stay);
        }
        "hint" => {
            match session.use_hint() {
                Ok(hint) => println!("{hint}"),
                Err(QuizError::InvalidOperation(message)) => println!("{message}."),
                Err(err) => return Err(err.into()),
            }
            return Ok(Flow::Stay);
        }
        "next" | "n" => {
            if session.answer(session.current_index()).is_none() {
                println!("Answer first, or wait for the timer.");
                return Ok(Flow::Stay);
            }
            session.advance()?;
            return Ok(Flow::Leave);
        }
        _ => {}
    }

    let value = match parse_answer(question.kind(), line) {
        Some(value) => value,
        None => {
            println!("That doesn't look like an answer to this question.");
            return Ok(Flow::Stay);
        }
    };

    match session.submit_answer(value) {
        Ok(_) => println!("Answer saved. Type `next` to continue, or answer again to change it."),
        Err(QuizError::ValidationError(message)) => println!("{message}."),
        Err(err) => return Err(err.into()),
    }
    Ok(Flow::Stay)
}

/// Turn console text into an answer shaped for the question; option numbers are 1-based
fn parse_answer(kind: &QuestionKind, line: &str) -> Option<AnswerValue> {
    match kind {
        QuestionKind::Single { .. } => {
            let number = line.parse::<usize>().ok()?;
            number.checked_sub(1).map(AnswerValue::Single)
        }
        QuestionKind::Multi { .. } => {
            let mut selected = BTreeSet::new();
            for part in line.split(|c: char| c == ',' || c.is_whitespace()) {
                if part.is_empty() {
                    continue;
                }
                let number = part.parse::<usize>().ok()?;
                selected.insert(number.checked_sub(1)?);
            }
            Some(AnswerValue::Multi(selected))
        }
        QuestionKind::Fill { .. } => Some(AnswerValue::Fill(line.to_string())),
    }
}

fn show_results(session: &Session) -> Result<()> {
    let result = score(session)?;
    let difficulty = session
        .policy()
        .map(|policy| policy.to_string())
        .unwrap_or_default();

    println!();
    println!("Results for {}", session.player_name());
    println!("  Score:           {}", result.summary());
    println!("  Correct answers: {}/{}", result.correct_count, result.total);
    println!("  Hints used:      {}", result.hints_used);
    println!("  Difficulty:      {}", difficulty);
    println!("  Trophy:          {:?} - {}", result.tier, result.tier.message());
    if result.tier.celebrate() {
        println!("  *** Congratulations! ***");
    }

    info!(
        session_id = %session.id(),
        score = result.raw_score,
        percentage = result.percentage,
        tier = ?result.tier,
        "Quiz completed"
    );
    Ok(())
}

fn show_review(session: &Session) -> Result<()> {
    for entry in build_review(session)? {
        println!();
        println!("Question {}: {}", entry.position + 1, entry.prompt);
        if let Some(image) = &entry.image_ref {
            println!("  (image: {image})");
        }
        let mark = if entry.user_answer.is_correct { "correct" } else { "incorrect" };
        println!("  Your answer:    {} ({mark})", entry.user_answer.text);
        println!("  Correct answer: {}", entry.correct_answer);
        if !entry.explanation.is_empty() {
            println!("  {}", entry.explanation);
        }
    }
    Ok(())
}

/// Returns `true` when the player wants a retake
async fn results_menu(session: &Session, input: &mut Input) -> Result<bool> {
    loop {
        let Some(choice) = prompt(input, "\n[review / retake / quit]:").await? else {
            return Ok(false);
        };
        match choice.to_lowercase().as_str() {
            "review" => show_review(session)?,
            "retake" => return Ok(true),
            "quit" | "exit" => return Ok(false),
            _ => println!("Please choose review, retake or quit."),
        }
    }
}

fn setup_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter =
        EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info,quiz_game=debug"));

    // Console output goes to stderr; stdout is the quiz itself
    let console_layer = logging.console_enabled.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_ansi(true)
            .with_writer(std::io::stderr)
            .boxed()
    });

    let (file_layer, guard) = if logging.file_enabled {
        std::fs::create_dir_all(&logging.log_directory).unwrap_or_else(|e| {
            eprintln!("Warning: Could not create logs directory: {}", e);
        });

        let file_appender = tracing_appender::rolling::daily(&logging.log_directory, "quiz-game.log");
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(non_blocking_file)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!(
        file_enabled = logging.file_enabled,
        console_enabled = logging.console_enabled,
        log_directory = %logging.log_directory,
        "Logging initialized"
    );

    Ok(guard)
}
