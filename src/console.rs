use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use log::debug;

use crate::engine::{Advance, QuizEngine, QuizView, TickOutcome};
use crate::error::QuizError;
use crate::model::{AttemptRecord, Feedback, QuestionKind};
use crate::storage::KeyValueStore;
use crate::timer::format_remaining;

/// Remaining-time marks at which the console prints a reminder.
const WARN_AT_SECS: [u32; 2] = [10, 5];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Answer(String),
    Next,
    Restart,
    History,
    Help,
    Quit,
    Empty,
}

pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "" => Command::Empty,
        "n" | "next" => Command::Next,
        "r" | "restart" => Command::Restart,
        "h" | "history" => Command::History,
        "?" | "help" => Command::Help,
        "q" | "quit" | "exit" => Command::Quit,
        _ => Command::Answer(trimmed.to_string()),
    }
}

pub fn render_question(view: &QuizView<'_>) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\nQuestion {}/{}  (score {}, {} left)\n",
        view.question_index + 1,
        view.total_questions,
        view.score,
        format_remaining(view.time_remaining_secs)
    ));
    out.push_str(&format!("{}\n", view.question.prompt));
    match &view.question.kind {
        QuestionKind::MultipleChoice { options, .. } => {
            for option in options {
                out.push_str(&format!("  {}) {}\n", option.id, option.text));
            }
            out.push_str("Type an option letter, or n to skip.\n");
        }
        QuestionKind::Integer { .. } => {
            out.push_str("Type a whole number, or n to skip.\n");
        }
    }
    out
}

pub fn render_feedback(feedback: Feedback) -> &'static str {
    match feedback {
        Feedback::Correct => "Correct! (n for next)",
        Feedback::Incorrect => "Wrong! (n for next)",
    }
}

pub fn render_history(history: &[AttemptRecord]) -> String {
    if history.is_empty() {
        return "No past attempts.\n".to_string();
    }
    let mut out = String::from("Past attempts (most recent first):\n");
    for record in history {
        out.push_str(&format!(
            "  {}  {}/{}\n",
            record.date, record.score, record.total_questions
        ));
    }
    out
}

pub fn render_summary(view: &QuizView<'_>) -> String {
    let mut out = format!(
        "\nQuiz complete! You scored {} out of {}.\n\n",
        view.score, view.total_questions
    );
    out.push_str(&render_history(view.history));
    out.push_str("\nr to restart, q to quit.\n");
    out
}

fn help_text() -> &'static str {
    "Commands: <answer>, n (next question), r (restart after finishing), \
     h (history), ? (help), q (quit)\n"
}

fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Run the quiz against stdin/stdout until the user quits or input ends.
pub fn run_console<S: KeyValueStore>(engine: &mut QuizEngine<S>) {
    let input_rx = spawn_stdin_reader();
    let timer_rx = engine.start_timer();
    let mut out = io::stdout();

    print_flush(&mut out, help_text());
    print_flush(&mut out, &render_question(&engine.view()));

    loop {
        match input_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(line) => {
                if !handle_command(engine, parse_command(&line), &mut out) {
                    break;
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                debug!("stdin closed");
                break;
            }
        }

        while let Ok(ev) = timer_rx.try_recv() {
            match engine.handle_timer(ev) {
                Ok(TickOutcome::Counting(secs)) if WARN_AT_SECS.contains(&secs) => {
                    print_flush(&mut out, &format!("  ({} left)\n", format_remaining(secs)));
                }
                Ok(TickOutcome::Expired(advance)) => {
                    print_flush(&mut out, "  Time's up!\n");
                    show_advance(engine, &advance, &mut out);
                }
                Ok(_) => {}
                Err(e) => print_flush(&mut out, &format!("! {}\n", e)),
            }
        }
    }
}

/// Returns false when the user asked to quit.
fn handle_command<S: KeyValueStore>(
    engine: &mut QuizEngine<S>,
    command: Command,
    out: &mut impl Write,
) -> bool {
    match command {
        Command::Quit => return false,
        Command::Empty => {}
        Command::Help => print_flush(out, help_text()),
        Command::History => print_flush(out, &render_history(engine.history())),
        Command::Restart => {
            if engine.is_completed() {
                engine.restart();
                print_flush(out, &render_question(&engine.view()));
            } else {
                print_flush(out, "! finish the quiz before restarting\n");
            }
        }
        Command::Next => match engine.advance() {
            Ok(advance) => show_advance(engine, &advance, out),
            Err(e) => print_flush(out, &format!("! {}\n", e)),
        },
        Command::Answer(text) => {
            let result = if engine.is_completed() {
                Err(QuizError::SessionCompleted)
            } else if engine.current_question().is_multiple_choice() {
                engine.select_option(&text.to_ascii_uppercase())
            } else {
                engine.submit_integer(&text)
            };
            match result {
                Ok(feedback) => print_flush(out, &format!("{}\n", render_feedback(feedback))),
                Err(e) => print_flush(out, &format!("! {}\n", e)),
            }
        }
    }
    true
}

fn show_advance<S: KeyValueStore>(
    engine: &QuizEngine<S>,
    advance: &Advance,
    out: &mut impl Write,
) {
    match advance {
        Advance::NextQuestion(_) => print_flush(out, &render_question(&engine.view())),
        Advance::Completed(_) => print_flush(out, &render_summary(&engine.view())),
    }
}

fn print_flush(out: &mut impl Write, text: &str) {
    let _ = out.write_all(text.as_bytes());
    let _ = out.flush();
}
