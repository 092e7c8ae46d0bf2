use clap::Parser;

use timedquiz::cli::Cli;
use timedquiz::console;
use timedquiz::model::DEFAULT_DURATION_SECS;
use timedquiz::parser;
use timedquiz::storage::FileStore;
use timedquiz::QuizEngine;

fn main() {
    pretty_env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let bank = match &cli.bank {
        Some(path) => parser::load_bank(path)?,
        None => parser::builtin_bank()?,
    };

    let store = match cli.data_dir {
        Some(dir) => FileStore::new(dir),
        None => FileStore::in_default_dir()?,
    };
    log::debug!("attempt history stored in {}", store.dir().display());

    let duration = cli
        .duration
        .or(bank.duration_secs)
        .unwrap_or(DEFAULT_DURATION_SECS);

    let mut engine = QuizEngine::with_duration(bank.questions, duration, store)?;

    if cli.clear_history {
        engine.clear_history()?;
        eprintln!("History cleared.");
    }

    if cli.history {
        print!("{}", console::render_history(engine.history()));
        return Ok(());
    }

    println!("{}", bank.title);
    console::run_console(&mut engine);
    engine.dispose();

    Ok(())
}
