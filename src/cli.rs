use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "timedquiz", version, about = "Timed terminal quiz with attempt history")]
pub struct Cli {
    /// Question bank (Markdown with YAML frontmatter) [default: built-in bank]
    pub bank: Option<PathBuf>,

    /// Seconds allowed per question (overrides the bank's duration_secs)
    #[arg(long, value_name = "secs", value_parser = clap::value_parser!(u32).range(1..))]
    pub duration: Option<u32>,

    /// Directory holding the attempt history [default: platform data dir]
    #[arg(long, value_name = "dir")]
    pub data_dir: Option<PathBuf>,

    /// Print past attempts and exit
    #[arg(long)]
    pub history: bool,

    /// Delete all past attempts before starting
    #[arg(long)]
    pub clear_history: bool,
}
