//! Error types shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a `KeyValueStore`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
    #[error("cannot serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("no data directory available on this platform")]
    NoDataDir,
}

/// Errors raised by `QuizEngine` operations. A failed operation leaves the
/// session unchanged.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("question bank is empty")]
    EmptyBank,
    #[error("question duration must be at least one second")]
    InvalidDuration,
    #[error("question {question} is not a {expected} question")]
    KindMismatch {
        question: u32,
        expected: &'static str,
    },
    #[error("question {question} has no option {option:?}")]
    UnknownOption { question: u32, option: String },
    #[error("question {0} has already been answered")]
    AlreadyAnswered(u32),
    #[error("session already completed")]
    SessionCompleted,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors raised while loading a question bank.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    #[error("question bank must start with YAML frontmatter (---)")]
    MissingFrontmatter,
    #[error("no closing --- for frontmatter")]
    UnclosedFrontmatter,
    #[error("invalid frontmatter: {0}")]
    Frontmatter(#[from] serde_yaml::Error),
    #[error("question heading must be in format '## N. Prompt', got: {0}")]
    BadHeading(String),
    #[error("question {0} must mark exactly one option with [x]")]
    CorrectOption(u32),
    #[error("question {question} has an invalid integer answer {value:?}")]
    BadInteger { question: u32, value: String },
    #[error("question {0} has neither options nor an integer answer")]
    NoAnswer(u32),
    #[error("question {0} mixes options with an integer answer")]
    MixedKinds(u32),
    #[error("duplicate question id {0}")]
    DuplicateId(u32),
    #[error("question bank has no questions")]
    Empty,
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
