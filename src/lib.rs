pub mod cli;
pub mod console;
pub mod engine;
pub mod error;
pub mod history;
pub mod model;
pub mod parser;
pub mod storage;
pub mod timer;

pub use engine::{Advance, QuizEngine, QuizView, Session, TickOutcome};
pub use error::{ParseError, QuizError, StorageError};
pub use history::HistoryLog;
pub use model::{AttemptRecord, Feedback, Question, QuestionBank, QuestionKind, QuizOption};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
