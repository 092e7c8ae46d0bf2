use std::sync::atomic::{AtomicBool, Ordering};

use timedquiz::engine::{Advance, QuizEngine, TickOutcome};
use timedquiz::error::QuizError;
use timedquiz::history::HISTORY_KEY;
use timedquiz::model::Feedback;
use timedquiz::parser;
use timedquiz::storage::{KeyValueStore, MemoryStore};
use timedquiz::StorageError;

fn sample_engine(store: MemoryStore) -> QuizEngine<MemoryStore> {
    let bank = parser::builtin_bank().unwrap();
    QuizEngine::new(bank.questions, store).unwrap()
}

fn assert_score_bound(engine: &QuizEngine<MemoryStore>) {
    assert!(engine.score() as usize <= engine.question_index() + 1);
}

#[test]
fn test_fresh_session() {
    let engine = sample_engine(MemoryStore::new());
    let view = engine.view();
    assert_eq!(view.question_index, 0);
    assert_eq!(view.total_questions, 10);
    assert_eq!(view.score, 0);
    assert_eq!(view.time_remaining_secs, 30);
    assert!(!view.completed);
    assert!(view.history.is_empty());
    assert_eq!(engine.current_question().prompt, "Which planet is closest to the Sun?");
}

#[test]
fn test_advance_n_times_completes_and_records_once() {
    let store = MemoryStore::new();
    let mut engine = sample_engine(store.clone());

    for i in 0..9 {
        assert_eq!(engine.advance().unwrap(), Advance::NextQuestion(i + 1));
        assert!(!engine.is_completed());
        assert!(engine.history().is_empty());
    }
    match engine.advance().unwrap() {
        Advance::Completed(record) => {
            assert_eq!(record.score, 0);
            assert_eq!(record.total_questions, 10);
        }
        other => panic!("Expected completion, got {:?}", other),
    }

    assert!(engine.is_completed());
    assert_eq!(engine.question_index(), 9);
    assert_eq!(engine.history().len(), 1);
    assert_eq!(engine.history()[0].score, 0);
    assert_eq!(engine.history()[0].total_questions, 10);
    assert!(store.get(HISTORY_KEY).unwrap().is_some());
}

#[test]
fn test_score_counts_correct_answers() {
    let mut engine = sample_engine(MemoryStore::new());

    // Q1..Q5 multiple choice: correct, wrong, correct, skip, correct.
    assert_eq!(engine.select_option("B").unwrap(), Feedback::Correct);
    assert_score_bound(&engine);
    engine.advance().unwrap();
    assert_eq!(engine.select_option("A").unwrap(), Feedback::Incorrect);
    engine.advance().unwrap();
    assert_eq!(engine.select_option("C").unwrap(), Feedback::Correct);
    engine.advance().unwrap();
    engine.advance().unwrap();
    assert_eq!(engine.select_option("D").unwrap(), Feedback::Correct);
    engine.advance().unwrap();

    // Q6..Q10 integer: 40 correct, 49 wrong, " 1776 " correct, skip, 120 correct.
    assert_eq!(engine.submit_integer("40").unwrap(), Feedback::Correct);
    engine.advance().unwrap();
    assert_eq!(engine.submit_integer("49").unwrap(), Feedback::Incorrect);
    engine.advance().unwrap();
    assert_eq!(engine.submit_integer(" 1776 ").unwrap(), Feedback::Correct);
    engine.advance().unwrap();
    engine.advance().unwrap();
    assert_eq!(engine.submit_integer("120").unwrap(), Feedback::Correct);
    assert_score_bound(&engine);
    engine.advance().unwrap();

    assert!(engine.is_completed());
    assert_eq!(engine.score(), 6);
    assert_eq!(engine.history()[0].score, 6);
}

#[test]
fn test_non_integer_input_is_wrong_not_an_error() {
    let mut engine = sample_engine(MemoryStore::new());
    for _ in 0..5 {
        engine.advance().unwrap();
    }
    assert_eq!(engine.current_question().prompt, "What is the value of 12 + 28?");

    assert_eq!(engine.submit_integer("abc").unwrap(), Feedback::Incorrect);
    assert_eq!(engine.score(), 0);
    assert_eq!(engine.view().feedback, Some(Feedback::Incorrect));
    assert_eq!(engine.view().entered_answer, Some("abc"));

    // Progression is not blocked.
    assert_eq!(engine.advance().unwrap(), Advance::NextQuestion(6));
}

#[test]
fn test_reanswering_is_rejected_and_score_unchanged() {
    let mut engine = sample_engine(MemoryStore::new());
    engine.select_option("B").unwrap();
    assert!(matches!(
        engine.select_option("B"),
        Err(QuizError::AlreadyAnswered(1))
    ));
    assert!(matches!(
        engine.select_option("A"),
        Err(QuizError::AlreadyAnswered(1))
    ));
    assert_eq!(engine.score(), 1);
    assert_eq!(engine.view().selected_option, Some("B"));

    engine.advance().unwrap();
    engine.advance().unwrap();
    engine.advance().unwrap();
    engine.advance().unwrap();
    engine.advance().unwrap();
    engine.submit_integer("7").unwrap();
    assert!(matches!(
        engine.submit_integer("40"),
        Err(QuizError::AlreadyAnswered(6))
    ));
    assert_eq!(engine.score(), 1);
}

#[test]
fn test_kind_mismatch_leaves_state_unchanged() {
    let mut engine = sample_engine(MemoryStore::new());
    let before = engine.session().clone();

    assert!(matches!(
        engine.submit_integer("40"),
        Err(QuizError::KindMismatch { question: 1, .. })
    ));
    assert!(matches!(
        engine.select_option("Z"),
        Err(QuizError::UnknownOption { question: 1, .. })
    ));
    assert_eq!(engine.session(), &before);

    for _ in 0..5 {
        engine.advance().unwrap();
    }
    let before = engine.session().clone();
    assert!(matches!(
        engine.select_option("A"),
        Err(QuizError::KindMismatch { question: 6, .. })
    ));
    assert_eq!(engine.session(), &before);
}

#[test]
fn test_operations_after_completion_are_rejected() {
    let mut engine = sample_engine(MemoryStore::new());
    for _ in 0..10 {
        engine.advance().unwrap();
    }
    assert!(matches!(engine.advance(), Err(QuizError::SessionCompleted)));
    assert!(matches!(
        engine.submit_integer("120"),
        Err(QuizError::SessionCompleted)
    ));
    assert_eq!(engine.tick().unwrap(), TickOutcome::Ignored);
    assert_eq!(engine.history().len(), 1);
}

#[test]
fn test_timer_expiry_advances_exactly_once() {
    let bank = parser::builtin_bank().unwrap();
    let mut engine = QuizEngine::with_duration(bank.questions, 3, MemoryStore::new()).unwrap();

    let mut outcomes = Vec::new();
    for _ in 0..3 {
        outcomes.push(engine.tick().unwrap());
        assert!(engine.time_remaining_secs() <= 3);
    }
    assert_eq!(
        outcomes,
        vec![
            TickOutcome::Counting(2),
            TickOutcome::Counting(1),
            TickOutcome::Expired(Advance::NextQuestion(1)),
        ]
    );
    assert_eq!(engine.question_index(), 1);
    assert_eq!(engine.time_remaining_secs(), 3);

    // The next question gets its own full countdown.
    assert_eq!(engine.tick().unwrap(), TickOutcome::Counting(2));
    assert_eq!(engine.question_index(), 1);
}

#[test]
fn test_timer_runs_whole_quiz_to_completion() {
    let bank = parser::builtin_bank().unwrap();
    let mut engine = QuizEngine::with_duration(bank.questions, 2, MemoryStore::new()).unwrap();
    engine.select_option("B").unwrap();

    let mut expired = 0;
    while !engine.is_completed() {
        if let TickOutcome::Expired(_) = engine.tick().unwrap() {
            expired += 1;
        }
        assert_score_bound(&engine);
    }
    assert_eq!(expired, 10);
    assert_eq!(engine.history()[0].score, 1);
}

#[test]
fn test_restart_resets_session_keeps_history() {
    let mut engine = sample_engine(MemoryStore::new());
    engine.select_option("B").unwrap();
    for _ in 0..10 {
        engine.advance().unwrap();
    }
    let first_id = engine.session().id;
    assert_eq!(engine.history().len(), 1);

    engine.restart();
    assert_eq!(engine.question_index(), 0);
    assert_eq!(engine.score(), 0);
    assert!(!engine.is_completed());
    assert_eq!(engine.time_remaining_secs(), 30);
    assert_eq!(engine.view().feedback, None);
    assert_ne!(engine.session().id, first_id);
    assert_eq!(engine.history().len(), 1);

    // The restarted question can be answered again.
    assert_eq!(engine.select_option("B").unwrap(), Feedback::Correct);
}

#[test]
fn test_second_attempt_is_prepended() {
    let mut engine = sample_engine(MemoryStore::new());
    for _ in 0..10 {
        engine.advance().unwrap();
    }
    engine.restart();
    engine.select_option("B").unwrap();
    for _ in 0..10 {
        engine.advance().unwrap();
    }

    let scores: Vec<u32> = engine.history().iter().map(|r| r.score).collect();
    assert_eq!(scores, vec![1, 0]);
}

struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set(&self, key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

#[test]
fn test_failed_persist_leaves_session_open() {
    let bank = parser::builtin_bank().unwrap();
    let mut engine = QuizEngine::new(bank.questions, FailingStore).unwrap();
    for _ in 0..9 {
        engine.advance().unwrap();
    }

    assert!(matches!(engine.advance(), Err(QuizError::Storage(_))));
    assert!(!engine.is_completed());
    assert!(engine.history().is_empty());
    assert_eq!(engine.question_index(), 9);
}

#[test]
fn test_failed_persist_on_expiry_keeps_countdown() {
    let bank = parser::builtin_bank().unwrap();
    let mut engine = QuizEngine::with_duration(bank.questions, 1, FailingStore).unwrap();
    for _ in 0..9 {
        engine.advance().unwrap();
    }

    for _ in 0..3 {
        assert!(matches!(engine.tick(), Err(QuizError::Storage(_))));
        assert_eq!(engine.time_remaining_secs(), 1);
        assert!(!engine.is_completed());
        assert_eq!(engine.question_index(), 9);
        assert!(engine.history().is_empty());
    }
}

/// Rejects the first write, accepts the rest.
#[derive(Default)]
struct FlakyStore {
    failed_once: AtomicBool,
    inner: MemoryStore,
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        self.inner.set(key, value)
    }
}

#[test]
fn test_expiry_retries_after_failed_persist() {
    let bank = parser::builtin_bank().unwrap();
    let mut engine =
        QuizEngine::with_duration(bank.questions, 1, FlakyStore::default()).unwrap();
    for _ in 0..9 {
        engine.advance().unwrap();
    }

    assert!(matches!(engine.tick(), Err(QuizError::Storage(_))));
    assert_eq!(engine.time_remaining_secs(), 1);

    let outcome = engine.tick().unwrap();
    assert!(matches!(outcome, TickOutcome::Expired(Advance::Completed(_))));
    assert!(engine.is_completed());
    assert_eq!(engine.time_remaining_secs(), 0);
    assert_eq!(engine.history().len(), 1);
    assert_eq!(engine.tick().unwrap(), TickOutcome::Ignored);
}
