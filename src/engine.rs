//! The quiz session state machine.
//!
//! A session walks the question bank in order: `Answering(0) .. Answering(N-1)`,
//! then `Completed`. `advance` is the only transition between questions; the
//! countdown calls it once when a question's time runs out. Completing a
//! session prepends an [`AttemptRecord`] to the history and persists the whole
//! log before the transition takes effect.

use std::sync::mpsc;
use std::time::Duration;

use chrono::{DateTime, Local};
use log::{debug, info};

use crate::error::QuizError;
use crate::history::{format_timestamp, HistoryLog};
use crate::model::{AttemptRecord, Feedback, Question, QuestionKind, DEFAULT_DURATION_SECS};
use crate::storage::KeyValueStore;
use crate::timer::{SessionId, Ticker, TimerEvent, TICK_PERIOD};

pub type Clock = fn() -> DateTime<Local>;

/// Mutable state of one quiz run.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub question_index: usize,
    pub selected_option: Option<String>,
    pub entered_answer: Option<String>,
    pub feedback: Option<Feedback>,
    pub time_remaining_secs: u32,
    pub score: u32,
    pub completed: bool,
}

impl Session {
    fn new(id: SessionId, duration_secs: u32) -> Self {
        Self {
            id,
            question_index: 0,
            selected_option: None,
            entered_answer: None,
            feedback: None,
            time_remaining_secs: duration_secs,
            score: 0,
            completed: false,
        }
    }

    pub fn is_answered(&self) -> bool {
        self.feedback.is_some()
    }
}

/// Result of a successful `advance`.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// Moved on to the question at this index.
    NextQuestion(usize),
    /// The last question was left; the attempt has been recorded.
    Completed(AttemptRecord),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The tick belonged to an older session, or the session is over.
    Ignored,
    Counting(u32),
    /// Time ran out and the engine advanced.
    Expired(Advance),
}

/// Read-only snapshot handed to the presentation layer after each call.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizView<'a> {
    pub question: &'a Question,
    pub question_index: usize,
    pub total_questions: usize,
    pub score: u32,
    pub time_remaining_secs: u32,
    pub feedback: Option<Feedback>,
    pub selected_option: Option<&'a str>,
    pub entered_answer: Option<&'a str>,
    pub completed: bool,
    pub history: &'a [AttemptRecord],
}

pub struct QuizEngine<S: KeyValueStore> {
    questions: Vec<Question>,
    duration_secs: u32,
    session: Session,
    history: HistoryLog,
    store: S,
    clock: Clock,
    next_session_id: SessionId,
    timer_tx: Option<mpsc::Sender<TimerEvent>>,
    timer_period: Duration,
    ticker: Option<Ticker>,
}

impl<S: KeyValueStore> QuizEngine<S> {
    pub fn new(questions: Vec<Question>, store: S) -> Result<Self, QuizError> {
        Self::with_duration(questions, DEFAULT_DURATION_SECS, store)
    }

    pub fn with_duration(
        questions: Vec<Question>,
        duration_secs: u32,
        store: S,
    ) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::EmptyBank);
        }
        if duration_secs == 0 {
            return Err(QuizError::InvalidDuration);
        }

        let history = HistoryLog::load(&store);
        debug!(
            "quiz engine ready: {} questions, {}s per question, {} past attempts",
            questions.len(),
            duration_secs,
            history.len()
        );

        Ok(Self {
            questions,
            duration_secs,
            session: Session::new(1, duration_secs),
            history,
            store,
            clock: Local::now,
            next_session_id: 2,
            timer_tx: None,
            timer_period: TICK_PERIOD,
            ticker: None,
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Tick period used by `start_timer`. Only useful for tests and demos.
    #[must_use]
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.timer_period = period;
        self
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.session.question_index]
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn history(&self) -> &[AttemptRecord] {
        self.history.records()
    }

    pub fn score(&self) -> u32 {
        self.session.score
    }

    pub fn question_index(&self) -> usize {
        self.session.question_index
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn time_remaining_secs(&self) -> u32 {
        self.session.time_remaining_secs
    }

    pub fn is_completed(&self) -> bool {
        self.session.completed
    }

    pub fn is_timer_running(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn view(&self) -> QuizView<'_> {
        QuizView {
            question: self.current_question(),
            question_index: self.session.question_index,
            total_questions: self.questions.len(),
            score: self.session.score,
            time_remaining_secs: self.session.time_remaining_secs,
            feedback: self.session.feedback,
            selected_option: self.session.selected_option.as_deref(),
            entered_answer: self.session.entered_answer.as_deref(),
            completed: self.session.completed,
            history: self.history.records(),
        }
    }

    /// Answer the current multiple-choice question. Each question is scored
    /// at most once.
    pub fn select_option(&mut self, option_id: &str) -> Result<Feedback, QuizError> {
        self.ensure_active()?;
        let question = self.current_question();
        let QuestionKind::MultipleChoice {
            options,
            correct_option,
        } = &question.kind
        else {
            return Err(QuizError::KindMismatch {
                question: question.id,
                expected: "multiple-choice",
            });
        };
        if self.session.is_answered() {
            return Err(QuizError::AlreadyAnswered(question.id));
        }
        if !options.iter().any(|o| o.id == option_id) {
            return Err(QuizError::UnknownOption {
                question: question.id,
                option: option_id.to_string(),
            });
        }

        let feedback = Feedback::from_match(option_id == correct_option.as_str());
        self.session.selected_option = Some(option_id.to_string());
        self.record(feedback);
        Ok(feedback)
    }

    /// Answer the current integer question. Text that does not parse as an
    /// integer counts as a wrong answer.
    pub fn submit_integer(&mut self, raw: &str) -> Result<Feedback, QuizError> {
        self.ensure_active()?;
        let question = self.current_question();
        let QuestionKind::Integer { correct_answer } = &question.kind else {
            return Err(QuizError::KindMismatch {
                question: question.id,
                expected: "integer",
            });
        };
        if self.session.is_answered() {
            return Err(QuizError::AlreadyAnswered(question.id));
        }

        let parsed = raw.trim().parse::<i64>().ok();
        let feedback = Feedback::from_match(parsed == Some(*correct_answer));
        self.session.entered_answer = Some(raw.to_string());
        self.record(feedback);
        Ok(feedback)
    }

    fn record(&mut self, feedback: Feedback) {
        if feedback.is_correct() {
            self.session.score += 1;
        }
        self.session.feedback = Some(feedback);
        debug!(
            "question {} answered: {:?}, score {}",
            self.current_question().id,
            feedback,
            self.session.score
        );
    }

    /// Move to the next question, or finish the session from the last one.
    /// Unanswered questions score nothing.
    pub fn advance(&mut self) -> Result<Advance, QuizError> {
        self.ensure_active()?;

        if self.session.question_index + 1 < self.questions.len() {
            self.session.question_index += 1;
            self.session.selected_option = None;
            self.session.entered_answer = None;
            self.session.feedback = None;
            self.session.time_remaining_secs = self.duration_secs;
            self.arm_timer();
            debug!("advanced to question index {}", self.session.question_index);
            return Ok(Advance::NextQuestion(self.session.question_index));
        }

        let record = AttemptRecord {
            date: format_timestamp((self.clock)()),
            score: self.session.score,
            total_questions: self.questions.len() as u32,
        };
        let updated = self.history.with_prepended(record.clone());
        updated.save(&self.store)?;

        self.history = updated;
        self.session.completed = true;
        self.stop_timer();
        info!(
            "quiz completed: {}/{} ({} attempts recorded)",
            record.score,
            record.total_questions,
            self.history.len()
        );
        Ok(Advance::Completed(record))
    }

    /// One second of the current question's countdown has elapsed. When the
    /// last second runs out the engine advances. If that advance fails the
    /// countdown is left at one second, so the next tick expires it again.
    pub fn tick(&mut self) -> Result<TickOutcome, QuizError> {
        if self.session.completed {
            return Ok(TickOutcome::Ignored);
        }

        if self.session.time_remaining_secs <= 1 {
            debug!("time ran out on question {}", self.current_question().id);
            let advance = self.advance()?;
            if let Advance::Completed(_) = advance {
                self.session.time_remaining_secs = 0;
            }
            return Ok(TickOutcome::Expired(advance));
        }
        self.session.time_remaining_secs -= 1;
        Ok(TickOutcome::Counting(self.session.time_remaining_secs))
    }

    /// Apply an event from the tick source. Ticks left over from an earlier
    /// session or question are dropped.
    pub fn handle_timer(&mut self, event: TimerEvent) -> Result<TickOutcome, QuizError> {
        if event.session() != self.session.id || event.question() != self.session.question_index
        {
            debug!(
                "dropping stale tick for session {} question {} (current {} / {})",
                event.session(),
                event.question(),
                self.session.id,
                self.session.question_index
            );
            return Ok(TickOutcome::Ignored);
        }
        self.tick()
    }

    /// Start the countdown for this and every later session. The front end
    /// polls the returned receiver and feeds events to `handle_timer`.
    pub fn start_timer(&mut self) -> mpsc::Receiver<TimerEvent> {
        let (tx, rx) = mpsc::channel();
        self.timer_tx = Some(tx);
        self.arm_timer();
        rx
    }

    fn arm_timer(&mut self) {
        self.stop_timer();
        if self.session.completed {
            return;
        }
        if let Some(tx) = &self.timer_tx {
            self.ticker = Some(Ticker::spawn(
                self.session.id,
                self.session.question_index,
                self.timer_period,
                tx.clone(),
            ));
        }
    }

    fn stop_timer(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }

    /// Discard the current session and start over. History is untouched.
    pub fn restart(&mut self) {
        self.stop_timer();
        self.session = Session::new(self.next_session_id, self.duration_secs);
        self.next_session_id += 1;
        debug!("restarted as session {}", self.session.id);
        self.arm_timer();
    }

    /// Empty the persisted attempt history.
    pub fn clear_history(&mut self) -> Result<(), QuizError> {
        let empty = HistoryLog::new();
        empty.save(&self.store)?;
        self.history = empty;
        Ok(())
    }

    /// Tear the engine down, cancelling any running countdown.
    pub fn dispose(mut self) {
        self.stop_timer();
        self.timer_tx = None;
    }

    fn ensure_active(&self) -> Result<(), QuizError> {
        if self.session.completed {
            return Err(QuizError::SessionCompleted);
        }
        Ok(())
    }
}

impl<S: KeyValueStore> Drop for QuizEngine<S> {
    fn drop(&mut self) {
        self.stop_timer();
    }
}
