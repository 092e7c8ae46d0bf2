use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Identifies one quiz run. Every restart gets a fresh id.
pub type SessionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick { session: SessionId, question: usize },
}

impl TimerEvent {
    pub fn session(&self) -> SessionId {
        match self {
            TimerEvent::Tick { session, .. } => *session,
        }
    }

    pub fn question(&self) -> usize {
        match self {
            TimerEvent::Tick { question, .. } => *question,
        }
    }
}

/// A repeating tick source bound to one question of one session. Dropping it
/// cancels it.
#[derive(Debug)]
pub struct Ticker {
    session: SessionId,
    question: usize,
    cancelled: Arc<AtomicBool>,
}

impl Ticker {
    pub fn spawn(
        session: SessionId,
        question: usize,
        period: Duration,
        tx: mpsc::Sender<TimerEvent>,
    ) -> Self {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        thread::spawn(move || loop {
            thread::sleep(period);
            if flag.load(Ordering::SeqCst) {
                break;
            }
            if tx.send(TimerEvent::Tick { session, question }).is_err() {
                break;
            }
        });

        Self {
            session,
            question,
            cancelled,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn question(&self) -> usize {
        self.question
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub fn format_remaining(total_secs: u32) -> String {
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;
    if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
