use chrono::{DateTime, Local};
use log::warn;

use crate::error::StorageError;
use crate::model::AttemptRecord;
use crate::storage::KeyValueStore;

pub const HISTORY_KEY: &str = "quizHistory";

/// Completed attempts, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryLog {
    records: Vec<AttemptRecord>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the log from `store`. Missing, unreadable or malformed data
    /// yields an empty log.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let raw = match store.get(HISTORY_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::new(),
            Err(e) => {
                warn!("cannot read attempt history, starting empty: {}", e);
                return Self::new();
            }
        };

        match Self::from_json(&raw) {
            Ok(log) => log,
            Err(e) => {
                warn!("ignoring malformed attempt history: {}", e);
                Self::new()
            }
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        // The stored value may be the literal `null`.
        let records: Option<Vec<AttemptRecord>> = serde_json::from_str(raw)?;
        Ok(Self {
            records: records.unwrap_or_default(),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.records)
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), StorageError> {
        let json = self.to_json()?;
        store.set(HISTORY_KEY, &json)
    }

    /// Returns a copy of the log with `record` in front.
    pub fn with_prepended(&self, record: AttemptRecord) -> Self {
        let mut records = Vec::with_capacity(self.records.len() + 1);
        records.push(record);
        records.extend(self.records.iter().cloned());
        Self { records }
    }

    pub fn records(&self) -> &[AttemptRecord] {
        &self.records
    }

    pub fn latest(&self) -> Option<&AttemptRecord> {
        self.records.first()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn format_timestamp(at: DateTime<Local>) -> String {
    at.format("%m/%d/%Y, %I:%M:%S %p").to_string()
}
