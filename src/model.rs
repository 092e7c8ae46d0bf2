use serde::{Deserialize, Serialize};

pub const DEFAULT_DURATION_SECS: u32 = 30;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Frontmatter {
    pub title: Option<String>,
    #[serde(default)]
    pub duration_secs: Option<u32>,
}

/// An ordered, non-empty set of questions as loaded from a bank file.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    pub title: String,
    pub duration_secs: Option<u32>,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: u32,
    pub prompt: String,
    pub kind: QuestionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<QuizOption>,
        correct_option: String,
    },
    Integer {
        correct_answer: i64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuizOption {
    pub id: String,
    pub text: String,
}

impl Question {
    pub fn multiple_choice(
        id: u32,
        prompt: &str,
        options: &[(&str, &str)],
        correct_option: &str,
    ) -> Self {
        Self {
            id,
            prompt: prompt.to_string(),
            kind: QuestionKind::MultipleChoice {
                options: options
                    .iter()
                    .map(|(id, text)| QuizOption {
                        id: id.to_string(),
                        text: text.to_string(),
                    })
                    .collect(),
                correct_option: correct_option.to_string(),
            },
        }
    }

    pub fn integer(id: u32, prompt: &str, correct_answer: i64) -> Self {
        Self {
            id,
            prompt: prompt.to_string(),
            kind: QuestionKind::Integer { correct_answer },
        }
    }

    pub fn options(&self) -> &[QuizOption] {
        match &self.kind {
            QuestionKind::MultipleChoice { options, .. } => options,
            QuestionKind::Integer { .. } => &[],
        }
    }

    pub fn is_multiple_choice(&self) -> bool {
        matches!(self.kind, QuestionKind::MultipleChoice { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Correct,
    Incorrect,
}

impl Feedback {
    pub fn from_match(correct: bool) -> Self {
        if correct {
            Feedback::Correct
        } else {
            Feedback::Incorrect
        }
    }

    pub fn is_correct(self) -> bool {
        self == Feedback::Correct
    }
}

/// Summary of one completed run. Field names match the persisted JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub date: String,
    pub score: u32,
    #[serde(rename = "totalQuestions")]
    pub total_questions: u32,
}
