use std::collections::HashSet;
use std::path::Path;

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::error::ParseError;
use crate::model::*;

const BUILTIN_BANK: &str = include_str!("../quizzes/general_knowledge.md");

/// The bank shipped with the crate: five multiple-choice and five integer
/// questions.
pub fn builtin_bank() -> Result<QuestionBank, ParseError> {
    parse_bank(BUILTIN_BANK)
}

pub fn load_bank(path: &Path) -> Result<QuestionBank, ParseError> {
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_bank(&content)
}

pub fn parse_bank(content: &str) -> Result<QuestionBank, ParseError> {
    let (frontmatter, body) = split_frontmatter(content)?;
    let fm: Frontmatter = match frontmatter {
        Some(yaml) => serde_yaml::from_str(yaml)?,
        None => Frontmatter::default(),
    };

    let (heading, questions) = parse_body(body)?;
    if questions.is_empty() {
        return Err(ParseError::Empty);
    }

    let title = fm
        .title
        .or(heading)
        .unwrap_or_else(|| "Quiz".to_string());

    Ok(QuestionBank {
        title,
        duration_secs: fm.duration_secs,
        questions,
    })
}

/// Split the leading YAML block from the Markdown body. Both `---` fences must
/// stand on a line of their own. A block holding only whitespace yields `None`.
fn split_frontmatter(content: &str) -> Result<(Option<&str>, &str), ParseError> {
    let content = content.trim_start();
    let mut lines = content.split_inclusive('\n');
    let opening = lines
        .next()
        .filter(|line| is_fence(line))
        .ok_or(ParseError::MissingFrontmatter)?;

    let mut offset = opening.len();
    for line in lines {
        if is_fence(line) {
            let yaml = content[opening.len()..offset].trim();
            let body = &content[offset + line.len()..];
            return Ok(((!yaml.is_empty()).then_some(yaml), body));
        }
        offset += line.len();
    }
    Err(ParseError::UnclosedFrontmatter)
}

fn is_fence(line: &str) -> bool {
    line.trim_end() == "---"
}

#[derive(Default)]
struct PendingQuestion {
    heading: String,
    extra_prompt: Vec<String>,
    options: Vec<(String, bool)>,
    integer: Option<String>,
}

fn parse_body(body: &str) -> Result<(Option<String>, Vec<Question>), ParseError> {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TASKLISTS);

    let mut title: Option<String> = None;
    let mut questions: Vec<Question> = Vec::new();
    let mut seen_ids: HashSet<u32> = HashSet::new();
    let mut pending: Option<PendingQuestion> = None;

    let mut in_h1 = false;
    let mut h1_text = String::new();
    let mut in_h2 = false;
    let mut in_blockquote = false;
    let mut blockquote_text = String::new();
    let mut in_list_item = false;
    let mut list_item_text = String::new();
    let mut task_list_checked: Option<bool> = None;
    let mut in_paragraph = false;
    let mut paragraph_text = String::new();

    for event in Parser::new_ext(body, opts) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => match level {
                HeadingLevel::H1 => {
                    in_h1 = true;
                    h1_text.clear();
                }
                HeadingLevel::H2 => {
                    if let Some(done) = pending.take() {
                        push_question(done, &mut questions, &mut seen_ids)?;
                    }
                    in_h2 = true;
                    pending = Some(PendingQuestion::default());
                }
                _ => {}
            },
            Event::End(TagEnd::Heading(level)) => match level {
                HeadingLevel::H1 => {
                    in_h1 = false;
                    if title.is_none() && !h1_text.trim().is_empty() {
                        title = Some(h1_text.trim().to_string());
                    }
                }
                HeadingLevel::H2 => in_h2 = false,
                _ => {}
            },
            Event::Start(Tag::BlockQuote(_)) => {
                in_blockquote = true;
                blockquote_text.clear();
            }
            Event::End(TagEnd::BlockQuote(_)) => {
                in_blockquote = false;
                if let Some(q) = pending.as_mut() {
                    let text = blockquote_text.trim();
                    if let Some(value) = text.strip_prefix("integer:") {
                        q.integer = Some(value.trim().to_string());
                    }
                }
            }
            Event::Start(Tag::Item) => {
                in_list_item = true;
                list_item_text.clear();
                task_list_checked = None;
            }
            Event::End(TagEnd::Item) => {
                in_list_item = false;
                if let (Some(q), Some(checked)) = (pending.as_mut(), task_list_checked) {
                    q.options.push((list_item_text.trim().to_string(), checked));
                }
                task_list_checked = None;
            }
            Event::TaskListMarker(checked) => {
                task_list_checked = Some(checked);
            }
            Event::Start(Tag::Paragraph) => {
                in_paragraph = true;
                paragraph_text.clear();
            }
            Event::End(TagEnd::Paragraph) => {
                in_paragraph = false;
                let text = paragraph_text.trim();
                if !in_list_item && !in_blockquote && !text.is_empty() {
                    if let Some(q) = pending.as_mut() {
                        q.extra_prompt.push(text.to_string());
                    }
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if in_h1 {
                    h1_text.push_str(&text);
                } else if in_h2 {
                    if let Some(q) = pending.as_mut() {
                        q.heading.push_str(&text);
                    }
                } else if in_blockquote {
                    blockquote_text.push_str(&text);
                } else if in_list_item {
                    list_item_text.push_str(&text);
                } else if in_paragraph {
                    paragraph_text.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if in_paragraph && !in_list_item && !in_blockquote {
                    paragraph_text.push(' ');
                }
            }
            _ => {}
        }
    }

    if let Some(done) = pending.take() {
        push_question(done, &mut questions, &mut seen_ids)?;
    }

    Ok((title, questions))
}

fn push_question(
    pending: PendingQuestion,
    questions: &mut Vec<Question>,
    seen_ids: &mut HashSet<u32>,
) -> Result<(), ParseError> {
    let (id, heading_prompt) = parse_question_heading(&pending.heading)?;
    if !seen_ids.insert(id) {
        return Err(ParseError::DuplicateId(id));
    }

    let mut prompt = heading_prompt;
    for extra in pending.extra_prompt {
        prompt.push('\n');
        prompt.push_str(&extra);
    }

    let kind = match (pending.options.is_empty(), pending.integer) {
        (false, Some(_)) => return Err(ParseError::MixedKinds(id)),
        (true, None) => return Err(ParseError::NoAnswer(id)),
        (true, Some(value)) => {
            let correct_answer = value
                .parse::<i64>()
                .map_err(|_| ParseError::BadInteger { question: id, value })?;
            QuestionKind::Integer { correct_answer }
        }
        (false, None) => {
            let mut correct: Vec<String> = Vec::new();
            let options: Vec<QuizOption> = pending
                .options
                .into_iter()
                .enumerate()
                .map(|(i, (text, checked))| {
                    let option_id = option_id(i);
                    if checked {
                        correct.push(option_id.clone());
                    }
                    QuizOption { id: option_id, text }
                })
                .collect();
            if correct.len() != 1 {
                return Err(ParseError::CorrectOption(id));
            }
            QuestionKind::MultipleChoice {
                options,
                correct_option: correct.remove(0),
            }
        }
    };

    questions.push(Question { id, prompt, kind });
    Ok(())
}

fn option_id(index: usize) -> String {
    if index < 26 {
        ((b'A' + index as u8) as char).to_string()
    } else {
        (index + 1).to_string()
    }
}

/// `"12. Prompt"` → `(12, "Prompt")`. The number must be all digits and be
/// followed directly by the dot.
fn parse_question_heading(text: &str) -> Result<(u32, String), ParseError> {
    let heading = text.trim();
    let bad = || ParseError::BadHeading(heading.to_string());

    let digits = heading
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(heading.len());
    let rest = heading[digits..].strip_prefix('.').ok_or_else(bad)?;
    let id: u32 = heading[..digits].parse().map_err(|_| bad())?;
    match rest.trim() {
        "" => Err(bad()),
        prompt => Ok((id, prompt.to_string())),
    }
}
