//! Answer sources for interactive commands.
//!
//! Commands ask questions through [`AnswerSource`] so the same flow runs
//! against a terminal or a pre-seeded queue of answers.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use crate::error::{NscError, Result};

/// One question put to the user.
#[derive(Debug, Clone, Copy)]
pub enum Question<'a> {
    /// Free text. An empty answer means `default`.
    Text { prompt: &'a str, default: &'a str },
    /// Yes or no.
    Confirm { prompt: &'a str, default: bool },
    /// Pick one of `choices` by index.
    Select {
        prompt: &'a str,
        choices: &'a [String],
    },
}

impl Question<'_> {
    pub fn prompt(&self) -> &str {
        match self {
            Question::Text { prompt, .. }
            | Question::Confirm { prompt, .. }
            | Question::Select { prompt, .. } => prompt,
        }
    }
}

/// An answer to a [`Question`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Text(String),
    Bool(bool),
    Choice(usize),
}

/// Source of answers for interactive prompts.
pub trait AnswerSource {
    /// Answer `question`. The answer kind must match the question kind.
    fn next_answer(&mut self, question: &Question<'_>) -> Result<Answer>;

    /// Ask for text, falling back to `default` on an empty answer.
    fn text(&mut self, prompt: &str, default: &str) -> Result<String> {
        match self.next_answer(&Question::Text { prompt, default })? {
            Answer::Text(t) if t.trim().is_empty() => Ok(default.to_string()),
            Answer::Text(t) => Ok(t.trim().to_string()),
            other => Err(mismatch(prompt, &other)),
        }
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        match self.next_answer(&Question::Confirm { prompt, default })? {
            Answer::Bool(b) => Ok(b),
            other => Err(mismatch(prompt, &other)),
        }
    }

    /// Ask for one of `choices`, returning its index.
    fn select(&mut self, prompt: &str, choices: &[String]) -> Result<usize> {
        match self.next_answer(&Question::Select { prompt, choices })? {
            Answer::Choice(i) if i < choices.len() => Ok(i),
            Answer::Choice(i) => Err(NscError::validation(
                "prompt",
                format!("{i} is not a valid choice for {prompt:?}"),
            )),
            other => Err(mismatch(prompt, &other)),
        }
    }
}

fn mismatch(prompt: &str, answer: &Answer) -> NscError {
    NscError::validation(
        "prompt",
        format!("answer {answer:?} does not fit question {prompt:?}"),
    )
}

// ── Queue ─────────────────────────────────────────────────────────────────────

/// Drains a pre-seeded queue of answers, in order.
#[derive(Debug, Clone, Default)]
pub struct QueueAnswers {
    answers: VecDeque<Answer>,
}

impl QueueAnswers {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl AnswerSource for QueueAnswers {
    fn next_answer(&mut self, question: &Question<'_>) -> Result<Answer> {
        self.answers.pop_front().ok_or_else(|| {
            NscError::validation(
                "prompt",
                format!("no answer queued for {:?}", question.prompt()),
            )
        })
    }
}

// ── Terminal ──────────────────────────────────────────────────────────────────

/// Reads one line per question from `input`, writing prompts to `output`.
pub struct TerminalAnswers<R, W> {
    input: R,
    output: W,
}

impl TerminalAnswers<std::io::StdinLock<'static>, std::io::Stderr> {
    /// Prompts on stderr, answers from stdin.
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalAnswers<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_line(&mut self, prompt: &str) -> Result<String> {
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(NscError::validation(
                "prompt",
                format!("no answer for {prompt:?}"),
            ));
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> AnswerSource for TerminalAnswers<R, W> {
    fn next_answer(&mut self, question: &Question<'_>) -> Result<Answer> {
        match *question {
            Question::Text { prompt, default } => {
                if default.is_empty() {
                    write!(self.output, "? {prompt}: ")?;
                } else {
                    write!(self.output, "? {prompt} ({default}): ")?;
                }
                Ok(Answer::Text(self.read_line(prompt)?))
            }
            Question::Confirm { prompt, default } => {
                let hint = if default { "Y/n" } else { "y/N" };
                write!(self.output, "? {prompt} ({hint}): ")?;
                let line = self.read_line(prompt)?.to_lowercase();
                match line.as_str() {
                    "" => Ok(Answer::Bool(default)),
                    "y" | "yes" | "true" => Ok(Answer::Bool(true)),
                    "n" | "no" | "false" => Ok(Answer::Bool(false)),
                    _ => Err(NscError::validation(
                        "prompt",
                        format!("{line:?} is not a yes or no answer"),
                    )),
                }
            }
            Question::Select { prompt, choices } => {
                writeln!(self.output, "? {prompt}")?;
                for (i, choice) in choices.iter().enumerate() {
                    writeln!(self.output, "  [{i}] {choice}")?;
                }
                write!(self.output, "> ")?;
                let line = self.read_line(prompt)?;
                line.parse::<usize>().map(Answer::Choice).map_err(|_| {
                    NscError::validation("prompt", format!("{line:?} is not a choice number"))
                })
            }
        }
    }
}
