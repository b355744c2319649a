//! Confirmation gate in front of destructive steps.

use crate::Result;
use std::collections::VecDeque;
use std::io::{BufRead, Write};

/// Asks the user yes/no questions.
///
/// The answer to an empty or unrecognised reply is `default`: questions
/// printed as `(Y/n)` default to yes, `(y/N)` to no.
pub trait Prompter {
    /// Prints `question` and returns the user's answer.
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool>;
}

/// Interprets a reply the way the prompts advertise.
///
/// A `(Y/n)` question only says no to `n`; a `(y/N)` question only says yes
/// to `y`.
pub fn parse_answer(reply: &str, default: bool) -> bool {
    let reply = reply.trim().to_lowercase();
    if default {
        reply != "n"
    } else {
        reply == "y"
    }
}

fn suffix(default: bool) -> &'static str {
    if default {
        "(Y/n)"
    } else {
        "(y/N)"
    }
}

/// Prompts on stdout and reads answers from stdin.
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let mut stdout = std::io::stdout();
        writeln!(stdout, "{} {}", question, suffix(default))?;
        stdout.flush()?;

        let mut line = String::new();
        let read = std::io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            // stdin closed: take the safe default
            return Ok(default);
        }
        Ok(parse_answer(&line, default))
    }
}

/// Answers questions from a fixed script.
///
/// Once the script runs out every question gets its default answer. The
/// questions asked are kept for inspection.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    /// Questions asked so far, in order
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    /// Creates a prompter replying with `answers` in order.
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        self.asked.push(question.to_string());
        Ok(match self.answers.pop_front() {
            Some(reply) => parse_answer(&reply, default),
            None => default,
        })
    }
}
