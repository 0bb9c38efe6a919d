//! User interaction
//!
//! Selection is a pure function of `(items, default_index, answer)`;
//! rendering and input live behind the [`Interaction`] trait so the
//! resolution logic never touches the terminal.

use std::io::{self, BufRead, Write};

use crate::error::{Error, Result};

/// Outcome of one answer to a selection prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Index(usize),
    Quit,
    Invalid,
}

/// Interpret a typed answer: empty picks the default, `q` quits, and
/// `1..=len` picks an item
pub fn parse_choice(answer: &str, len: usize, default_index: usize) -> Choice {
    let answer = answer.trim();
    if answer.is_empty() {
        return if len == 0 {
            Choice::Invalid
        } else {
            Choice::Index(default_index.min(len - 1))
        };
    }
    if answer.eq_ignore_ascii_case("q") {
        return Choice::Quit;
    }
    match answer.parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Choice::Index(n - 1),
        _ => Choice::Invalid,
    }
}

/// Selection surface and confirmations
pub trait Interaction {
    /// Pick one of `labels`. Quitting yields [`Error::Cancelled`].
    fn select(&mut self, title: &str, labels: &[String], default_index: usize) -> Result<usize>;

    fn confirm(&mut self, question: &str, default: bool) -> bool;

    /// Free-form line of input (file paths, serial ports)
    fn input(&mut self, prompt: &str) -> Result<String>;
}

/// Select an item through `ui`, labelling each with `label`
pub fn select_item<'a, T>(
    ui: &mut dyn Interaction,
    title: &str,
    items: &'a [T],
    default_index: usize,
    label: impl Fn(usize, &T) -> String,
) -> Result<&'a T> {
    let labels: Vec<String> = items.iter().enumerate().map(|(i, t)| label(i, t)).collect();
    let index = ui.select(title, &labels, default_index)?;
    items.get(index).ok_or(Error::Cancelled)
}

/// Line-oriented prompts on stdin/stdout
pub struct Terminal;

impl Terminal {
    fn read_line(&self) -> Result<String> {
        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line).map_err(|_| Error::Cancelled)?;
        if read == 0 {
            // stdin closed
            return Err(Error::Cancelled);
        }
        Ok(line.trim().to_string())
    }
}

impl Interaction for Terminal {
    fn select(&mut self, title: &str, labels: &[String], default_index: usize) -> Result<usize> {
        if labels.is_empty() {
            return Err(Error::Cancelled);
        }
        let default_index = default_index.min(labels.len() - 1);

        println!();
        println!("{}", title);
        for (i, label) in labels.iter().enumerate() {
            let marker = if i == default_index { "→" } else { " " };
            println!("{} [{}] {}", marker, i + 1, label);
        }

        loop {
            print!(
                "Select [1-{}] (Enter = {}, q = quit): ",
                labels.len(),
                default_index + 1
            );
            let _ = io::stdout().flush();

            match parse_choice(&self.read_line()?, labels.len(), default_index) {
                Choice::Index(i) => return Ok(i),
                Choice::Quit => return Err(Error::Cancelled),
                Choice::Invalid => println!("Invalid choice, try again."),
            }
        }
    }

    fn confirm(&mut self, question: &str, default: bool) -> bool {
        let hint = if default { "Y/n" } else { "y/N" };
        print!("{} ({}): ", question, hint);
        let _ = io::stdout().flush();

        match self.read_line() {
            Ok(answer) if answer.is_empty() => default,
            Ok(answer) => answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"),
            Err(_) => false,
        }
    }

    fn input(&mut self, prompt: &str) -> Result<String> {
        print!("{}: ", prompt);
        let _ = io::stdout().flush();
        let line = self.read_line()?;
        if line.eq_ignore_ascii_case("exit") {
            return Err(Error::Cancelled);
        }
        Ok(line)
    }
}

/// Non-interactive mode: every prompt takes its default
pub struct Unattended;

impl Interaction for Unattended {
    fn select(&mut self, _title: &str, labels: &[String], default_index: usize) -> Result<usize> {
        match parse_choice("", labels.len(), default_index) {
            Choice::Index(i) => Ok(i),
            _ => Err(Error::Cancelled),
        }
    }

    fn confirm(&mut self, _question: &str, default: bool) -> bool {
        default
    }

    fn input(&mut self, _prompt: &str) -> Result<String> {
        Err(Error::Cancelled)
    }
}
