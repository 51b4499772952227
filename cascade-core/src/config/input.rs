//! Input Parsing
//!
//! Turns input text into one [`ConfigLine`] per action.
//!
//! # Syntax
//!
//! - `#` starts a comment that runs to the end of the line.
//! - Tokens are separated by whitespace, except inside braces:
//!   `MORE_THAN={RATIONAL R_0=4}` is a single token.
//! - `label: KIND ...` is shorthand for `KIND ... LABEL=label`.
//! - A line whose last token is `...` continues on the following lines until
//!   a line starting with `...`.

use crate::error::{Error, Result};

use super::line::ConfigLine;

const CONTINUATION: &str = "...";

/// Parse a whole input text into action lines.
pub fn parse_input(text: &str) -> Result<Vec<ConfigLine>> {
    let mut records = Vec::new();
    let mut pending: Option<(usize, Vec<String>)> = None;

    for (index, raw) in text.lines().enumerate() {
        let number = index + 1;
        let content = raw.split('#').next().unwrap_or_default();
        let mut words = tokenize(content, number)?;

        if let Some((start, mut collected)) = pending.take() {
            if words.first().map(String::as_str) == Some(CONTINUATION) {
                records.push(finish(collected, start));
            } else {
                collected.append(&mut words);
                pending = Some((start, collected));
            }
            continue;
        }

        if words.last().map(String::as_str) == Some(CONTINUATION) {
            words.pop();
            pending = Some((number, words));
            continue;
        }

        if !words.is_empty() {
            records.push(finish(words, number));
        }
    }

    if let Some((start, collected)) = pending {
        tracing::warn!(line = start, "continuation block not closed before end of input");
        records.push(finish(collected, start));
    }

    Ok(records)
}

fn finish(mut words: Vec<String>, number: usize) -> ConfigLine {
    if let Some(label) = words
        .first()
        .and_then(|first| first.strip_suffix(':'))
        .filter(|label| !label.is_empty())
        .map(str::to_string)
    {
        words.remove(0);
        words.push(format!("LABEL={label}"));
    }
    ConfigLine::new(words).at_line(number)
}

/// Split on whitespace while keeping brace groups together.
fn tokenize(content: &str, number: usize) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for c in content.chars() {
        match c {
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(Error::UnbalancedBraces { line: number })?;
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if depth != 0 {
        return Err(Error::UnbalancedBraces { line: number });
    }
    if !current.is_empty() {
        words.push(current);
    }
    Ok(words)
}
