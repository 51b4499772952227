//! Configuration Lines
//!
//! A [`ConfigLine`] is the ordered token list an action is built from. Every
//! keyword lookup removes the tokens it matched, so once an action has parsed
//! everything it understands, whatever is left over was not understood.

/// A keyword was given in a form the lookup does not accept
/// (for example `FLAG=yes` for a bare switch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Malformed;

/// Ordered, destructively consumed tokens of one action line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLine {
    words: Vec<String>,
    /// 1-based line number in the input, 0 when built programmatically.
    line_number: usize,
}

impl ConfigLine {
    /// Build a line from already tokenized words.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
            line_number: 0,
        }
    }

    /// Attach the input line number this record came from.
    pub fn at_line(mut self, line_number: usize) -> Self {
        self.line_number = line_number;
        self
    }

    /// Input line number, 0 if unknown.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// The tokens not consumed yet.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Number of tokens not consumed yet.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether every token has been consumed.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The action kind, i.e. the first token, without consuming it.
    pub fn kind(&self) -> Option<&str> {
        self.words.first().map(String::as_str)
    }

    /// Consume the first token.
    pub fn take_first(&mut self) -> Option<String> {
        if self.words.is_empty() {
            None
        } else {
            Some(self.words.remove(0))
        }
    }

    /// Append a token.
    pub fn push(&mut self, word: impl Into<String>) {
        self.words.push(word.into());
    }

    /// Consume the first `KEY=VALUE` token and return `VALUE`.
    ///
    /// A value wrapped in one pair of braces (`KEY={a b}`) is returned without
    /// them. Later occurrences of the same key are left in place.
    pub fn take_value(&mut self, key: &str) -> Option<String> {
        let index = self
            .words
            .iter()
            .position(|word| value_of(word, key).is_some())?;
        let word = self.words.remove(index);
        value_of(&word, key).map(|value| strip_braces(value).to_string())
    }

    /// Consume a bare switch keyword.
    ///
    /// Every bare occurrence of `key` is removed and `Ok(true)` returned if
    /// there was at least one. `KEY=...` is never a valid switch and yields
    /// [`Malformed`] without consuming anything.
    pub fn take_flag(&mut self, key: &str) -> Result<bool, Malformed> {
        if self.words.iter().any(|word| value_of(word, key).is_some()) {
            return Err(Malformed);
        }
        let before = self.words.len();
        self.words.retain(|word| word != key);
        Ok(self.words.len() != before)
    }

    /// Remove and return every remaining token.
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.words)
    }
}

fn value_of<'w>(word: &'w str, key: &str) -> Option<&'w str> {
    word.strip_prefix(key)?.strip_prefix('=')
}

fn strip_braces(value: &str) -> &str {
    value
        .strip_prefix('{')
        .and_then(|inner| inner.strip_suffix('}'))
        .map(str::trim)
        .unwrap_or(value)
}

/// Split a list value on commas and whitespace, dropping empty entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
