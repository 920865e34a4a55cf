//! Client-side prepared statement support
//!
//! Servers that only speak the text protocol cannot prepare statements, so
//! `?` placeholders are located on the client and replaced with literals
//! right before the statement text is sent.

use crate::{ProbeError, Result, Value};

/// SQL text split at its `?` placeholders.
///
/// Question marks inside string literals, quoted identifiers and comments
/// are left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderTemplate {
    sql: String,
    /// Text between placeholders; always one longer than the placeholder count
    fragments: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    Quoted(char),
    LineComment,
    BlockComment,
}

impl PlaceholderTemplate {
    /// Scan `sql` for placeholders
    pub fn parse(sql: &str) -> Self {
        let mut fragments = Vec::new();
        let mut current = String::with_capacity(sql.len());
        let mut state = ScanState::Normal;
        let mut chars = sql.chars().peekable();

        while let Some(c) = chars.next() {
            match state {
                ScanState::Normal => match c {
                    '?' => {
                        fragments.push(std::mem::take(&mut current));
                        continue;
                    }
                    '\'' | '"' | '`' => state = ScanState::Quoted(c),
                    '#' => state = ScanState::LineComment,
                    '-' if chars.peek() == Some(&'-') => {
                        current.push(c);
                        let second = chars.next().unwrap_or('-');
                        current.push(second);
                        // MySQL only treats `--` as a comment when followed by whitespace
                        if chars.peek().is_none_or(|n| n.is_whitespace()) {
                            state = ScanState::LineComment;
                        }
                        continue;
                    }
                    '/' if chars.peek() == Some(&'*') => {
                        current.push(c);
                        current.push(chars.next().unwrap_or('*'));
                        state = ScanState::BlockComment;
                        continue;
                    }
                    _ => {}
                },
                ScanState::Quoted(quote) => {
                    if c == '\\' && quote != '`' {
                        current.push(c);
                        if let Some(escaped) = chars.next() {
                            current.push(escaped);
                        }
                        continue;
                    }
                    if c == quote {
                        state = ScanState::Normal;
                    }
                }
                ScanState::LineComment => {
                    if c == '\n' {
                        state = ScanState::Normal;
                    }
                }
                ScanState::BlockComment => {
                    if c == '*' && chars.peek() == Some(&'/') {
                        current.push(c);
                        current.push(chars.next().unwrap_or('/'));
                        state = ScanState::Normal;
                        continue;
                    }
                }
            }
            current.push(c);
        }
        fragments.push(current);

        Self {
            sql: sql.to_string(),
            fragments,
        }
    }

    /// Original SQL text
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of `?` placeholders
    pub fn placeholder_count(&self) -> usize {
        self.fragments.len() - 1
    }

    /// Substitute `params` in order, rendering each with `literal`.
    ///
    /// The number of parameters must match the placeholder count exactly.
    pub fn render<F>(&self, params: &[Value], literal: F) -> Result<String>
    where
        F: Fn(&Value) -> String,
    {
        if params.len() != self.placeholder_count() {
            return Err(ProbeError::Query(format!(
                "statement expects {} parameter(s) but {} were supplied",
                self.placeholder_count(),
                params.len()
            )));
        }

        let mut out = String::with_capacity(self.sql.len() + params.len() * 8);
        for (fragment, param) in self.fragments.iter().zip(params) {
            out.push_str(fragment);
            out.push_str(&literal(param));
        }
        if let Some(tail) = self.fragments.last() {
            out.push_str(tail);
        }
        Ok(out)
    }
}

/// Parameter slots of a prepared statement, addressed 1-based
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterBindings {
    slots: Vec<Option<Value>>,
}

impl ParameterBindings {
    /// Create `count` empty slots
    pub fn new(count: usize) -> Self {
        Self {
            slots: vec![None; count],
        }
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the statement takes no parameters
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Bind `value` to the 1-based parameter `index`
    pub fn bind(&mut self, index: usize, value: Value) -> Result<()> {
        if index == 0 || index > self.slots.len() {
            return Err(ProbeError::Query(format!(
                "parameter index {} is out of range (1..={})",
                index,
                self.slots.len()
            )));
        }
        self.slots[index - 1] = Some(value);
        Ok(())
    }

    /// Unbind every parameter
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    /// Bound values in order, or an error naming the first unbound parameter
    pub fn values(&self) -> Result<Vec<Value>> {
        self.slots
            .iter()
            .enumerate()
            .map(|(idx, slot)| {
                slot.clone().ok_or_else(|| {
                    ProbeError::Query(format!("no value specified for parameter {}", idx + 1))
                })
            })
            .collect()
    }
}
