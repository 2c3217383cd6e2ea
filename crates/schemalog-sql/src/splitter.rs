//! Turns the raw text of a migration file into standalone statements.
//!
//! Quoting rules:
//! - `'...'` and `"..."` are string literals; a backslash escapes the next
//!   character and a doubled quote (`''`) closes and reopens the literal.
//! - `` `...` `` is a quoted identifier; backslash has no special meaning.
//!
//! Comment rules (outside quotes only):
//! - `--` and `#` start a comment that runs to end of line;
//! - `/* ... */` is a block comment and may span lines.

/// Delimiter used when none is configured.
pub const DEFAULT_DELIMITER: &str = ";";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    Quoted(char),
    LineComment,
    BlockComment,
}

fn is_quote(c: char) -> bool {
    matches!(c, '\'' | '"' | '`')
}

/// Backslash escapes apply inside string literals but not quoted identifiers.
fn escapes_with_backslash(quote: char) -> bool {
    quote != '`'
}

/// Strip line and block comments, leaving quoted text untouched.
///
/// A line comment keeps its terminating newline and a block comment is
/// replaced by a single space, so tokens on either side never fuse.
pub fn remove_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut state = State::Normal;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Normal => match c {
                c if is_quote(c) => {
                    state = State::Quoted(c);
                    out.push(c);
                }
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    state = State::LineComment;
                }
                '#' => state = State::LineComment,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = State::BlockComment;
                    out.push(' ');
                }
                _ => out.push(c),
            },
            State::Quoted(quote) => {
                out.push(c);
                if c == '\\' && escapes_with_backslash(quote) {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                } else if c == quote {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if c == '\n' {
                    out.push('\n');
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Normal;
                }
            }
        }
    }

    out
}

/// Split comment-free SQL on `delimiter` wherever it appears outside a
/// quoted literal.
///
/// The delimiter is not part of the returned statements, each statement is
/// trimmed, and whitespace-only fragments are dropped. An empty delimiter
/// yields the whole trimmed text as a single statement.
pub fn split_statements(sql: &str, delimiter: &str) -> Vec<String> {
    let mut statements = Vec::new();
    if delimiter.is_empty() {
        push_trimmed(&mut statements, sql);
        return statements;
    }

    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;
    let mut iter = sql.char_indices();

    while let Some((i, c)) = iter.next() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' && escapes_with_backslash(q) {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None if is_quote(c) => quote = Some(c),
            None => {
                if sql[i..].starts_with(delimiter) {
                    push_trimmed(&mut statements, &sql[start..i]);
                    start = i + delimiter.len();
                    for _ in delimiter.chars().skip(1) {
                        iter.next();
                    }
                }
            }
        }
    }

    push_trimmed(&mut statements, &sql[start..]);
    statements
}

fn push_trimmed(statements: &mut Vec<String>, fragment: &str) {
    let fragment = fragment.trim();
    if !fragment.is_empty() {
        statements.push(fragment.to_string());
    }
}

/// Comment removal followed by splitting, bound to one delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementSplitter {
    delimiter: String,
}

impl StatementSplitter {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
        }
    }

    /// Produce the ordered statements contained in a migration file's text.
    pub fn split(&self, sql: &str) -> Vec<String> {
        split_statements(&remove_comments(sql), &self.delimiter)
    }
}

impl Default for StatementSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}
