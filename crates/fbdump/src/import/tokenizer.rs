//! Line-fed SQL statement tokenizer.
//!
//! Splits a dump into statements while tracking quoted strings, block
//! comments and the active terminator (`SET TERM`) across line boundaries.

use tracing::{debug, warn};

/// Characters stripped from the very start of a stream.
const STREAM_PREFIX_CHARS: &[char] = &['\u{FEFF}', '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}'];

/// Coarse statement classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Insert,
    Update,
    Delete,
    Merge,
    Set,
    Commit,
    Other,
}

impl StatementKind {
    /// Classify statement text by its leading keyword.
    pub fn classify(text: &str) -> Self {
        let text = text.trim().trim_end_matches(';').trim_end();
        let mut words = text.split_whitespace();
        let first = words.next().unwrap_or_default().to_ascii_uppercase();
        match first.as_str() {
            "INSERT" => StatementKind::Insert,
            "UPDATE" => StatementKind::Update,
            "DELETE" => StatementKind::Delete,
            "MERGE" => StatementKind::Merge,
            "SET" => StatementKind::Set,
            "COMMIT" => match (words.next(), words.next()) {
                (None, _) => StatementKind::Commit,
                (Some(w), None) if w.eq_ignore_ascii_case("WORK") => StatementKind::Commit,
                _ => StatementKind::Other,
            },
            _ => StatementKind::Other,
        }
    }
}

/// One complete statement, terminator stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub text: String,
    pub kind: StatementKind,
    /// 1-based line where the statement's first character appeared.
    pub line: u64,
}

impl Statement {
    fn new(text: String, line: u64) -> Self {
        let kind = StatementKind::classify(&text);
        Self { text, kind, line }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    InString,
    InBlockComment,
}

/// Scanner state carried between lines.
#[derive(Debug)]
struct ParserState {
    mode: Mode,
    buffer: String,
    terminator: char,
    start_line: Option<u64>,
}

impl Default for ParserState {
    fn default() -> Self {
        Self {
            mode: Mode::Normal,
            buffer: String::new(),
            terminator: ';',
            start_line: None,
        }
    }
}

impl ParserState {
    fn is_pending(&self) -> bool {
        self.mode != Mode::Normal || !self.buffer.trim().is_empty()
    }

    fn push(&mut self, c: char, line: u64) {
        if self.buffer.is_empty() && c.is_whitespace() {
            return;
        }
        if self.start_line.is_none() {
            self.start_line = Some(line);
        }
        self.buffer.push(c);
    }

    fn take(&mut self, line: u64) -> Option<Statement> {
        let text = self.buffer.trim();
        let stmt = if text.is_empty() {
            None
        } else {
            Some(Statement::new(
                text.to_string(),
                self.start_line.unwrap_or(line),
            ))
        };
        self.buffer.clear();
        self.start_line = None;
        stmt
    }
}

/// Header and terminator directives handled by the tokenizer itself.
enum Directive {
    SetTerm(char),
    Header,
}

fn parse_directive(line: &str) -> Option<Directive> {
    let mut words = line.split_whitespace();
    if !words.next()?.eq_ignore_ascii_case("SET") {
        return None;
    }
    let second = words.next()?;
    if second.eq_ignore_ascii_case("TERM") {
        let terminator = words.next()?.chars().next()?;
        Some(Directive::SetTerm(terminator))
    } else if second.eq_ignore_ascii_case("NAMES") {
        Some(Directive::Header)
    } else if second.eq_ignore_ascii_case("SQL")
        && words.next().is_some_and(|w| w.eq_ignore_ascii_case("DIALECT"))
    {
        Some(Directive::Header)
    } else {
        None
    }
}

/// Stateful statement splitter. Feed it one line at a time.
#[derive(Debug)]
pub struct StatementTokenizer {
    state: ParserState,
    line: u64,
}

impl Default for StatementTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementTokenizer {
    /// Create a tokenizer positioned at the start of a stream.
    pub fn new() -> Self {
        Self {
            state: ParserState::default(),
            line: 0,
        }
    }

    /// Active statement terminator.
    pub fn terminator(&self) -> char {
        self.state.terminator
    }

    /// Number of lines fed so far.
    pub fn lines_read(&self) -> u64 {
        self.line
    }

    /// Consume one line (with or without its line ending) and return the
    /// statements it completed.
    pub fn feed(&mut self, line: &str) -> Vec<Statement> {
        self.line += 1;
        let mut line = line.strip_suffix('\n').unwrap_or(line);
        line = line.strip_suffix('\r').unwrap_or(line);
        if self.line == 1 {
            line = line.trim_start_matches(STREAM_PREFIX_CHARS);
        }

        if !self.state.is_pending() {
            match parse_directive(line) {
                Some(Directive::SetTerm(terminator)) => {
                    debug!(
                        "Line {}: statement terminator changed from '{}' to '{}'",
                        self.line, self.state.terminator, terminator
                    );
                    self.state.terminator = terminator;
                    self.state.buffer.clear();
                    return Vec::new();
                }
                Some(Directive::Header) => {
                    self.state.buffer.clear();
                    return Vec::new();
                }
                None => {}
            }
        }

        let mut out = Vec::new();
        let state = &mut self.state;
        let line_no = self.line;
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            match state.mode {
                Mode::InBlockComment => {
                    if c == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        state.mode = Mode::Normal;
                    }
                }
                Mode::InString => {
                    state.push(c, line_no);
                    if c == '\'' {
                        if chars.peek() == Some(&'\'') {
                            chars.next();
                            state.push('\'', line_no);
                        } else {
                            state.mode = Mode::Normal;
                        }
                    }
                }
                Mode::Normal => {
                    if c == '-' && chars.peek() == Some(&'-') {
                        break;
                    } else if c == '/' && chars.peek() == Some(&'*') {
                        chars.next();
                        state.mode = Mode::InBlockComment;
                        // Keep the tokens on either side of the comment apart.
                        if state.buffer.chars().last().is_some_and(|l| !l.is_whitespace()) {
                            state.buffer.push(' ');
                        }
                    } else if c == '\'' {
                        state.push(c, line_no);
                        state.mode = Mode::InString;
                    } else if c == state.terminator {
                        out.extend(state.take(line_no));
                    } else {
                        state.push(c, line_no);
                    }
                }
            }
        }

        if state.mode != Mode::InBlockComment {
            state.push('\n', line_no);
        }
        out
    }

    /// Flush the residual statement at end of stream, if any.
    pub fn finish(&mut self) -> Option<Statement> {
        match self.state.mode {
            Mode::InString => warn!("End of input inside a quoted string"),
            Mode::InBlockComment => warn!("End of input inside a block comment"),
            Mode::Normal => {}
        }
        self.state.mode = Mode::Normal;
        self.state.take(self.line)
    }
}
