use std::{fmt, sync::Arc};

use thiserror::Error;

use super::{encoder::EncodeError, symbols::SymbolError};

/// Comment marker, the rest of the line is ignored.
pub const COMMENT: char = ';';
/// Leading marker of an assembler directive.
pub const DIRECTIVE: char = '.';
/// Separates several statements on one line.
pub const STATEMENT_SEPARATOR: &str = ":";

/// File and line a statement was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePosition {
    pub file: Arc<str>,
    pub line: usize,
}

impl SourcePosition {
    pub fn new(file: Arc<str>, line: usize) -> Self {
        Self { file, line }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Problems found while assembling. None of them stop the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    #[error("Unknown directive: {0}")]
    UnknownDirective(String),
    #[error("Directive not supported: {0}")]
    UnsupportedDirective(String),
    #[error("Missing operand for {0}")]
    MissingOperand(String),
    #[error("Invalid operand for {directive}: {operand}")]
    InvalidOperand { directive: String, operand: String },
    #[error("Unable to include {path}: {reason}")]
    IncludeFailed { path: String, reason: String },
    #[error("Includes nested deeper than {0} levels")]
    IncludeTooDeep(usize),
    #[error("Line is not in a .code or .data segment: {0}")]
    Unrouted(String),
    #[error(transparent)]
    Symbol(#[from] SymbolError),
    #[error("{statement}: {error}")]
    Encode { statement: String, error: EncodeError },
    #[error("Unknown data keyword: {0}")]
    UnknownDataKeyword(String),
    #[error("No data given for {0}")]
    EmptyData(String),
    #[error("Unresolved value in data statement: {0}")]
    UnresolvedData(String),
    #[error("Address {0:#06x} is outside of memory")]
    OutOfRange(usize),
    #[error("Address {address:#06x} is below the image start {start:#06x}")]
    BelowStart { address: usize, start: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{position}: {kind}")]
pub struct Diagnostic {
    pub position: SourcePosition,
    pub kind: DiagnosticKind,
}

/// Log a diagnostic and keep it for the caller.
pub(crate) fn report(
    diagnostics: &mut Vec<Diagnostic>,
    position: &SourcePosition,
    kind: DiagnosticKind,
) {
    let diagnostic = Diagnostic {
        position: position.clone(),
        kind,
    };
    tracing::warn!("{}", diagnostic);
    diagnostics.push(diagnostic);
}

/// Cut a line at its comment marker.
///
/// A `;` inside a character literal such as `';'` does not start a comment.
pub fn strip_comment(line: &str) -> &str {
    let mut chars = line.char_indices().peekable();
    while let Some((ix, ch)) = chars.next() {
        match ch {
            '\'' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '\''))) {
                    chars.next();
                }
            }
            COMMENT => return &line[..ix],
            _ => (),
        }
    }
    line
}

/// Split a line into tokens on whitespace and operand separators.
pub fn tokenize(line: &str) -> Vec<String> {
    line.split(|ch: char| ch.is_whitespace() || ch == ',')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split tokens into statements at standalone `:` tokens.
pub fn statements(tokens: &[String]) -> impl Iterator<Item = &[String]> {
    tokens
        .split(|token| token == STATEMENT_SEPARATOR)
        .filter(|statement| !statement.is_empty())
}
