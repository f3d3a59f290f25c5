//! Error types
//!
//! Construction-time failures (encoding selection, path syntax, printer
//! misuse) are ordinary `Result` errors. Scan-time failures are carried
//! inside the `ErrorOccurred` event instead, as a kind plus a
//! human-readable message.

use thiserror::Error;

/// Errors returned from fallible crate operations
#[derive(Debug, Error)]
pub enum Error {
    /// Encoding identifier not recognized at construction
    #[error("unsupported encoding: {0:?}")]
    UnsupportedEncoding(String),

    /// Path expression failed to parse
    #[error("invalid path expression {expr:?}: {reason}")]
    PathSyntax { expr: String, reason: &'static str },

    /// Printer operation called in a state that does not permit it
    #[error("printer state violation: {0}")]
    PrinterState(&'static str),
}

/// Kind of a scan-time failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanErrorKind {
    /// Codec cannot decode the byte sequence at the current position
    MalformedCharacter,
    /// Character is illegal in the current lexer state
    UnexpectedCharacter,
    /// Entity reference not present in the entity map
    UnknownEntity,
    /// Close-tag name differs from the tag-stack top
    TagMismatch,
    /// End of data with an open element or unterminated construct
    UnclosedDocument,
}

impl ScanErrorKind {
    /// Human-readable label
    pub fn name(self) -> &'static str {
        match self {
            ScanErrorKind::MalformedCharacter => "MalformedCharacter",
            ScanErrorKind::UnexpectedCharacter => "UnexpectedCharacter",
            ScanErrorKind::UnknownEntity => "UnknownEntity",
            ScanErrorKind::TagMismatch => "TagMismatch",
            ScanErrorKind::UnclosedDocument => "UnclosedDocument",
        }
    }
}

/// A scan failure: the payload of an `ErrorOccurred` event
#[derive(Debug, Clone)]
pub struct ScanError {
    kind: ScanErrorKind,
    message: String,
}

impl ScanError {
    pub fn new(kind: ScanErrorKind, message: impl Into<String>) -> Self {
        ScanError {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ScanErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
