//! errors.rs
//!
//! Hard failures are `PdfError`. Everything recoverable (bad operators,
//! missing resources, broken filters) is collected as `PdfWarnMsg` on the
//! warning list of the parse or render call and processing continues.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PdfError {
    /// The byte stream violates the PDF grammar at a known syntactic slot
    #[error("malformed syntax at offset {offset}: {msg}")]
    MalformedSyntax { offset: usize, msg: String },

    /// A required key is missing or has the wrong type
    #[error("dictionary error: {0}")]
    Dictionary(String),

    /// Wrong object type at a slot where a specific type is required
    #[error("type error: expected {expected}, found {found}")]
    Type {
        expected: &'static str,
        found: &'static str,
    },

    /// A filter failed; the stream yields empty bytes from here on
    #[error("corrupt stream: {0}")]
    CorruptStream(String),

    /// The file has no usable cross-reference table
    #[error("invalid cross-reference table: {0}")]
    InvalidXref(String),

    /// The document trailer is missing or unusable
    #[error("invalid trailer: {0}")]
    InvalidTrailer(String),

    /// A known optional construct is present but not implemented
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// A page index outside the page tree
    #[error("page {0} out of bounds")]
    PageOutOfBounds(usize),

    /// The render call was cancelled between operators
    #[error("render cancelled")]
    Cancelled,

    /// Back-end allocation failure or other terminal condition
    #[error("fatal: {0}")]
    Fatal(String),
}

impl PdfError {
    pub(crate) fn syntax(offset: usize, msg: impl Into<String>) -> Self {
        PdfError::MalformedSyntax {
            offset,
            msg: msg.into(),
        }
    }
}

/// Non-fatal diagnostic emitted while parsing or rendering a page.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PdfWarnMsg {
    pub page: usize,
    pub op_id: usize,
    pub severity: &'static str,
    pub msg: String,
}

impl PdfWarnMsg {
    pub const ERROR: &'static str = "error";
    pub const WARNING: &'static str = "warning";
    pub const INFO: &'static str = "info";

    pub fn error(page: usize, op_id: usize, e: String) -> Self {
        PdfWarnMsg {
            page,
            op_id,
            severity: Self::ERROR,
            msg: e,
        }
    }

    pub fn warning(page: usize, op_id: usize, e: String) -> Self {
        PdfWarnMsg {
            page,
            op_id,
            severity: Self::WARNING,
            msg: e,
        }
    }

    pub fn info(page: usize, op_id: usize, e: String) -> Self {
        PdfWarnMsg {
            page,
            op_id,
            severity: Self::INFO,
            msg: e,
        }
    }
}
