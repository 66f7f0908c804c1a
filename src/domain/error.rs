//! Domain error types

use thiserror::Error;

/// Errors that can occur while driving the AOTF
#[derive(Error, Debug)]
pub enum AotfError {
    /// Argument failed local validation. Never reaches the transport.
    #[error("{field} out of range: {value} not in [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Active channel must first be selected")]
    ChannelNotSelected,

    /// Bytes arrived but did not match the expected reply grammar.
    /// `line` is 1-based when the failure is tied to one reply line.
    #[error("Malformed reply{}: {context}", .line.map(|l| format!(" (line {l})")).unwrap_or_default())]
    MalformedReply {
        line: Option<usize>,
        context: String,
    },

    #[error("Unrecognized device code: '{raw}'")]
    UnrecognizedCode { raw: String },

    #[error("Reply truncated: timed out after {received} bytes")]
    Truncated { received: usize },

    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AotfError {
    pub(crate) fn malformed(context: impl Into<String>) -> Self {
        Self::MalformedReply {
            line: None,
            context: context.into(),
        }
    }

    pub(crate) fn malformed_line(line: usize, context: impl Into<String>) -> Self {
        Self::MalformedReply {
            line: Some(line),
            context: context.into(),
        }
    }
}

/// Result type alias for AOTF operations
pub type AotfResult<T> = Result<T, AotfError>;
