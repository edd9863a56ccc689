//! Crate-wide error type.

use std::fmt;

/// The pipeline stage in which an error was raised.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Rewriting the string during derivation step `step` (0 = axiom check).
    Derivation { step: u32 },
    /// Walking the command string with the turtle.
    Interpretation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Derivation { step } => write!(f, "derivation step {step}"),
            Self::Interpretation => f.write_str("interpretation"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("unknown symbol '{symbol}' at index {index} during {stage}")]
    UnknownSymbol {
        symbol: char,
        index: usize,
        stage: Stage,
    },

    #[error("stack underflow: pop with empty stack{}", token_suffix(.index))]
    StackUnderflow { index: Option<usize> },

    #[error("stack overflow: push beyond max depth {depth}{}", token_suffix(.index))]
    StackOverflow { depth: usize, index: Option<usize> },

    #[error("radius ({radius}) and proportion ({proportion}) are mutually exclusive")]
    ConflictingRadiusMode { radius: f32, proportion: f32 },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("derivation step {step} produced {len} symbols (limit {limit})")]
    LengthLimitExceeded { step: u32, len: usize, limit: usize },

    #[error("cancelled during {stage}")]
    Cancelled { stage: Stage },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(String),
}

fn token_suffix(index: &Option<usize>) -> String {
    index
        .map(|i| format!(" at token index {i}"))
        .unwrap_or_default()
}

impl Error {
    /// Attaches a token index to turtle stack errors raised outside the interpreter.
    pub(crate) fn at_token(self, token: usize) -> Self {
        match self {
            Self::StackUnderflow { .. } => Self::StackUnderflow { index: Some(token) },
            Self::StackOverflow { depth, .. } => Self::StackOverflow {
                depth,
                index: Some(token),
            },
            other => other,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
