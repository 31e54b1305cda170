use thiserror::Error;

/// Errors raised while reading a neural-net weight file.
#[derive(Error, Debug)]
pub enum NetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing header terminator '#'")]
    MissingHeader,

    #[error("missing topology line containing '='")]
    MissingTopology,

    #[error("unexpected end of file while reading {0}")]
    UnexpectedEof(&'static str),

    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },

    #[error("declared {declared} {kind} ranges but found {found}")]
    RangeCountMismatch {
        kind: &'static str,
        declared: usize,
        found: usize,
    },

    #[error("input {index} has a degenerate range [{min}, {max}]")]
    DegenerateRange { index: usize, min: f64, max: f64 },

    #[error("invalid topology: {0}")]
    InvalidTopology(String),
}
