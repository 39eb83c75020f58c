//! The error taxonomy surfaced to the process exit code: malformed input is
//! distinguished from a domain precondition failure and from I/O failure.

/// Everything that can make the CLI fail before it prints a result.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// A line of the distance-matrix input did not parse.
    #[error("line {line}: {detail}")]
    Format {
        /// 1-based line number within the input.
        line: usize,
        /// What was wrong with the line.
        detail: String,
    },
    /// The core rejected the parsed input.
    #[error(transparent)]
    Domain(#[from] outline_core::DomainError),
    /// Reading the input or writing an output file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
