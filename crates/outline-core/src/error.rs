//! The domain-error taxonomy for conditions the core can detect on its own,
//! as opposed to malformed external input, which is the caller's concern.

/// Errors raised before or during the pipeline that are not malformed input
/// but violate a precondition of the algorithms themselves.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DomainError {
    /// The distance matrix has zero taxa.
    #[error("distance matrix has no taxa")]
    EmptyInput,
    /// The flattened distance data does not have `n * n` entries.
    #[error("expected a {expected}x{expected} distance matrix, found {found} entries")]
    DimensionMismatch {
        /// The number of taxa the matrix was declared to have.
        expected: usize,
        /// The number of entries actually supplied.
        found: usize,
    },
    /// An out-group (or other taxon reference) named a taxon outside `1..=n`.
    #[error("unknown taxon id {taxon}")]
    UnknownTaxon {
        /// The offending taxon id.
        taxon: usize,
    },
    /// `D[i][j] != D[j][i]` beyond floating-point tolerance.
    #[error("distance matrix is not symmetric at ({i}, {j})")]
    AsymmetricMatrix {
        /// Row index (0-based).
        i: usize,
        /// Column index (0-based).
        j: usize,
    },
    /// The out-group is empty or covers every taxon.
    #[error("out-group must be a non-empty proper subset of the taxa")]
    InvalidOutGroup,
}
