//! Computes a phylogenetic outline: a planar network drawn from a circular
//! split system fitted to a distance matrix by Neighbor-Net.
//!
//! The pipeline is [`compute_cycle`](nnet::compute_cycle) (order the taxa
//! on a cycle), [`ls::solve`] (fit non-negative split weights to that
//! cycle), then [`outline::compute`] (lay the splits out as a planar
//! graph, optionally rooted). [`run`] wires all three stages together.

pub mod error;
pub mod ls;
pub mod matrix;
pub mod nnet;
pub mod outline;
pub mod splits;

pub use error::DomainError;
pub use matrix::DistanceMatrix;
pub use outline::{compute as compute_outline, OutlineEdge, OutlineGraph, OutlineNode};
pub use splits::{Cycle, Split};

/// The full result of running the pipeline: the (possibly rooted) taxon
/// count, labels, cycle, split family, and the planar outline drawn from
/// them.
#[derive(Debug, Clone)]
pub struct Outline {
    pub n_tax: usize,
    pub labels: Vec<String>,
    pub cycle: Cycle,
    pub splits: Vec<Split>,
    pub graph: OutlineGraph,
}

/// Runs the full pipeline: Neighbor-Net ordering, constrained least-squares
/// split-weight fitting, then the planar outline sweep.
///
/// `out_group`, if non-empty, must name taxa within `1..=n_tax`.
///
/// # Errors
///
/// Returns [`DomainError::InvalidOutGroup`] if `out_group` is non-empty but
/// does not form a proper, non-empty subset of `1..=n_tax`, or
/// [`DomainError::UnknownTaxon`] if it names a taxon outside that range.
pub fn run(
    labels: Vec<String>,
    d: &DistanceMatrix,
    constrained: bool,
    rooted: bool,
    alt: bool,
    out_group: &[usize],
    use_weights: bool,
) -> Result<Outline, DomainError> {
    let n_tax = d.n_tax();

    for &taxon in out_group {
        if taxon == 0 || taxon > n_tax {
            return Err(DomainError::UnknownTaxon { taxon });
        }
    }
    if !out_group.is_empty() && out_group.len() >= n_tax {
        return Err(DomainError::InvalidOutGroup);
    }

    ftlog::info!("computing neighbor-net cycle for {n_tax} taxa");
    let cycle = nnet::compute_cycle(n_tax, d);

    ftlog::info!("fitting split weights (constrained = {constrained})");
    let splits = ls::solve(n_tax, &cycle, d, constrained);

    ftlog::info!("sweeping {} splits into an outline (rooted = {rooted})", splits.len());
    let (n_tax, labels, cycle, splits, graph) = outline::compute(n_tax, &labels, &cycle, &splits, rooted, alt, out_group, use_weights);

    Ok(Outline { n_tax, labels, cycle, splits, graph })
}
