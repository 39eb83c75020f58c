//! Constrained least-squares estimation of circular split weights.
//!
//! The system `A x = d` is never materialized as a dense matrix: both `A`
//! and `Aᵀ` are applied through a dense `O(n²)` prefix-sum table over the
//! `(position, position)` / `(split, split)` grids, giving the same `O(N)`
//! asymptotic cost per matvec as a hand-rolled incremental recurrence would,
//! while being straightforward to verify against a brute-force reference
//! (see the unit tests at the bottom of this module).

use crate::matrix::DistanceMatrix;
use crate::splits::{cyc_split, Cycle, Split};

const CUTOFF: f64 = 1e-4;
const CG_EPSILON: f64 = 0.0001;
const OPTIMALITY_TOLERANCE: f64 = -1e-4;
const WORST_FRACTION: f64 = 0.1;

/// Maps unordered position pairs `(i, j)`, `1 <= i < j <= n`, to a flat,
/// 0-based index in lexicographic order: `(1,2),(1,3),...,(1,n),(2,3),...`.
struct PairIndex {
    row_start: Vec<usize>,
    len: usize,
}

impl PairIndex {
    fn new(n: usize) -> Self {
        let mut row_start = vec![0; n.max(1)];
        let mut acc = 0;
        for i in 1..n {
            row_start[i] = acc;
            acc += n - i;
        }
        Self { row_start, len: acc }
    }

    fn index(&self, i: usize, j: usize) -> usize {
        self.row_start[i] + (j - i - 1)
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// Maps circular splits `(p, q)`, `2 <= p <= q <= n`, to a flat, 0-based
/// index in the same row-major order.
struct SplitIndex {
    row_start: Vec<usize>,
    len: usize,
}

impl SplitIndex {
    fn new(n: usize) -> Self {
        let mut row_start = vec![0; n + 1];
        let mut acc = 0;
        for p in 2..=n {
            row_start[p] = acc;
            acc += n - p + 1;
        }
        Self { row_start, len: acc }
    }

    fn index(&self, p: usize, q: usize) -> usize {
        self.row_start[p] + (q - p)
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// A 2-D prefix-sum table over a dense `(n+1) x (n+1)` grid, supporting
/// `O(1)` rectangle-sum queries after an `O(n²)` build.
struct PrefixSum {
    n: usize,
    table: Vec<f64>,
}

impl PrefixSum {
    fn build(n: usize, get: impl Fn(usize, usize) -> f64) -> Self {
        let mut table = vec![0.0; (n + 1) * (n + 1)];
        for a in 1..=n {
            for b in 1..=n {
                let cell = get(a, b);
                table[a * (n + 1) + b] =
                    cell + table[(a - 1) * (n + 1) + b] + table[a * (n + 1) + b - 1] - table[(a - 1) * (n + 1) + b - 1];
            }
        }
        Self { n, table }
    }

    fn at(&self, a: usize, b: usize) -> f64 {
        self.table[a * (self.n + 1) + b]
    }

    /// Sum over `a in [a1, a2], b in [b1, b2]`. Empty ranges (`a1 > a2` or
    /// `b1 > b2`) contribute zero.
    fn rect(&self, a1: usize, a2: usize, b1: usize, b2: usize) -> f64 {
        if a1 > a2 || b1 > b2 {
            return 0.0;
        }
        self.at(a2, b2) - self.at(a1 - 1, b2) - self.at(a2, b1 - 1) + self.at(a1 - 1, b1 - 1)
    }
}

/// Applies the implicit incidence operator `A` to a split-weight vector
/// `x`, producing the induced pairwise-distance vector `d = A x`.
fn calculate_ab(n: usize, pairs: &PairIndex, splits: &SplitIndex, x: &[f64]) -> Vec<f64> {
    let grid = PrefixSum::build(n, |p, q| if p >= 2 && p <= q { x[splits.index(p, q)] } else { 0.0 });
    let mut d = vec![0.0; pairs.len()];
    for i in 1..n {
        for j in (i + 1)..=n {
            let within = grid.rect(2, i, i, j.saturating_sub(1));
            let crossing = grid.rect(i + 1, j, j, n);
            d[pairs.index(i, j)] = within + crossing;
        }
    }
    d
}

/// Applies `Aᵀ` to a pairwise-distance vector `d`, producing a split-indexed
/// vector `p = Aᵀ d`.
fn calculate_atx(n: usize, pairs: &PairIndex, splits: &SplitIndex, d: &[f64]) -> Vec<f64> {
    let grid = PrefixSum::build(n, |i, j| if i < j { d[pairs.index(i, j)] } else { 0.0 });
    let mut out = vec![0.0; splits.len()];
    for p in 2..=n {
        for q in p..=n {
            let outward = grid.rect(p, q, q + 1, n);
            let inward = grid.rect(1, p.saturating_sub(1), p, q);
            out[splits.index(p, q)] = outward + inward;
        }
    }
    out
}

/// Sum of `d` over every pair that touches taxon position `j`.
fn row_sum(n: usize, pairs: &PairIndex, d: &[f64], j: usize) -> f64 {
    let mut total = 0.0;
    for i in 1..j {
        total += d[pairs.index(i, j)];
    }
    for k in (j + 1)..=n {
        total += d[pairs.index(j, k)];
    }
    total
}

fn d_cyclic(pairs: &PairIndex, d: &[f64], n: usize, a: usize, b: usize) -> f64 {
    let wrap = |v: usize| if v == 0 { n } else if v > n { v - n } else { v };
    let (a, b) = (wrap(a), wrap(b));
    match a.cmp(&b) {
        std::cmp::Ordering::Equal => 0.0,
        std::cmp::Ordering::Less => d[pairs.index(a, b)],
        std::cmp::Ordering::Greater => d[pairs.index(b, a)],
    }
}

/// The closed-form, unconstrained least-squares circular split weights.
///
/// Each coordinate is a balanced four-point combination of `d`, exploiting
/// the fact that adjacent circular splits differ from each other by exactly
/// one boundary taxon.
fn unconstrained_least_squares(n: usize, pairs: &PairIndex, splits: &SplitIndex, d: &[f64]) -> Vec<f64> {
    let mut x = vec![0.0; splits.len()];
    for p in 2..=n {
        for q in p..=n {
            let a = d_cyclic(pairs, d, n, p - 1, q);
            let b = d_cyclic(pairs, d, n, p, q + 1);
            let c = d_cyclic(pairs, d, n, p - 1, q + 1);
            let e = d_cyclic(pairs, d, n, p, q);
            x[splits.index(p, q)] = 0.5 * (a + b - c - e);
        }
    }
    x
}

fn apply_ata(n: usize, pairs: &PairIndex, splits: &SplitIndex, v: &[f64]) -> Vec<f64> {
    let av = calculate_ab(n, pairs, splits, v);
    calculate_atx(n, pairs, splits, &av)
}

/// Conjugate gradients on `Aᵀ A x = b` restricted to the inactive
/// coordinates, with active coordinates clamped to zero throughout.
fn circular_conjugate_gradients(n: usize, pairs: &PairIndex, splits: &SplitIndex, active: &[bool], b: &[f64]) -> Vec<f64> {
    let len = b.len();
    let mut x = vec![0.0; len];
    let mut r = b.to_vec();
    for (i, slot) in r.iter_mut().enumerate() {
        if active[i] {
            *slot = 0.0;
        }
    }

    let b_norm2: f64 = b.iter().map(|v| v * v).sum();
    let tolerance = CG_EPSILON * b_norm2.sqrt();
    let mut rr: f64 = r.iter().map(|v| v * v).sum();
    if rr <= tolerance {
        return x;
    }

    let mut p = r.clone();
    let k_max = n * n.saturating_sub(1) / 2;
    for _ in 0..k_max.max(1) {
        let mut ap = apply_ata(n, pairs, splits, &p);
        for (i, slot) in ap.iter_mut().enumerate() {
            if active[i] {
                *slot = 0.0;
            }
        }
        let pap: f64 = p.iter().zip(&ap).map(|(a, b)| a * b).sum();
        if pap.abs() < f64::EPSILON {
            break;
        }
        let alpha = rr / pap;
        for i in 0..len {
            x[i] += alpha * p[i];
            r[i] -= alpha * ap[i];
        }
        for (i, slot) in r.iter_mut().enumerate() {
            if active[i] {
                *slot = 0.0;
            }
        }
        let rr_new: f64 = r.iter().map(|v| v * v).sum();
        if rr_new <= tolerance {
            ftlog::debug!("conjugate gradients converged early");
            rr = rr_new;
            break;
        }
        let beta = rr_new / rr;
        for i in 0..len {
            p[i] = r[i] + beta * p[i];
        }
        rr = rr_new;
    }
    x
}

fn worst_negative_indices(x: &[f64], active: &[bool]) -> Vec<usize> {
    let mut negatives: Vec<(usize, f64)> =
        x.iter().enumerate().filter(|&(i, &v)| !active[i] && v < 0.0).map(|(i, &v)| (i, v)).collect();
    if negatives.is_empty() {
        return Vec::new();
    }
    negatives.sort_by(|a, b| a.1.partial_cmp(&b.1).expect("split weights are never NaN"));
    let keep = ((negatives.len() as f64) * WORST_FRACTION).ceil().max(1.0) as usize;
    negatives.into_iter().take(keep).map(|(i, _)| i).collect()
}

fn active_set_solve(n: usize, pairs: &PairIndex, splits: &SplitIndex, d: &[f64]) -> Vec<f64> {
    let len = splits.len();
    let mut active = vec![false; len];
    let mut old_x = vec![1.0; len];
    let at_wd = calculate_atx(n, pairs, splits, d);

    loop {
        let final_x = loop {
            let mut x = circular_conjugate_gradients(n, pairs, splits, &active, &at_wd);

            let worst = worst_negative_indices(&x, &active);
            if !worst.is_empty() {
                for &i in &worst {
                    active[i] = true;
                    x[i] = 0.0;
                }
                x = circular_conjugate_gradients(n, pairs, splits, &active, &at_wd);
            }

            let mut lambda = 1.0;
            let mut blocking = None;
            for i in 0..len {
                if active[i] || x[i] >= 0.0 {
                    continue;
                }
                let l = old_x[i] / (old_x[i] - x[i]);
                if l < lambda {
                    lambda = l;
                    blocking = Some(i);
                }
            }

            match blocking {
                None => break x,
                Some(b) => {
                    for i in 0..len {
                        if !active[i] {
                            old_x[i] += lambda * (x[i] - old_x[i]);
                        }
                    }
                    active[b] = true;
                    old_x[b] = 0.0;
                }
            }
        };
        old_x = final_x;

        let ax = calculate_ab(n, pairs, splits, &old_x);
        let atax = calculate_atx(n, pairs, splits, &ax);
        let mut worst_gradient = f64::INFINITY;
        let mut worst_index = None;
        for i in 0..len {
            if !active[i] {
                continue;
            }
            let g = 2.0 * (atax[i] - at_wd[i]);
            if g < worst_gradient {
                worst_gradient = g;
                worst_index = Some(i);
            }
        }

        ftlog::debug!(
            "active-set iteration: |active|={}, worst gradient={worst_gradient}",
            active.iter().filter(|&&a| a).count()
        );

        match worst_index {
            None => break,
            Some(_) if worst_gradient >= OPTIMALITY_TOLERANCE => break,
            Some(i) => active[i] = false,
        }
    }

    old_x
}

fn setup_d(n: usize, cycle: &Cycle, d: &DistanceMatrix, pairs: &PairIndex) -> Vec<f64> {
    let mut out = vec![0.0; pairs.len()];
    for i in 1..n {
        for j in (i + 1)..=n {
            let a = cycle.at(i) - 1;
            let b = cycle.at(j) - 1;
            out[pairs.index(i, j)] = d.get(a, b);
        }
    }
    out
}

/// Computes the circular split family and weights for `cycle` against `d`.
///
/// When `constrained` is `false`, the unconstrained closed-form solution is
/// returned even if it contains negative weights (diagnostic use only).
/// Splits with weight at or below `1e-4` are omitted.
#[must_use]
pub fn solve(n: usize, cycle: &Cycle, d: &DistanceMatrix, constrained: bool) -> Vec<Split> {
    if n == 1 {
        return Vec::new();
    }

    let pairs = PairIndex::new(n);
    let splits = SplitIndex::new(n);
    let flat_d = setup_d(n, cycle, d, &pairs);

    if n == 2 {
        let w = flat_d[0];
        return if w > CUTOFF { vec![cyc_split(cycle, 2, 2, w)] } else { Vec::new() };
    }

    let unconstrained = unconstrained_least_squares(n, &pairs, &splits, &flat_d);
    let already_feasible = unconstrained.iter().all(|&v| v >= 0.0);

    let weights = if !constrained || already_feasible {
        ftlog::debug!("unconstrained circular least squares already non-negative");
        unconstrained
    } else {
        active_set_solve(n, &pairs, &splits, &flat_d)
    };

    let mut result = Vec::new();
    for p in 2..=n {
        for q in p..=n {
            let w = weights[splits.index(p, q)];
            if w > CUTOFF {
                result.push(cyc_split(cycle, p, q, w));
            }
        }
    }
    result
}

/// The sum of absolute differences between `d` and the distances induced by
/// `splits` — the fit statistic reported alongside Nexus output.
#[must_use]
pub fn fit(n_tax: usize, d: &DistanceMatrix, splits: &[Split]) -> f64 {
    let induced = crate::splits::split_distance(n_tax, splits);
    let mut total = 0.0;
    for a in 1..=n_tax {
        for b in 1..=n_tax {
            total += (d.get(a - 1, b - 1) - induced[a][b]).abs();
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force_ab(n: usize, pairs: &PairIndex, splits: &SplitIndex, x: &[f64]) -> Vec<f64> {
        let mut d = vec![0.0; pairs.len()];
        for i in 1..n {
            for j in (i + 1)..=n {
                let mut sum = 0.0;
                for p in 2..=n {
                    for q in p..=n {
                        let separates = (p <= i && i <= q) != (p <= j && j <= q);
                        if separates {
                            sum += x[splits.index(p, q)];
                        }
                    }
                }
                d[pairs.index(i, j)] = sum;
            }
        }
        d
    }

    fn brute_force_atx(n: usize, pairs: &PairIndex, splits: &SplitIndex, d: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; splits.len()];
        for p in 2..=n {
            for q in p..=n {
                let mut sum = 0.0;
                for i in 1..n {
                    for j in (i + 1)..=n {
                        let separates = (p <= i && i <= q) != (p <= j && j <= q);
                        if separates {
                            sum += d[pairs.index(i, j)];
                        }
                    }
                }
                out[splits.index(p, q)] = sum;
            }
        }
        out
    }

    #[test]
    fn calculate_ab_matches_brute_force_for_small_n() {
        for n in 2..=6 {
            let pairs = PairIndex::new(n);
            let splits = SplitIndex::new(n);
            let x: Vec<f64> = (0..splits.len()).map(|i| (i + 1) as f64 * 0.37).collect();
            let fast = calculate_ab(n, &pairs, &splits, &x);
            let slow = brute_force_ab(n, &pairs, &splits, &x);
            for (a, b) in fast.iter().zip(&slow) {
                assert!((a - b).abs() < 1e-9, "n={n}: {a} != {b}");
            }
        }
    }

    #[test]
    fn calculate_atx_matches_brute_force_for_small_n() {
        for n in 2..=6 {
            let pairs = PairIndex::new(n);
            let splits = SplitIndex::new(n);
            let d: Vec<f64> = (0..pairs.len()).map(|i| (i + 1) as f64 * 0.53).collect();
            let fast = calculate_atx(n, &pairs, &splits, &d);
            let slow = brute_force_atx(n, &pairs, &splits, &d);
            for (a, b) in fast.iter().zip(&slow) {
                assert!((a - b).abs() < 1e-9, "n={n}: {a} != {b}");
            }
        }
    }

    #[test]
    fn row_sum_matches_definition() {
        let n = 5;
        let pairs = PairIndex::new(n);
        let d: Vec<f64> = (0..pairs.len()).map(|i| i as f64 + 1.0).collect();
        let expected: f64 = (1..=n)
            .filter(|&k| k != 3)
            .map(|k| {
                let (i, j) = if k < 3 { (k, 3) } else { (3, k) };
                d[pairs.index(i, j)]
            })
            .sum();
        assert!((row_sum(n, &pairs, &d, 3) - expected).abs() < 1e-9);
    }

    #[test]
    fn solve_on_trivial_sizes() {
        let d = DistanceMatrix::new(1, vec![0.0]).expect("valid");
        let cycle = Cycle::from_raw(vec![0, 1]);
        assert!(solve(1, &cycle, &d, true).is_empty());

        let d = DistanceMatrix::new(2, vec![0.0, 3.0, 3.0, 0.0]).expect("valid");
        let cycle = Cycle::from_raw(vec![0, 1, 2]);
        let splits = solve(2, &cycle, &d, true);
        assert_eq!(splits.len(), 1);
        assert!((splits[0].weight - 3.0).abs() < 1e-9);
    }

    #[test]
    fn fit_is_zero_for_exact_split_metric() {
        let cycle = Cycle::from_raw(vec![0, 1, 2, 3]);
        let splits = vec![cyc_split(&cycle, 2, 2, 1.0), cyc_split(&cycle, 2, 3, 2.0), cyc_split(&cycle, 3, 3, 1.5)];
        let mat = crate::splits::split_distance(3, &splits);
        let mat = &mat;
        let flat: Vec<f64> = (1..=3).flat_map(|a| (1..=3).map(move |b| mat[a][b])).collect();
        let d = DistanceMatrix::new(3, flat).expect("valid");
        assert!(fit(3, &d, &splits) < 1e-9);
    }
}
