//! Neighbor-Net cycle construction (Bryant & Moulton 2004; Huson & Bryant
//! 2006): agglomerative clustering that produces a circular ordering of
//! taxa rather than a tree.

mod node;
mod work_matrix;

use crate::matrix::DistanceMatrix;
use crate::splits::Cycle;
use node::{collect_active, NodePool};
use work_matrix::WorkMatrix;

/// Computes the Neighbor-Net circular ordering of `d`'s `n` taxa.
///
/// For `n <= 3` every ordering is trivially circular, so the identity
/// ordering is returned directly.
#[must_use]
pub fn compute_cycle(n: usize, d: &DistanceMatrix) -> Cycle {
    if n <= 3 {
        return Cycle::from_raw((0..=n).collect());
    }

    let mut pool = setup_nodes(n);
    let mut head = 1;
    let mut mat = setup_matrix(n, d);

    let joins = join_nodes(n, &mut mat, &mut pool, &mut head);
    let raw = expand_nodes(&mut pool, joins, head);
    Cycle::from_raw(normalize_cycle(raw))
}

fn setup_nodes(n: usize) -> NodePool {
    let mut pool = NodePool::with_capacity(3 * n);
    for _ in 0..n {
        pool.push_new();
    }
    for id in 1..=n {
        pool.get_mut(id).next = if id < n { Some(id + 1) } else { None };
        pool.get_mut(id).prev = if id > 1 { Some(id - 1) } else { None };
    }
    pool
}

fn setup_matrix(n: usize, d: &DistanceMatrix) -> WorkMatrix {
    let max_nodes = (3 * n).saturating_sub(5).max(3);
    let mut mat = WorkMatrix::new(max_nodes);
    for i in 1..=n {
        for j in 1..=n {
            mat.set(i, j, d.get(i - 1, j - 1));
        }
    }
    mat
}

/// The distance between the clusters represented by `p` and `q`, averaged
/// over whichever of the two is currently paired.
fn cluster_distance(pool: &NodePool, mat: &WorkMatrix, p: usize, q: usize) -> f64 {
    match (pool.get(p).nbr, pool.get(q).nbr) {
        (None, None) => mat.get(p, q),
        (Some(pn), None) => (mat.get(p, q) + mat.get(pn, q)) / 2.0,
        (None, Some(qn)) => (mat.get(p, q) + mat.get(p, qn)) / 2.0,
        (Some(pn), Some(qn)) => (mat.get(p, q) + mat.get(p, qn) + mat.get(pn, q) + mat.get(pn, qn)) / 4.0,
    }
}

fn compute_rx(pool: &NodePool, mat: &WorkMatrix, active: &[usize], z: usize, cx: usize, cy: usize) -> f64 {
    let cx_nbr = pool.get(cx).nbr;
    let cy_nbr = pool.get(cy).nbr;
    active
        .iter()
        .map(|&p| {
            let special = p == cx || Some(p) == cx_nbr || p == cy || Some(p) == cy_nbr || pool.get(p).nbr.is_none();
            if special {
                mat.get(z, p)
            } else {
                mat.get(z, p) / 2.0
            }
        })
        .sum()
}

fn join2way(pool: &mut NodePool, x: usize, y: usize) {
    pool.get_mut(x).nbr = Some(y);
    pool.get_mut(y).nbr = Some(x);
}

/// Replaces the three nodes `x`, `y`, `z` (where `y` and `z` are paired, or
/// `x` and `y` are paired) with two new, mutually paired nodes `u` and `v`.
/// `u` takes `x`'s place in the active list, `v` takes `z`'s place, and `y`
/// is unlinked. Returns `u`'s id.
fn join3way(x: usize, y: usize, z: usize, joins: &mut Vec<usize>, mat: &mut WorkMatrix, pool: &mut NodePool, head: &mut usize) -> usize {
    let u = pool.push_new();
    let v = pool.push_new();
    pool.get_mut(u).ch1 = Some(x);
    pool.get_mut(u).ch2 = Some(y);
    pool.get_mut(v).ch1 = Some(y);
    pool.get_mut(v).ch2 = Some(z);

    pool.get_mut(u).next = pool.get(x).next;
    pool.get_mut(u).prev = pool.get(x).prev;
    if let Some(un) = pool.get(u).next {
        pool.get_mut(un).prev = Some(u);
    }
    if let Some(up) = pool.get(u).prev {
        pool.get_mut(up).next = Some(u);
    } else {
        *head = u;
    }

    pool.get_mut(v).next = pool.get(z).next;
    pool.get_mut(v).prev = pool.get(z).prev;
    if let Some(vn) = pool.get(v).next {
        pool.get_mut(vn).prev = Some(v);
    }
    if let Some(vp) = pool.get(v).prev {
        pool.get_mut(vp).next = Some(v);
    } else {
        *head = v;
    }

    if let Some(yn) = pool.get(y).next {
        pool.get_mut(yn).prev = pool.get(y).prev;
    }
    if let Some(yp) = pool.get(y).prev {
        pool.get_mut(yp).next = pool.get(y).next;
    } else if let Some(yn) = pool.get(y).next {
        *head = yn;
    }

    pool.get_mut(u).nbr = Some(v);
    pool.get_mut(v).nbr = Some(u);

    let active = collect_active(pool, *head);
    for &p in &active {
        let mu = (2.0 / 3.0) * mat.get(x, p) + mat.get(y, p) / 3.0;
        mat.set(u, p, mu);
        mat.set(p, u, mu);
        let mv = (2.0 / 3.0) * mat.get(z, p) + mat.get(y, p) / 3.0;
        mat.set(v, p, mv);
        mat.set(p, v, mv);
    }
    mat.set(u, u, 0.0);
    mat.set(v, v, 0.0);

    joins.push(u);
    u
}

/// Two chained 3-way joins: folds in both of `x`'s and `y`'s neighbors.
fn join4way(x_nbr: usize, x: usize, y: usize, y_nbr: usize, joins: &mut Vec<usize>, mat: &mut WorkMatrix, pool: &mut NodePool, head: &mut usize) {
    let u = join3way(x_nbr, x, y, joins, mat, pool, head);
    let v = pool.get(u).nbr.expect("join3way always pairs its result");
    join3way(u, v, y_nbr, joins, mat, pool, head);
}

fn join_nodes(n: usize, mat: &mut WorkMatrix, pool: &mut NodePool, head: &mut usize) -> Vec<usize> {
    let mut num_active = n;
    let mut num_clusters = n;
    let mut joins = Vec::new();

    loop {
        if num_active <= 3 {
            break;
        }

        if num_active == 4 && num_clusters == 2 {
            let p = *head;
            let p_next = pool.get(p).next.expect("4 active nodes expected");
            let q = if Some(p_next) != pool.get(p).nbr {
                p_next
            } else {
                pool.get(p_next).next.expect("4 active nodes expected")
            };
            let p_nbr = pool.get(p).nbr.expect("p must be paired in the terminal case");
            let q_nbr = pool.get(q).nbr.expect("q must be paired in the terminal case");
            if mat.get(p, q) + mat.get(p_nbr, q_nbr) < mat.get(p, q_nbr) + mat.get(p_nbr, q) {
                join3way(p, q, q_nbr, &mut joins, mat, pool, head);
            } else {
                join3way(p, q_nbr, q, &mut joins, mat, pool, head);
            }
            break;
        }

        let active = collect_active(pool, *head);
        ftlog::debug!("neighbor-net iteration: {num_active} active, {num_clusters} clusters");

        for &p in &active {
            pool.get_mut(p).sx = 0.0;
        }
        for (pi, &p) in active.iter().enumerate() {
            let p_nbr = pool.get(p).nbr;
            if let Some(pn) = p_nbr {
                if pn < p {
                    continue;
                }
            }
            for &q in &active[pi + 1..] {
                let q_nbr = pool.get(q).nbr;
                let ok = match q_nbr {
                    None => true,
                    Some(qn) => qn > q && qn != p,
                };
                if !ok {
                    continue;
                }
                let d_pq = cluster_distance(pool, mat, p, q);
                pool.get_mut(p).sx += d_pq;
                if let Some(pn) = p_nbr {
                    pool.get_mut(pn).sx += d_pq;
                }
                pool.get_mut(q).sx += d_pq;
                if let Some(qn) = q_nbr {
                    pool.get_mut(qn).sx += d_pq;
                }
            }
        }

        let mut best_pair: Option<(usize, usize, f64)> = None;
        for (pi, &p) in active.iter().enumerate() {
            if let Some(pn) = pool.get(p).nbr {
                if pn < p {
                    continue;
                }
            }
            for &q in &active[..pi] {
                if let Some(qn) = pool.get(q).nbr {
                    if qn < q {
                        continue;
                    }
                }
                if pool.get(q).nbr == Some(p) {
                    continue;
                }
                let d_pq = cluster_distance(pool, mat, p, q);
                let q_pq = (num_clusters as f64 - 2.0) * d_pq - pool.get(p).sx - pool.get(q).sx;
                let better = match best_pair {
                    None => true,
                    Some((_, _, best)) => q_pq < best,
                };
                if better {
                    best_pair = Some((p, q, q_pq));
                }
            }
        }
        let (cx, cy, _) = best_pair.expect("the active set always contains at least one candidate pair");

        ftlog::debug!("chosen pair: Cx={cx}, Cy={cy}");

        let cx_nbr = pool.get(cx).nbr;
        let cy_nbr = pool.get(cy).nbr;
        if cx_nbr.is_some() || cy_nbr.is_some() {
            let rx_cx = compute_rx(pool, mat, &active, cx, cx, cy);
            pool.get_mut(cx).rx = rx_cx;
            if let Some(cxn) = cx_nbr {
                let v = compute_rx(pool, mat, &active, cxn, cx, cy);
                pool.get_mut(cxn).rx = v;
            }
            let rx_cy = compute_rx(pool, mat, &active, cy, cx, cy);
            pool.get_mut(cy).rx = rx_cy;
            if let Some(cyn) = cy_nbr {
                let v = compute_rx(pool, mat, &active, cyn, cx, cy);
                pool.get_mut(cyn).rx = v;
            }
        }

        let mut m = num_clusters as f64;
        if cx_nbr.is_some() {
            m += 1.0;
        }
        if cy_nbr.is_some() {
            m += 1.0;
        }

        let mut x = cx;
        let mut y = cy;
        let mut best = (m - 2.0) * mat.get(cx, cy) - pool.get(cx).rx - pool.get(cy).rx;
        if let Some(cxn) = cx_nbr {
            let candidate = (m - 2.0) * mat.get(cxn, cy) - pool.get(cxn).rx - pool.get(cy).rx;
            if candidate < best {
                x = cxn;
                y = cy;
                best = candidate;
            }
        }
        if let Some(cyn) = cy_nbr {
            let candidate = (m - 2.0) * mat.get(cx, cyn) - pool.get(cx).rx - pool.get(cyn).rx;
            if candidate < best {
                x = cx;
                y = cyn;
                best = candidate;
            }
        }
        if let (Some(cxn), Some(cyn)) = (cx_nbr, cy_nbr) {
            let candidate = (m - 2.0) * mat.get(cxn, cyn) - pool.get(cxn).rx - pool.get(cyn).rx;
            if candidate < best {
                x = cxn;
                y = cyn;
            }
        }

        if pool.get(x).nbr.is_none() && pool.get(y).nbr.is_none() {
            ftlog::trace!("2-way join of {x} and {y}");
            join2way(pool, x, y);
            num_clusters -= 1;
        } else if pool.get(x).nbr.is_none() {
            let y_nbr = pool.get(y).nbr.expect("checked above");
            ftlog::trace!("3-way join of {x}, {y}, {y_nbr}");
            join3way(x, y, y_nbr, &mut joins, mat, pool, head);
            num_active -= 1;
            num_clusters -= 1;
        } else if pool.get(y).nbr.is_none() || num_active == 4 {
            let x_nbr = pool.get(x).nbr.expect("checked above");
            ftlog::trace!("3-way join of {y}, {x}, {x_nbr}");
            join3way(y, x, x_nbr, &mut joins, mat, pool, head);
            num_active -= 1;
            num_clusters -= 1;
        } else {
            let x_nbr = pool.get(x).nbr.expect("checked above");
            let y_nbr = pool.get(y).nbr.expect("checked above");
            ftlog::trace!("4-way join of {x_nbr}, {x}, {y}, {y_nbr}");
            join4way(x_nbr, x, y, y_nbr, &mut joins, mat, pool, head);
            num_active -= 2;
            num_clusters -= 1;
        }
    }

    joins
}

/// Pops the `joins` stack (LIFO) and splices each composite node's children
/// back into the cyclic list, then reads off the final taxon ordering
/// starting at taxon 1.
fn expand_nodes(pool: &mut NodePool, mut joins: Vec<usize>, head: usize) -> Vec<usize> {
    let x0 = head;
    let y0 = pool.get(x0).next.expect("final active list has at least 3 nodes");
    let z0 = pool.get(y0).next.expect("final active list has at least 3 nodes");
    pool.get_mut(z0).next = Some(x0);
    pool.get_mut(x0).prev = Some(z0);

    let mut last = x0;
    while let Some(mut u) = joins.pop() {
        let mut v = pool.get(u).nbr.expect("every composite node is paired");
        let mut x = pool.get(u).ch1.expect("composite node has ch1");
        let mut y = pool.get(u).ch2.expect("composite node has ch2");
        let mut z = pool.get(v).ch2.expect("composite node has ch2");

        if Some(v) != pool.get(u).next {
            std::mem::swap(&mut u, &mut v);
            std::mem::swap(&mut x, &mut z);
        }

        pool.get_mut(x).prev = pool.get(u).prev;
        let xp = pool.get(x).prev.expect("u always has a predecessor in the closed ring");
        pool.get_mut(xp).next = Some(x);
        pool.get_mut(x).next = Some(y);
        pool.get_mut(y).prev = Some(x);
        pool.get_mut(y).next = Some(z);
        pool.get_mut(z).prev = Some(y);
        pool.get_mut(z).next = pool.get(v).next;
        let zn = pool.get(z).next.expect("v always has a successor in the closed ring");
        pool.get_mut(zn).prev = Some(z);

        last = x;
    }

    let mut cur = last;
    while pool.get(cur).id != 1 {
        cur = pool.get(cur).next.expect("ring is closed");
    }
    let start = cur;
    let mut cycle = vec![0];
    loop {
        cycle.push(pool.get(cur).id);
        cur = pool.get(cur).next.expect("ring is closed");
        if cur == start {
            break;
        }
    }
    cycle
}

/// Rotates and, if needed, reverses `cycle` so taxon 1 sits at position 1
/// and the smaller of its two neighbors sits at position 2.
fn normalize_cycle(cycle: Vec<usize>) -> Vec<usize> {
    let len = cycle.len();
    let last = len - 1;
    let mut pos_of_1 = 1;
    for (i, &taxon) in cycle.iter().enumerate().skip(1) {
        if taxon == 1 {
            pos_of_1 = i;
            break;
        }
    }
    let pos_prev = if pos_of_1 == 1 { last } else { pos_of_1 - 1 };
    let pos_next = if pos_of_1 == last { 1 } else { pos_of_1 + 1 };

    if cycle[pos_prev] > cycle[pos_next] {
        if pos_of_1 == 1 {
            return cycle;
        }
        let mut result = vec![0];
        let mut i = pos_of_1;
        while result.len() < len {
            result.push(cycle[i]);
            i = if i < last { i + 1 } else { 1 };
        }
        result
    } else {
        let mut result = vec![0];
        let mut i = pos_of_1;
        while result.len() < len {
            result.push(cycle[i]);
            i = if i > 1 { i - 1 } else { last };
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_permutation_cycle(cycle: &Cycle, n: usize) {
        let mut seen: Vec<usize> = cycle.as_slice()[1..].to_vec();
        seen.sort_unstable();
        assert_eq!(seen, (1..=n).collect::<Vec<_>>());
        assert_eq!(cycle.at(1), 1);
    }

    #[test]
    fn trivial_cases_are_identity() {
        let d = DistanceMatrix::new(2, vec![0.0, 1.0, 1.0, 0.0]).expect("valid");
        let cycle = compute_cycle(2, &d);
        assert_eq!(cycle.as_slice(), &[0, 1, 2]);
    }

    #[test]
    fn four_taxa_produces_a_permutation_cycle() {
        let data = vec![
            0.0, 2.0, 4.0, 6.0, //
            2.0, 0.0, 6.0, 8.0, //
            4.0, 6.0, 0.0, 4.0, //
            6.0, 8.0, 4.0, 0.0,
        ];
        let d = DistanceMatrix::new(4, data).expect("valid");
        let cycle = compute_cycle(4, &d);
        is_permutation_cycle(&cycle, 4);
    }

    #[test]
    fn six_taxa_produces_a_permutation_cycle() {
        let data = vec![
            0.0, 5.0, 9.0, 9.0, 8.0, 7.0, //
            5.0, 0.0, 10.0, 10.0, 9.0, 8.0, //
            9.0, 10.0, 0.0, 8.0, 7.0, 6.0, //
            9.0, 10.0, 8.0, 0.0, 5.0, 6.0, //
            8.0, 9.0, 7.0, 5.0, 0.0, 5.0, //
            7.0, 8.0, 6.0, 6.0, 5.0, 0.0,
        ];
        let d = DistanceMatrix::new(6, data).expect("valid");
        let cycle = compute_cycle(6, &d);
        is_permutation_cycle(&cycle, 6);
    }
}
