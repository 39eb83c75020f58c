//! Turns a circular split family into a planar outline: an (optionally
//! rooted) graph of 2-D points and edges.

mod event;
mod graph;
mod rooting;
mod sweep;

use std::collections::HashSet;

use crate::splits::{Cycle, Split};

/// A single point in the outline drawing, with any taxon labels attached.
#[derive(Debug, Clone)]
pub struct OutlineNode {
    pub x: f64,
    pub y: f64,
    pub label: String,
}

/// An edge in the outline drawing, carrying the weight and index of the
/// split it crosses.
#[derive(Debug, Clone)]
pub struct OutlineEdge {
    pub src: usize,
    pub tar: usize,
    pub weight: f64,
    pub split_index: usize,
}

/// The planar outline: a set of points connected by weighted edges.
#[derive(Debug, Clone, Default)]
pub struct OutlineGraph {
    pub nodes: Vec<OutlineNode>,
    pub edges: Vec<OutlineEdge>,
}

impl From<graph::Graph> for OutlineGraph {
    fn from(g: graph::Graph) -> Self {
        let nodes = g.nodes().iter().map(|n| OutlineNode { x: n.x, y: n.y, label: n.label.clone() }).collect();
        let edges = g.edges().iter().map(|e| OutlineEdge { src: e.src, tar: e.tar, weight: e.weight, split_index: e.split_index }).collect();
        Self { nodes, edges }
    }
}

/// Adds a zero-weight trivial split for every taxon not already isolated by
/// one, so every leaf gets its own arc in the sweep.
fn add_trivial(n_tax: usize, cycle: &Cycle, splits: &[Split]) -> Vec<Split> {
    let mut covered = HashSet::new();
    for s in splits {
        if s.is_trivial() {
            let singleton = if s.part1().len() == 1 { s.part1() } else { s.part2() };
            covered.extend(singleton.iter().copied());
        }
    }
    let mut result = splits.to_vec();
    for pos in 1..=n_tax {
        let taxon = cycle.at(pos);
        if !covered.contains(&taxon) {
            result.push(crate::splits::cyc_split(cycle, pos, pos, 0.0));
        }
    }
    result
}

fn modulo360(a: f64) -> f64 {
    let m = a % 360.0;
    if m < 0.0 {
        m + 360.0
    } else {
        m
    }
}

/// Leaf angles around the circle: a full 360-degree sweep when unrooted, or
/// a 160-degree sector centered at 270 degrees when rooted.
fn leaf_angles(n_tax: usize, rooted: bool) -> Vec<f64> {
    let total_angle = if rooted { 160.0 } else { 360.0 };
    (1..=n_tax)
        .map(|i| modulo360(total_angle * (i as f64 - 1.0) / n_tax as f64 + 270.0 - 0.5 * total_angle))
        .collect()
}

fn compute_split_angles(leaf_angle: &[f64], cycle: &Cycle, splits: &[Split]) -> Vec<f64> {
    splits
        .iter()
        .map(|s| {
            let (start, end) = s.interval(cycle);
            let a = leaf_angle[start - 1];
            let b = leaf_angle[end - 1];
            let diff = modulo360(b - a);
            modulo360(a + diff / 2.0)
        })
        .collect()
}

/// Builds the full outline: optionally roots the split family, fills in
/// trivial splits, computes leaf/split angles, and sweeps the event stream
/// into a planar graph.
#[must_use]
pub fn compute(
    n_tax: usize,
    labels: &[String],
    cycle: &Cycle,
    splits: &[Split],
    rooted: bool,
    alt: bool,
    out_group: &[usize],
    use_weights: bool,
) -> (usize, Vec<String>, Cycle, Vec<Split>, OutlineGraph) {
    let (n_tax, labels, cycle, splits) = if rooted {
        let (root_idx, w1, w2) = if out_group.is_empty() {
            rooting::root_location_mid_point(n_tax, cycle, splits)
        } else {
            rooting::root_location_out_group(cycle, splits, out_group)
        };
        let (root_taxon, new_labels, new_cycle, new_splits) = rooting::setup_rooted(n_tax, labels, splits, cycle, root_idx, w1, w2, alt);
        (root_taxon, new_labels, new_cycle, new_splits)
    } else {
        (n_tax, labels.to_vec(), cycle.clone(), splits.to_vec())
    };

    let splits = add_trivial(n_tax, &cycle, &splits);
    let leaf_angle = leaf_angles(n_tax, rooted);
    let split_angle = compute_split_angles(&leaf_angle, &cycle, &splits);

    let graph = sweep::run(n_tax, &labels, &cycle, &splits, use_weights, &split_angle);

    (n_tax, labels, cycle, splits, graph.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splits::cyc_split;

    fn cycle(taxa: &[usize]) -> Cycle {
        let mut raw = vec![0];
        raw.extend_from_slice(taxa);
        Cycle::from_raw(raw)
    }

    #[test]
    fn unrooted_outline_covers_every_leaf() {
        let c = cycle(&[1, 2, 3, 4]);
        let splits = vec![cyc_split(&c, 1, 2, 1.0), cyc_split(&c, 2, 3, 1.0)];
        let labels: Vec<String> = vec!["a".into(), "b".into(), "c".into(), "d".into()];
        let (_, _, _, _, graph) = compute(4, &labels, &c, &splits, false, false, &[], true);
        let all_labels: String = graph.nodes.iter().map(|n| n.label.clone()).collect();
        for label in &labels {
            assert!(all_labels.contains(label.as_str()));
        }
    }

    #[test]
    fn rooted_outline_adds_root_taxon() {
        let c = cycle(&[1, 2, 3, 4]);
        let splits = vec![cyc_split(&c, 1, 1, 1.0), cyc_split(&c, 1, 2, 2.0), cyc_split(&c, 2, 2, 1.0)];
        let labels: Vec<String> = vec!["a".into(), "b".into(), "c".into(), "d".into()];
        let (new_n_tax, new_labels, _, _, _) = compute(4, &labels, &c, &splits, true, false, &[], true);
        assert_eq!(new_n_tax, 5);
        assert_eq!(new_labels.last().map(String::as_str), Some("Root"));
    }
}
