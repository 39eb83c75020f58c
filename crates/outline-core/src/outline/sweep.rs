//! The planar sweep: walks the merged event stream, translating a running
//! 2-D point by each split's weight and angle, and builds the outline graph.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::event::{radix_sort, Event};
use super::graph::Graph;
use crate::splits::{Cycle, Split};

fn setup_events(cycle: &Cycle, splits: &[Split]) -> (Vec<Event>, Vec<Event>) {
    let mut outbound = Vec::with_capacity(splits.len());
    let mut inbound = Vec::with_capacity(splits.len());
    for (idx, s) in splits.iter().enumerate() {
        let (start_pos, end_pos) = s.interval(cycle);
        outbound.push(Event { split_index: idx, start_pos, end_pos, outbound: true });
        inbound.push(Event { split_index: idx, start_pos, end_pos, outbound: false });
    }
    (outbound, inbound)
}

fn translate(xy: (f64, f64), dist: f64, angle_deg: f64) -> (f64, f64) {
    let rad = angle_deg.to_radians();
    let mut dx = dist * rad.cos();
    let mut dy = dist * rad.sin();
    if dx.abs() < 1e-10 {
        dx = 0.0;
    }
    if dy.abs() < 1e-10 {
        dy = 0.0;
    }
    (xy.0 + dx, xy.1 + dy)
}

/// Runs the event-stream sweep over `splits` (with their pre-computed
/// angles) and returns the resulting planar graph.
pub(crate) fn run(n_tax: usize, labels: &[String], cycle: &Cycle, splits: &[Split], use_weights: bool, angles: &[f64]) -> Graph {
    let (outbound, inbound) = setup_events(cycle, splits);
    let events = radix_sort(n_tax, outbound, inbound);

    let mut graph = Graph::new();
    let mut xy = (0.0, 0.0);
    let mut active: BTreeSet<usize> = BTreeSet::new();
    let mut splits_to_node: HashMap<Vec<usize>, usize> = HashMap::new();
    splits_to_node.insert(Vec::new(), 0);
    let mut prev_node = 0usize;
    let mut prev_split: Option<usize> = None;
    let mut assigned = HashSet::new();

    for event in &events {
        let weight = if use_weights { splits[event.split_index].weight } else { 1.0 };
        let angle = angles[event.split_index];
        if event.outbound {
            active.insert(event.split_index);
            xy = translate(xy, weight, angle);
        } else {
            active.remove(&event.split_index);
            xy = translate(xy, weight, angle + 180.0);
        }

        let key: Vec<usize> = active.iter().copied().collect();
        let node = if let Some(&existing) = splits_to_node.get(&key) {
            ftlog::trace!("outline sweep: closing loop at node {existing}");
            xy = (graph.node(existing).x, graph.node(existing).y);
            existing
        } else {
            let id = graph.new_node(xy.0, xy.1);
            splits_to_node.insert(key, id);
            id
        };

        if prev_node != node && !graph.is_adjacent(prev_node, node) {
            graph.new_edge(prev_node, node, weight, event.split_index);
        }

        if prev_split == Some(event.split_index) {
            let group = splits[event.split_index].part_not_in(cycle.at(1));
            let taxon_labels: Vec<&str> = group
                .iter()
                .filter_map(|&taxon| {
                    assigned.insert(taxon);
                    labels.get(taxon - 1).map(String::as_str)
                })
                .collect();
            graph.node_mut(prev_node).label = taxon_labels.join(",");
        }

        prev_node = node;
        prev_split = Some(event.split_index);
        ftlog::trace!("outline sweep: processed event for split {}", event.split_index);
    }

    let leftover: Vec<&str> = (1..=n_tax)
        .filter(|taxon| !assigned.contains(taxon))
        .filter_map(|taxon| labels.get(taxon - 1).map(String::as_str))
        .collect();
    if !leftover.is_empty() {
        let origin = graph.node_mut(0);
        origin.label = if origin.label.is_empty() { leftover.join(",") } else { format!("{},{}", origin.label, leftover.join(",")) };
    }

    graph
}
