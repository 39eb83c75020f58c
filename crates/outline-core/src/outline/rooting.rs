//! Midpoint and out-group rooting: choosing a split to cut, synthesizing a
//! `Root` taxon, and threading it into the cycle and split family.

use crate::splits::{cyc_split, split_distance, Cycle, Split};

fn max_distance_pair(n_tax: usize, d_split: &[Vec<f64>]) -> (usize, usize) {
    let mut best = (1, 2);
    let mut best_dist = f64::MIN;
    for a in 1..=n_tax {
        for b in (a + 1)..=n_tax {
            if d_split[a][b] > best_dist {
                best_dist = d_split[a][b];
                best = (a, b);
            }
        }
    }
    best
}

/// Finds the split that crosses the midpoint of the two most distant taxa,
/// returning `(split_index, w1, w2)` where `w1 + w2` is that split's weight.
pub(crate) fn root_location_mid_point(n_tax: usize, cycle: &Cycle, splits: &[Split]) -> (usize, f64, f64) {
    let d_split = split_distance(n_tax, splits);
    let (a, b) = max_distance_pair(n_tax, &d_split);
    let max_dist = d_split[a][b];

    let mut candidates: Vec<(usize, usize, usize)> = Vec::new();
    for (idx, s) in splits.iter().enumerate() {
        if s.separates(a, b) {
            candidates.push((s.size(), s.part_not_in(cycle.at(1)).len(), idx));
        }
    }
    candidates.sort_unstable();

    let half = max_dist / 2.0;
    let mut cumulative = 0.0;
    for &(_, _, idx) in &candidates {
        let w = splits[idx].weight;
        if cumulative + w >= half {
            let w2 = half - cumulative;
            let w1 = w - w2;
            return (idx, w1, w2);
        }
        cumulative += w;
    }

    let last = candidates.last().map_or(0, |&(_, _, idx)| idx);
    (last, splits[last].weight, 0.0)
}

/// Finds the minimal split whose "outside" part contains every taxon in
/// `out_group`, returning a `(split_index, w1, w2)` 90/10 weight split.
pub(crate) fn root_location_out_group(cycle: &Cycle, splits: &[Split], out_group: &[usize]) -> (usize, f64, f64) {
    let anchor = cycle.at(1);
    let mut best: Option<(usize, usize)> = None;

    for (idx, s) in splits.iter().enumerate() {
        let part = s.part_in(out_group[0]);
        if out_group.iter().all(|t| part.contains(t)) && !part.contains(&anchor) {
            let size = part.len();
            let better = match best {
                None => true,
                Some((_, best_size)) => size < best_size,
            };
            if better {
                best = Some((idx, size));
            }
        }
    }

    let idx = best.map_or(0, |(i, _)| i);
    let w = splits[idx].weight;
    (idx, w * 0.9, w * 0.1)
}

/// Synthesizes the `Root` taxon, splicing it into `cycle` and re-deriving
/// every split's membership, and appends the `mid1`/`mid2`/girdle splits.
pub(crate) fn setup_rooted(
    n_tax: usize,
    labels: &[String],
    splits: &[Split],
    cycle: &Cycle,
    root_idx: usize,
    w1: f64,
    w2: f64,
    alt: bool,
) -> (usize, Vec<String>, Cycle, Vec<Split>) {
    let new_n_tax = n_tax + 1;
    let root_taxon = new_n_tax;

    let root_split = &splits[root_idx];
    let anchor = cycle.at(1);
    let outside = root_split.part_not_in(anchor);

    let mut insert_after = 0;
    if alt {
        for pos in (1..=n_tax).rev() {
            if outside.contains(&cycle.at(pos)) {
                insert_after = pos;
                break;
            }
        }
    } else {
        for pos in 1..=n_tax {
            if outside.contains(&cycle.at(pos)) {
                insert_after = pos;
                break;
            }
        }
    }

    let mut new_raw = vec![0];
    for pos in 1..=n_tax {
        new_raw.push(cycle.at(pos));
        if pos == insert_after {
            new_raw.push(root_taxon);
        }
    }
    if insert_after == 0 {
        new_raw.push(root_taxon);
    }
    let new_cycle = Cycle::from_raw(new_raw);

    let mut new_labels = labels.to_vec();
    new_labels.push("Root".to_string());

    let total_weight: f64 = splits.iter().map(|s| s.weight).sum();

    let mut new_splits = Vec::with_capacity(splits.len() + 3);
    for (idx, s) in splits.iter().enumerate() {
        if idx == root_idx {
            continue;
        }
        let (start, end) = s.interval(cycle);
        let mut clone = s.clone();
        if start <= insert_after && insert_after < end {
            clone.part_not_in_mut(anchor).insert(root_taxon);
        } else {
            clone.part_in_mut(anchor).insert(root_taxon);
        }
        new_splits.push(clone);
    }

    let mut mid1 = root_split.clone();
    mid1.part_in_mut(anchor).insert(root_taxon);
    mid1.weight = w1;
    new_splits.push(mid1);

    let mut mid2 = root_split.clone();
    mid2.part_not_in_mut(anchor).insert(root_taxon);
    mid2.weight = w2;
    new_splits.push(mid2);

    let girdle_weight = if splits.is_empty() { 0.0 } else { total_weight / splits.len() as f64 };
    new_splits.push(cyc_split(&new_cycle, 2, new_n_tax, girdle_weight));

    ftlog::debug!("rooting: inserted Root after position {insert_after}, total splits now {}", new_splits.len());

    (root_taxon, new_labels, new_cycle, new_splits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle(taxa: &[usize]) -> Cycle {
        let mut raw = vec![0];
        raw.extend_from_slice(taxa);
        Cycle::from_raw(raw)
    }

    #[test]
    fn mid_point_root_splits_the_longest_path() {
        let c = cycle(&[1, 2, 3, 4]);
        let splits = vec![
            cyc_split(&c, 1, 1, 1.0),
            cyc_split(&c, 1, 2, 4.0),
            cyc_split(&c, 2, 2, 1.0),
        ];
        let (idx, w1, w2) = root_location_mid_point(4, &c, &splits);
        assert!(idx < splits.len());
        assert!((w1 + w2 - splits[idx].weight).abs() < 1e-9);
    }

    #[test]
    fn setup_rooted_adds_one_taxon_and_three_splits() {
        let c = cycle(&[1, 2, 3, 4]);
        let splits = vec![cyc_split(&c, 1, 1, 1.0), cyc_split(&c, 1, 2, 2.0), cyc_split(&c, 2, 2, 1.0)];
        let labels: Vec<String> = vec!["a".into(), "b".into(), "c".into(), "d".into()];
        let (root_taxon, new_labels, new_cycle, new_splits) = setup_rooted(4, &labels, &splits, &c, 1, 1.0, 1.0, false);
        assert_eq!(root_taxon, 5);
        assert_eq!(new_labels.len(), 5);
        assert_eq!(new_cycle.n_tax(), 5);
        assert_eq!(new_splits.len(), splits.len() - 1 + 3);
    }
}
