//! Property-based tests over random symmetric distance matrices.

use outline_core::splits::compatible;
use proptest::prelude::*;

mod common;

fn is_permutation_cycle(cycle: &outline_core::Cycle, n: usize) -> bool {
    let mut seen = vec![false; n + 1];
    for pos in 1..=n {
        let taxon = cycle.at(pos);
        if taxon == 0 || taxon > n || seen[taxon] {
            return false;
        }
        seen[taxon] = true;
    }
    cycle.at(1) == 1
}

proptest! {
    #[test]
    fn cycle_is_a_canonical_permutation(n in 2usize..=8, seed in any::<u64>()) {
        let d = common::random_symmetric_matrix(n, seed);
        let labels = common::labels(n);
        let outline = outline_core::run(labels, &d, true, false, false, &[], true).unwrap();
        prop_assert!(is_permutation_cycle(&outline.cycle, n));
    }

    #[test]
    fn split_weights_are_non_negative_and_parts_partition_the_taxa(n in 2usize..=8, seed in any::<u64>()) {
        let d = common::random_symmetric_matrix(n, seed);
        let labels = common::labels(n);
        let outline = outline_core::run(labels, &d, true, false, false, &[], true).unwrap();
        for s in &outline.splits {
            prop_assert!(s.weight >= 0.0);
            prop_assert!(s.part1().is_disjoint(s.part2()));
            prop_assert!(!s.part1().is_empty() && !s.part2().is_empty());
            let mut union: Vec<usize> = s.part1().iter().chain(s.part2().iter()).copied().collect();
            union.sort_unstable();
            let expected: Vec<usize> = (1..=n).collect();
            prop_assert_eq!(union, expected);
        }
    }

    #[test]
    fn split_family_is_circular(n in 3usize..=8, seed in any::<u64>()) {
        let d = common::random_symmetric_matrix(n, seed);
        let labels = common::labels(n);
        let outline = outline_core::run(labels, &d, true, false, false, &[], true).unwrap();
        prop_assert!(compatible(&outline.splits));
    }

    #[test]
    fn round_trip_recovers_split_weights(n in 3usize..=8, seed in any::<u64>()) {
        let d = common::random_symmetric_matrix(n, seed);
        let labels = common::labels(n);
        let first = outline_core::run(labels.clone(), &d, true, false, false, &[], true).unwrap();

        let induced = outline_core::splits::split_distance(first.n_tax, &first.splits);
        let mut flat = vec![0.0; n * n];
        for a in 1..=n {
            for b in 1..=n {
                flat[(a - 1) * n + (b - 1)] = induced[a][b];
            }
        }
        let d2 = outline_core::DistanceMatrix::new(n, flat).unwrap();
        let second = outline_core::run(labels, &d2, true, false, false, &[], true).unwrap();

        let fit = outline_core::ls::fit(n, &d2, &second.splits);
        prop_assert!(fit < 1e-3, "residual fit was {fit}");
    }

    #[test]
    fn determinism_across_repeated_runs(n in 2usize..=6, seed in any::<u64>()) {
        let d = common::random_symmetric_matrix(n, seed);
        let labels = common::labels(n);
        let first = outline_core::run(labels.clone(), &d, true, false, false, &[], true).unwrap();
        let second = outline_core::run(labels, &d, true, false, false, &[], true).unwrap();
        prop_assert_eq!(first.cycle.as_slice(), second.cycle.as_slice());
        prop_assert_eq!(first.splits.len(), second.splits.len());
        for (a, b) in first.splits.iter().zip(second.splits.iter()) {
            prop_assert_eq!(a.weight.to_bits(), b.weight.to_bits());
        }
    }
}
