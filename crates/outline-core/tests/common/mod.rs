//! Synthetic distance-matrix generation for integration tests.

use outline_core::DistanceMatrix;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// A random symmetric, zero-diagonal distance matrix over `n` taxa.
pub fn random_symmetric_matrix(n: usize, seed: u64) -> DistanceMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0.0; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let value: f64 = rng.gen_range(0.1..10.0);
            data[i * n + j] = value;
            data[j * n + i] = value;
        }
    }
    DistanceMatrix::new(n, data).unwrap_or_else(|e| unreachable!("generated matrix should always be valid: {e}"))
}

pub fn labels(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("T{i}")).collect()
}
