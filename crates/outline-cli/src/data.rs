//! Reads the plain-text distance-matrix format: a taxon count, then one
//! label-and-row line per taxon.

use std::io::BufRead;

use outline_core::DistanceMatrix;

use crate::error::InputError;

/// Parses a distance matrix (and its taxon labels) from `reader`.
///
/// # Errors
///
/// Returns [`InputError::Format`] for a malformed taxon count, wrong token
/// count, or non-numeric distance, and [`InputError::Domain`] if the core
/// rejects the parsed matrix (e.g. asymmetric).
pub fn read_distances(reader: impl BufRead) -> Result<(Vec<String>, DistanceMatrix), InputError> {
    let mut lines = reader.lines();

    let first = lines.next().ok_or_else(|| InputError::Format { line: 1, detail: "empty input".to_string() })??;
    let n: usize = first
        .trim()
        .parse()
        .map_err(|_| InputError::Format { line: 1, detail: format!("expected a taxon count, found '{first}'") })?;
    if n == 0 {
        return Err(InputError::Format { line: 1, detail: "taxon count must be positive".to_string() });
    }

    let mut labels = Vec::with_capacity(n);
    let mut data = vec![0.0; n * n];

    for row in 0..n {
        let line_no = row + 2;
        let line = lines
            .next()
            .ok_or_else(|| InputError::Format { line: line_no, detail: format!("expected {n} rows, found {row}") })??;
        let mut tokens = line.split_whitespace();
        let label = tokens
            .next()
            .ok_or_else(|| InputError::Format { line: line_no, detail: "missing taxon label".to_string() })?
            .to_string();

        let rest: Vec<&str> = tokens.collect();
        if rest.len() != n {
            return Err(InputError::Format { line: line_no, detail: format!("expected {n} distances, found {}", rest.len()) });
        }
        for (col, token) in rest.into_iter().enumerate() {
            let value: f64 = token
                .parse()
                .map_err(|_| InputError::Format { line: line_no, detail: format!("non-numeric distance '{token}'") })?;
            data[row * n + col] = value;
        }

        labels.push(label);
    }

    let matrix = DistanceMatrix::new(n, data)?;
    Ok((labels, matrix))
}
