//! Writes a `#nexus` document with `TAXA` and `SPLITS` blocks.

use std::io::Write;

use outline_core::{splits, Cycle, DistanceMatrix, Split};

fn fit_percent(n_tax: usize, d: &DistanceMatrix, computed: &[Split]) -> f64 {
    let sum_abs = outline_core::ls::fit(n_tax, d, computed);
    let mut sum_sq = 0.0;
    for a in 1..=n_tax {
        for b in 1..=n_tax {
            sum_sq += d.get(a - 1, b - 1).powi(2);
        }
    }
    if sum_sq <= 0.0 {
        100.0
    } else {
        100.0 * (1.0 - sum_abs / sum_sq)
    }
}

/// Writes the Nexus splits document for `splits` (fitted against `d`, using
/// `cycle`'s taxon order) to `writer`.
///
/// # Errors
///
/// Propagates any I/O failure from `writer`.
pub fn write_nexus(writer: &mut impl Write, n_tax: usize, labels: &[String], cycle: &Cycle, computed: &[Split], d: &DistanceMatrix) -> std::io::Result<()> {
    writeln!(writer, "#nexus")?;
    writeln!(writer)?;
    writeln!(writer, "BEGIN TAXA;")?;
    writeln!(writer, "\tDIMENSIONS nTax={n_tax};")?;
    writeln!(writer, "\tTAXLABELS")?;
    for label in labels {
        writeln!(writer, "\t\t'{label}'")?;
    }
    writeln!(writer, "\t;")?;
    writeln!(writer, "END; [TAXA]")?;
    writeln!(writer)?;

    let fit = fit_percent(n_tax, d, computed);
    let property = if splits::compatible(computed) { "compatible" } else { "cyclic" };

    writeln!(writer, "BEGIN SPLITS;")?;
    writeln!(writer, "\tDIMENSIONS nTax={n_tax} nSplits={};", computed.len())?;
    writeln!(writer, "\tFORMAT labels=no weights=yes confidences=no;")?;
    writeln!(writer, "\tPROPERTIES fit={fit:.2} {property};")?;
    write!(writer, "\tCYCLE")?;
    for pos in 1..=n_tax {
        write!(writer, " {}", cycle.at(pos))?;
    }
    writeln!(writer, ";")?;
    writeln!(writer, "\tMATRIX")?;
    for s in computed {
        let part: Vec<String> = s.part1().iter().map(ToString::to_string).collect();
        writeln!(writer, "\t\t{}\t{},", s.weight, part.join(" "))?;
    }
    writeln!(writer, "\t;")?;
    writeln!(writer, "END; [SPLITS]")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use outline_core::splits::cyc_split;

    #[test]
    fn writes_cycle_and_matrix_lines() {
        let cycle = Cycle::from_raw(vec![0, 1, 2, 3]);
        let splits = vec![cyc_split(&cycle, 1, 1, 0.5), cyc_split(&cycle, 2, 2, 0.5)];
        let labels: Vec<String> = vec!["A".into(), "B".into(), "C".into()];
        let d = DistanceMatrix::new(3, vec![0.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 0.0]).unwrap();

        let mut out = Vec::new();
        write_nexus(&mut out, 3, &labels, &cycle, &splits, &d).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("#nexus"));
        assert!(text.contains("CYCLE 1 2 3;"));
        assert!(text.contains("MATRIX"));
    }
}
