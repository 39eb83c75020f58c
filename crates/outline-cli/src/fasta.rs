//! Exports a split family as a FASTA-like `0`/`1` matrix, one record per
//! taxon: supplements the Nexus writer with the format `splits_io.py`'s
//! `print_splits_fasta` produced.

use std::io::Write;

use outline_core::Split;

/// Writes one `>label` record per taxon, the record body being a `0`/`1`
/// character per split (`1` iff the taxon is in that split's `part1`).
///
/// # Errors
///
/// Propagates any I/O failure from `writer`.
pub fn write_fasta(writer: &mut impl Write, labels: &[String], computed: &[Split]) -> std::io::Result<()> {
    for (idx, label) in labels.iter().enumerate() {
        let taxon = idx + 1;
        writeln!(writer, ">{label}")?;
        let bits: String = computed.iter().map(|s| if s.part1().contains(&taxon) { '1' } else { '0' }).collect();
        writeln!(writer, "{bits}")?;
    }
    Ok(())
}
