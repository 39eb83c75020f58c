//! Writes the outline graph in Trivial Graph Format: a node section, a `#`
//! separator, then an edge section.

use std::io::Write;

use outline_core::OutlineGraph;

/// Canvas dimensions accepted for the downstream renderer but not consumed
/// by this crate; stashed as a TGF comment on the first node.
#[derive(Debug, Clone, Copy)]
pub struct CanvasOptions {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub font_size: u32,
}

/// Writes `graph` as TGF to `writer`. `canvas`, if given, is recorded as a
/// comment so a downstream 2-D renderer can recover it.
///
/// # Errors
///
/// Propagates any I/O failure from `writer`.
pub fn write_tgf(writer: &mut impl Write, graph: &OutlineGraph, canvas: Option<CanvasOptions>) -> std::io::Result<()> {
    for (id, node) in graph.nodes.iter().enumerate() {
        if node.label.is_empty() {
            writeln!(writer, "{id} {:.6} {:.6}", node.x, node.y)?;
        } else {
            writeln!(writer, "{id} {} {:.6} {:.6}", node.label, node.x, node.y)?;
        }
    }
    writeln!(writer, "#")?;
    for edge in &graph.edges {
        writeln!(writer, "{} {} {:.6}", edge.src, edge.tar, edge.weight)?;
    }
    if let Some(c) = canvas {
        writeln!(writer, "# canvas width={} height={} margin={} font-size={}", c.width, c.height, c.margin, c.font_size)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use outline_core::{OutlineEdge, OutlineNode};

    #[test]
    fn writes_node_then_separator_then_edge_section() {
        let graph = OutlineGraph {
            nodes: vec![OutlineNode { x: 0.0, y: 0.0, label: String::new() }, OutlineNode { x: 1.0, y: 1.0, label: "A".into() }],
            edges: vec![OutlineEdge { src: 0, tar: 1, weight: 2.5, split_index: 0 }],
        };
        let mut out = Vec::new();
        write_tgf(&mut out, &graph, None).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "0 0.000000 0.000000");
        assert_eq!(lines[1], "1 A 1.000000 1.000000");
        assert_eq!(lines[2], "#");
        assert_eq!(lines[3], "0 1 2.500000");
    }
}
