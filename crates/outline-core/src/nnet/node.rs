//! The agglomeration working set: an intrusive doubly linked list of active
//! clusters, backed by a flat arena instead of raw pointers.

/// One node in the Neighbor-Net agglomeration.
///
/// A leaf node (id in `1..=n`) represents a single taxon. A composite node,
/// created by a 3-way or 4-way join, records its two children in `ch1`/`ch2`
/// for later expansion into the final cycle.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct NetNode {
    pub(crate) id: usize,
    pub(crate) nbr: Option<usize>,
    pub(crate) ch1: Option<usize>,
    pub(crate) ch2: Option<usize>,
    pub(crate) prev: Option<usize>,
    pub(crate) next: Option<usize>,
    pub(crate) sx: f64,
    pub(crate) rx: f64,
}

/// Arena of [`NetNode`]s, indexed by `id - 1`. Ids are assigned
/// monotonically starting at 1 and are never reused.
pub(crate) struct NodePool {
    nodes: Vec<NetNode>,
}

impl NodePool {
    pub(crate) fn with_capacity(cap: usize) -> Self {
        Self { nodes: Vec::with_capacity(cap) }
    }

    /// Allocates a new node and returns its id.
    pub(crate) fn push_new(&mut self) -> usize {
        let id = self.nodes.len() + 1;
        self.nodes.push(NetNode { id, ..Default::default() });
        id
    }

    pub(crate) fn get(&self, id: usize) -> &NetNode {
        &self.nodes[id - 1]
    }

    pub(crate) fn get_mut(&mut self, id: usize) -> &mut NetNode {
        &mut self.nodes[id - 1]
    }
}

/// Walks `next` links starting at `head` until the list ends (non-circular).
pub(crate) fn collect_active(pool: &NodePool, head: usize) -> Vec<usize> {
    let mut result = Vec::new();
    let mut cur = Some(head);
    while let Some(id) = cur {
        result.push(id);
        cur = pool.get(id).next;
    }
    result
}
