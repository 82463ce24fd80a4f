//! Sort-Tile-Recursive bulk construction.
//!
//! STR builds the whole tree bottom-up from a fixed batch of entries: sort
//! by centroid x, cut into vertical slices, sort each slice by centroid y,
//! pack runs of `branching_factor` entries into leaves, then repeat the
//! same packing over the freshly built nodes until a single root remains.
//! Occupancy comes out close to 100% and spatially close entries land in
//! the same node. The tree is built once and queried many times, so there
//! is no insert/split machinery at all.

use crate::envelope::Envelope;
use crate::error::{SpatialError, SpatialResult};

use super::types::{IndexEntry, NodeId, StrTree, TreeNode};

/// Builds an STR-tree over a batch of entries.
///
/// Fails with [`SpatialError::EmptyIndex`] when the batch is empty.
/// Branching factors below 2 are rounded up to 2. The construction is
/// deterministic: equal sort keys keep their input order (stable sorts),
/// and the same batch always yields the same tree.
pub fn bulk_load(entries: Vec<IndexEntry>, branching_factor: usize) -> SpatialResult<StrTree> {
    if entries.is_empty() {
        return Err(SpatialError::EmptyIndex);
    }
    let m = branching_factor.max(2);
    let item_count = entries.len();

    let mut nodes: Vec<TreeNode> = Vec::new();

    // Leaf level.
    let mut level: Vec<(Envelope, NodeId)> = Vec::new();
    for group in partition(entries, m, |e| e.envelope.center()) {
        let envelope = union_of(group.iter().map(|e| &e.envelope));
        let id = nodes.len() as NodeId;
        nodes.push(TreeNode::Leaf {
            envelope,
            entries: group,
        });
        level.push((envelope, id));
    }

    // Internal levels, packed with the same algorithm over node envelopes.
    while level.len() > 1 {
        let mut next = Vec::new();
        for group in partition(level, m, |(envelope, _)| envelope.center()) {
            let envelope = union_of(group.iter().map(|(e, _)| e));
            let children = group.iter().map(|&(_, id)| id).collect();
            let id = nodes.len() as NodeId;
            nodes.push(TreeNode::Internal { envelope, children });
            next.push((envelope, id));
        }
        level = next;
    }

    let root = level[0].1;
    Ok(StrTree::from_parts(nodes, root, item_count, m))
}

/// Sort-tile partitioning of one level.
///
/// Sorts by centroid x, cuts into `ceil(sqrt(ceil(n/m)))` contiguous
/// slices, sorts each slice by centroid y and chunks it into groups of at
/// most `m` items. Groups never span slices.
fn partition<T: Copy>(
    mut items: Vec<T>,
    m: usize,
    center_of: impl Fn(&T) -> (f64, f64),
) -> Vec<Vec<T>> {
    let n = items.len();
    let pages = n.div_ceil(m);
    let slice_count = (pages as f64).sqrt().ceil() as usize;
    let per_slice = n.div_ceil(slice_count);

    items.sort_by(|a, b| center_of(a).0.total_cmp(&center_of(b).0));

    let mut groups = Vec::with_capacity(pages);
    let mut start = 0;
    while start < n {
        let end = (start + per_slice).min(n);
        items[start..end].sort_by(|a, b| center_of(a).1.total_cmp(&center_of(b).1));
        let mut i = start;
        while i < end {
            let j = (i + m).min(end);
            groups.push(items[i..j].to_vec());
            i = j;
        }
        start = end;
    }
    groups
}

fn union_of<'a>(envelopes: impl Iterator<Item = &'a Envelope>) -> Envelope {
    let mut union = Envelope::empty();
    for envelope in envelopes {
        union.expand(envelope);
    }
    union
}
