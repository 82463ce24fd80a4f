//! Query algorithms over a built tree.
//!
//! The range query is a plain pruned pre-order traversal. Both
//! nearest-neighbour searches are branch-and-bound over an explicit
//! min-priority queue: pending work is a sum type (a subtree, a candidate
//! entry, or a pair of either) keyed by an envelope lower-bound distance.
//! Envelope distance never overestimates the true distance between the
//! geometries it bounds, so discarding everything whose bound exceeds the
//! best exact distance found so far is sound.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;

use crate::envelope::Envelope;
use crate::error::{SpatialError, SpatialResult};
use crate::kernel::GeometryKernel;

use super::types::{IndexEntry, ItemRef, NodeId, StrTree, TreeNode};

/// Returns every indexed item whose envelope intersects the query envelope.
///
/// Deterministic pre-order traversal; a subtree is pruned as soon as its
/// envelope misses the query. Output order is traversal order, and no
/// deduplication is needed because each item lives in exactly one leaf.
pub fn range_query(tree: &StrTree, query: &Envelope) -> Vec<ItemRef> {
    let mut results = Vec::new();
    collect_intersecting(tree, tree.root(), query, &mut results);
    results
}

fn collect_intersecting(tree: &StrTree, id: NodeId, query: &Envelope, out: &mut Vec<ItemRef>) {
    let node = tree.node(id);
    if !node.envelope().intersects(query) {
        return;
    }
    match node {
        TreeNode::Leaf { entries, .. } => {
            for entry in entries {
                if entry.envelope.intersects(query) {
                    out.push(entry.item);
                }
            }
        }
        TreeNode::Internal { children, .. } => {
            for &child in children {
                collect_intersecting(tree, child, query, out);
            }
        }
    }
}

/// An entry in the branch-and-bound queue, ordered by its lower bound only.
struct QueueEntry<T> {
    bound: OrderedFloat<f64>,
    task: T,
}

impl<T> PartialEq for QueueEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.bound == other.bound
    }
}

impl<T> Eq for QueueEntry<T> {}

impl<T> PartialOrd for QueueEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for QueueEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the BinaryHeap pops the minimum bound first.
        other.bound.cmp(&self.bound)
    }
}

/// Pending work in the single-object search.
enum Pending {
    Node(NodeId),
    Item(IndexEntry),
}

/// Finds the indexed item nearest to a query object.
///
/// `query_envelope` bounds the query object and `query_item` is its
/// reference, which the kernel resolves when computing exact distances.
/// `exclude` skips one reference; passing the query's own reference finds
/// an item's nearest neighbour other than itself.
///
/// Fails with [`SpatialError::EmptyIndex`] when no eligible item exists.
pub fn nearest_neighbour(
    tree: &StrTree,
    query_envelope: &Envelope,
    query_item: ItemRef,
    exclude: Option<ItemRef>,
    kernel: &dyn GeometryKernel,
) -> SpatialResult<ItemRef> {
    let mut queue: BinaryHeap<QueueEntry<Pending>> = BinaryHeap::new();
    let root = tree.root();
    queue.push(QueueEntry {
        bound: OrderedFloat(tree.node(root).envelope().distance_to(query_envelope)),
        task: Pending::Node(root),
    });

    let mut best: Option<(f64, ItemRef)> = None;
    while let Some(QueueEntry { bound, task }) = queue.pop() {
        if let Some((best_distance, _)) = best {
            if bound.into_inner() > best_distance {
                break;
            }
        }
        match task {
            Pending::Node(id) => match tree.node(id) {
                TreeNode::Leaf { entries, .. } => {
                    for entry in entries {
                        if exclude == Some(entry.item) {
                            continue;
                        }
                        queue.push(QueueEntry {
                            bound: OrderedFloat(entry.envelope.distance_to(query_envelope)),
                            task: Pending::Item(*entry),
                        });
                    }
                }
                TreeNode::Internal { children, .. } => {
                    for &child in children {
                        queue.push(QueueEntry {
                            bound: OrderedFloat(
                                tree.node(child).envelope().distance_to(query_envelope),
                            ),
                            task: Pending::Node(child),
                        });
                    }
                }
            },
            Pending::Item(entry) => {
                let distance = kernel.item_distance(query_item, entry.item)?;
                let better = match best {
                    None => true,
                    Some((best_distance, _)) => distance < best_distance,
                };
                if better {
                    best = Some((distance, entry.item));
                }
            }
        }
    }

    best.map(|(_, item)| item).ok_or(SpatialError::EmptyIndex)
}

/// One side of a pending pair: a whole subtree or a single entry.
#[derive(Clone, Copy)]
enum Side {
    Node(NodeId),
    Entry(IndexEntry),
}

impl Side {
    fn envelope<'a>(&'a self, tree: &'a StrTree) -> &'a Envelope {
        match self {
            Side::Node(id) => tree.node(*id).envelope(),
            Side::Entry(entry) => &entry.envelope,
        }
    }
}

/// Finds the two closest distinct items in the whole tree.
///
/// This is a self-join: branch-and-bound over pairs of subtrees, seeded
/// with (root, root) at bound 0. A popped pair of two distinct entries is
/// refined through the kernel; a pair with at least one subtree side
/// expands by substituting each subtree side, independently, with its
/// children. The search is sound but carries no sub-quadratic worst-case
/// guarantee, so expect it to be markedly heavier than the single-object
/// search on large indexes.
///
/// Fails with [`SpatialError::EmptyIndex`] when the tree holds fewer than
/// two distinct items.
pub fn nearest_pair(
    tree: &StrTree,
    kernel: &dyn GeometryKernel,
) -> SpatialResult<(ItemRef, ItemRef)> {
    let root = Side::Node(tree.root());
    let mut queue: BinaryHeap<QueueEntry<(Side, Side)>> = BinaryHeap::new();
    queue.push(QueueEntry {
        bound: OrderedFloat(0.0),
        task: (root, root),
    });

    let mut best: Option<(f64, (ItemRef, ItemRef))> = None;
    while let Some(QueueEntry { bound, task: (a, b) }) = queue.pop() {
        if let Some((best_distance, _)) = best {
            if bound.into_inner() > best_distance {
                break;
            }
        }
        match (a, b) {
            (Side::Entry(ea), Side::Entry(eb)) => {
                if ea.item == eb.item {
                    continue;
                }
                let distance = kernel.item_distance(ea.item, eb.item)?;
                let better = match best {
                    None => true,
                    Some((best_distance, _)) => distance < best_distance,
                };
                if better {
                    best = Some((distance, (ea.item, eb.item)));
                }
            }
            _ => {
                if let Side::Node(id) = a {
                    for part in node_parts(tree, id) {
                        push_pair(&mut queue, tree, part, b);
                    }
                }
                if let Side::Node(id) = b {
                    for part in node_parts(tree, id) {
                        push_pair(&mut queue, tree, a, part);
                    }
                }
            }
        }
    }

    best.map(|(_, pair)| pair).ok_or(SpatialError::EmptyIndex)
}

fn node_parts(tree: &StrTree, id: NodeId) -> Vec<Side> {
    match tree.node(id) {
        TreeNode::Leaf { entries, .. } => entries.iter().map(|e| Side::Entry(*e)).collect(),
        TreeNode::Internal { children, .. } => {
            children.iter().map(|&c| Side::Node(c)).collect()
        }
    }
}

fn push_pair(queue: &mut BinaryHeap<QueueEntry<(Side, Side)>>, tree: &StrTree, a: Side, b: Side) {
    let bound = a.envelope(tree).distance_to(b.envelope(tree));
    queue.push(QueueEntry {
        bound: OrderedFloat(bound),
        task: (a, b),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use crate::kernel::PredicateKind;
    use crate::strtree::builder::bulk_load;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;
    use std::collections::HashSet;

    /// Kernel over a fixed set of point items; exact distance is the
    /// planar distance between the two referenced points.
    struct PointKernel {
        positions: HashMap<ItemRef, (f64, f64)>,
    }

    impl PointKernel {
        fn new(positions: &[(ItemRef, f64, f64)]) -> Self {
            Self {
                positions: positions.iter().map(|&(i, x, y)| (i, (x, y))).collect(),
            }
        }

        fn position(&self, item: ItemRef) -> SpatialResult<(f64, f64)> {
            self.positions.get(&item).copied().ok_or_else(|| {
                SpatialError::GeometryConstruction(format!("unknown item {}", item))
            })
        }
    }

    impl GeometryKernel for PointKernel {
        fn predicate(
            &self,
            _kind: PredicateKind,
            _query: &Geometry,
            _candidate: &Geometry,
        ) -> SpatialResult<bool> {
            Ok(false)
        }

        fn item_distance(&self, a: ItemRef, b: ItemRef) -> SpatialResult<f64> {
            let (ax, ay) = self.position(a)?;
            let (bx, by) = self.position(b)?;
            Ok(((ax - bx).powi(2) + (ay - by).powi(2)).sqrt())
        }
    }

    fn point_setup(points: &[(ItemRef, f64, f64)]) -> (StrTree, PointKernel) {
        let entries = points
            .iter()
            .map(|&(item, x, y)| IndexEntry::new(Envelope::point(x, y), item))
            .collect();
        let tree = bulk_load(entries, 4).unwrap();
        (tree, PointKernel::new(points))
    }

    fn brute_force_range(entries: &[IndexEntry], query: &Envelope) -> HashSet<ItemRef> {
        entries
            .iter()
            .filter(|e| e.envelope.intersects(query))
            .map(|e| e.item)
            .collect()
    }

    #[test]
    fn test_range_query_scenario() {
        let entries = vec![
            IndexEntry::new(Envelope::new(0.0, 0.0, 1.0, 1.0), 1),
            IndexEntry::new(Envelope::new(2.0, 2.0, 3.0, 3.0), 2),
            IndexEntry::new(Envelope::new(10.0, 10.0, 11.0, 11.0), 3),
        ];
        let tree = bulk_load(entries, 10).unwrap();

        let found: HashSet<ItemRef> =
            range_query(&tree, &Envelope::new(0.0, 0.0, 3.0, 3.0)).into_iter().collect();
        assert_eq!(found, HashSet::from([1, 2]));
    }

    #[test]
    fn test_range_query_no_match() {
        let entries = vec![IndexEntry::new(Envelope::new(0.0, 0.0, 1.0, 1.0), 1)];
        let tree = bulk_load(entries, 10).unwrap();
        assert!(range_query(&tree, &Envelope::new(5.0, 5.0, 6.0, 6.0)).is_empty());
    }

    #[test]
    fn test_range_query_touching_counts() {
        let entries = vec![IndexEntry::new(Envelope::new(0.0, 0.0, 1.0, 1.0), 1)];
        let tree = bulk_load(entries, 10).unwrap();
        assert_eq!(range_query(&tree, &Envelope::new(1.0, 1.0, 2.0, 2.0)), vec![1]);
    }

    #[test]
    fn test_range_query_matches_linear_scan() {
        let mut rng = StdRng::seed_from_u64(42);
        let entries: Vec<IndexEntry> = (0..500)
            .map(|i| {
                let x: f64 = rng.gen_range(0.0..100.0);
                let y: f64 = rng.gen_range(0.0..100.0);
                let w: f64 = rng.gen_range(0.0..5.0);
                let h: f64 = rng.gen_range(0.0..5.0);
                IndexEntry::new(Envelope::new(x, y, x + w, y + h), i)
            })
            .collect();
        let tree = bulk_load(entries.clone(), 8).unwrap();

        for _ in 0..50 {
            let x: f64 = rng.gen_range(-10.0..100.0);
            let y: f64 = rng.gen_range(-10.0..100.0);
            let query = Envelope::new(x, y, x + rng.gen_range(0.0..30.0), y + rng.gen_range(0.0..30.0));
            let found: HashSet<ItemRef> = range_query(&tree, &query).into_iter().collect();
            assert_eq!(found, brute_force_range(&entries, &query));
        }
    }

    #[test]
    fn test_nearest_neighbour_scenario() {
        // Query at the center of item 1's envelope; 1 itself is excluded.
        let points = [
            (1, 0.5, 0.5),
            (2, 2.5, 2.5),
            (3, 10.5, 10.5),
        ];
        let (tree, kernel) = point_setup(&points);

        let nearest = nearest_neighbour(
            &tree,
            &Envelope::point(0.5, 0.5),
            1,
            Some(1),
            &kernel,
        )
        .unwrap();
        assert_eq!(nearest, 2);
    }

    #[test]
    fn test_nearest_neighbour_without_exclusion() {
        let points = [(1, 0.5, 0.5), (2, 2.5, 2.5)];
        let (tree, kernel) = point_setup(&points);
        let nearest =
            nearest_neighbour(&tree, &Envelope::point(0.5, 0.5), 1, None, &kernel).unwrap();
        assert_eq!(nearest, 1);
    }

    #[test]
    fn test_nearest_neighbour_single_excluded_item_fails() {
        let points = [(1, 0.5, 0.5)];
        let (tree, kernel) = point_setup(&points);
        let result = nearest_neighbour(&tree, &Envelope::point(0.5, 0.5), 1, Some(1), &kernel);
        assert!(matches!(result, Err(SpatialError::EmptyIndex)));
    }

    #[test]
    fn test_nearest_neighbour_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(7);
        let points: Vec<(ItemRef, f64, f64)> = (0..200)
            .map(|i| (i, rng.gen_range(0.0..50.0), rng.gen_range(0.0..50.0)))
            .collect();
        let (tree, kernel) = point_setup(&points);

        for &(query_item, qx, qy) in points.iter().step_by(17) {
            let nearest = nearest_neighbour(
                &tree,
                &Envelope::point(qx, qy),
                query_item,
                Some(query_item),
                &kernel,
            )
            .unwrap();

            let best_distance = points
                .iter()
                .filter(|&&(i, _, _)| i != query_item)
                .map(|&(_, x, y)| ((x - qx).powi(2) + (y - qy).powi(2)).sqrt())
                .fold(f64::INFINITY, f64::min);
            let nearest_distance = kernel.item_distance(query_item, nearest).unwrap();
            assert!(
                (nearest_distance - best_distance).abs() < 1e-9,
                "expected distance {}, got {}",
                best_distance,
                nearest_distance
            );
        }
    }

    #[test]
    fn test_nearest_pair_scenario() {
        let points = [
            (1, 0.5, 0.5),
            (2, 2.5, 2.5),
            (3, 10.5, 10.5),
        ];
        let (tree, kernel) = point_setup(&points);
        let (a, b) = nearest_pair(&tree, &kernel).unwrap();
        let mut pair = [a, b];
        pair.sort_unstable();
        assert_eq!(pair, [1, 2]);
    }

    #[test]
    fn test_nearest_pair_single_item_fails() {
        let (tree, kernel) = point_setup(&[(1, 0.0, 0.0)]);
        assert!(matches!(
            nearest_pair(&tree, &kernel),
            Err(SpatialError::EmptyIndex)
        ));
    }

    #[test]
    fn test_nearest_pair_two_items() {
        let (tree, kernel) = point_setup(&[(1, 0.0, 0.0), (2, 9.0, 9.0)]);
        let (a, b) = nearest_pair(&tree, &kernel).unwrap();
        let mut pair = [a, b];
        pair.sort_unstable();
        assert_eq!(pair, [1, 2]);
    }

    #[test]
    fn test_nearest_pair_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(99);
        for round in 0..5 {
            let n = 10 + round * 10; // up to 50
            let points: Vec<(ItemRef, f64, f64)> = (0..n)
                .map(|i| (i, rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0)))
                .collect();
            let (tree, kernel) = point_setup(&points);

            let (a, b) = nearest_pair(&tree, &kernel).unwrap();
            let found = kernel.item_distance(a, b).unwrap();

            let mut best = f64::INFINITY;
            for i in 0..points.len() {
                for j in (i + 1)..points.len() {
                    let (_, ax, ay) = points[i];
                    let (_, bx, by) = points[j];
                    best = best.min(((ax - bx).powi(2) + (ay - by).powi(2)).sqrt());
                }
            }
            assert!(
                (found - best).abs() < 1e-9,
                "round {}: expected pair distance {}, got {}",
                round,
                best,
                found
            );
            assert_ne!(a, b);
        }
    }
}
