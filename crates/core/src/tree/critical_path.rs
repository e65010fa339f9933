use crate::model::tree::Node;
use crate::tree::depth::Traversal;

pub(crate) struct CriticalPath {
    pub indices: Vec<usize>,
    pub total_micros: u64,
}

/// `total(n) = duration(n) + max total(child)`, computed in one post-order
/// pass over the walked tree. Each node remembers its best child, so the path
/// is read off from the root without re-summing candidates. Ties go to the
/// earliest child in link order.
pub(crate) fn resolve(nodes: &[Node], walk: &Traversal, root: usize) -> CriticalPath {
    let mut total = vec![0u64; nodes.len()];
    let mut best_child: Vec<Option<usize>> = vec![None; nodes.len()];

    // Reverse pre-order reaches every child before its parent.
    for &idx in walk.order.iter().rev() {
        let mut best: Option<(usize, u64)> = None;
        for &child in &walk.tree_children[idx] {
            if best.is_none_or(|(_, best_total)| total[child] > best_total) {
                best = Some((child, total[child]));
            }
        }
        total[idx] = nodes[idx]
            .duration_micros
            .saturating_add(best.map_or(0, |(_, t)| t));
        best_child[idx] = best.map(|(child, _)| child);
    }

    let mut indices = vec![root];
    let mut current = root;
    while let Some(next) = best_child[current] {
        indices.push(next);
        current = next;
    }

    CriticalPath {
        indices,
        total_micros: total[root],
    }
}
