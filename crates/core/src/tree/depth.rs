use crate::model::tree::Node;

/// The part of the trace reachable from the root, as actually walked.
pub(crate) struct Traversal {
    /// Reachable node indices in pre-order.
    pub order: Vec<usize>,
    /// Children per node along the walked (acyclic) tree.
    pub tree_children: Vec<Vec<usize>>,
}

/// Assigns depths by an explicit-stack walk from `root`. A node reached a
/// second time keeps its first depth and is not expanded again, so cyclic
/// input is truncated instead of looping. Unreachable nodes keep depth 0.
pub(crate) fn annotate_depths(nodes: &mut [Node], children: &[Vec<usize>], root: usize) -> Traversal {
    let mut visited = vec![false; nodes.len()];
    let mut order = Vec::new();
    let mut tree_children = vec![Vec::new(); nodes.len()];
    let mut stack: Vec<(usize, Option<usize>, u32)> = vec![(root, None, 0)];

    while let Some((idx, parent, depth)) = stack.pop() {
        if visited[idx] {
            continue;
        }
        visited[idx] = true;
        nodes[idx].depth = depth;
        if let Some(parent) = parent {
            tree_children[parent].push(idx);
        }
        order.push(idx);

        // Reversed so children pop in link order.
        for &child in children[idx].iter().rev() {
            if !visited[child] {
                stack.push((child, Some(idx), depth.saturating_add(1)));
            }
        }
    }

    Traversal {
        order,
        tree_children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::link::link;
    use crate::tree::test_span as span;

    #[test]
    fn depths_follow_parent_chain() {
        let spans = vec![
            span("a", None, 0, 100),
            span("b", Some("a"), 0, 50),
            span("c", Some("b"), 0, 10),
            span("d", Some("a"), 60, 10),
        ];
        let mut linked = link(&spans).unwrap();
        let walk = annotate_depths(&mut linked.nodes, &linked.children, linked.root);
        let depths: Vec<u32> = linked.nodes.iter().map(|n| n.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 1]);
        assert_eq!(walk.order, vec![0, 1, 2, 3]);
        assert_eq!(walk.tree_children[0], vec![1, 3]);
    }

    #[test]
    fn unreachable_nodes_keep_depth_zero() {
        let spans = vec![
            span("r1", None, 10, 5),
            span("r1-child", Some("r1"), 11, 1),
            span("r2", None, 5, 5),
        ];
        let mut linked = link(&spans).unwrap();
        let walk = annotate_depths(&mut linked.nodes, &linked.children, linked.root);
        assert_eq!(walk.order, vec![2]);
        assert!(linked.nodes.iter().all(|n| n.depth == 0));
    }

    #[test]
    fn repeated_visit_is_skipped() {
        // Adjacency with a back edge 2 -> 0; linking never produces this from
        // single-parent spans, but the walk must still terminate.
        let spans = vec![
            span("a", None, 0, 10),
            span("b", Some("a"), 0, 5),
            span("c", Some("b"), 0, 1),
        ];
        let mut linked = link(&spans).unwrap();
        linked.children[2].push(0);
        linked.children[2].push(1);
        let walk = annotate_depths(&mut linked.nodes, &linked.children, linked.root);
        assert_eq!(walk.order, vec![0, 1, 2]);
        assert_eq!(linked.nodes[0].depth, 0);
        assert_eq!(linked.nodes[1].depth, 1);
        assert!(walk.tree_children[2].is_empty());
    }
}
