//! Reconstruction of a trace tree from a flat span list.
//!
//! The pipeline is link → depth → self time → critical path, each step
//! reading the structure built by the linker. Everything here is pure: the
//! same span slice always yields the same [`TraceTree`].

mod critical_path;
mod depth;
mod link;
mod self_time;

use crate::model::span::Span;
use crate::model::tree::{TraceTree, TreeStatus};

use self::link::LinkedTrace;

/// Builds the tree for `trace_id` from a snapshot of its spans.
///
/// Empty input yields a `NOT_FOUND` result; input where no span qualifies as
/// root yields `MALFORMED`. Neither is an `Err`: the status travels with the
/// result so callers can hand it straight to a UI.
pub fn build_tree(trace_id: &str, spans: &[Span]) -> TraceTree {
    if spans.is_empty() {
        return TraceTree::not_found(trace_id);
    }

    let LinkedTrace {
        mut nodes,
        children,
        root,
    } = match link::link(spans) {
        Ok(linked) => linked,
        Err(err) => return TraceTree::malformed(trace_id, err.to_string()),
    };

    let walk = depth::annotate_depths(&mut nodes, &children, root);
    self_time::annotate_self_times(&mut nodes, &children);
    let path = critical_path::resolve(&nodes, &walk, root);

    let root_span_id = nodes[root].span_id.clone();
    let critical_path = path
        .indices
        .iter()
        .map(|&i| nodes[i].span_id.clone())
        .collect();

    // Stable sort: equal (depth, start) keeps input order.
    nodes.sort_by_key(|n| (n.depth, n.start_time_micros));

    TraceTree {
        trace_id: trace_id.to_string(),
        root_span_id: Some(root_span_id),
        status: TreeStatus::Found,
        message: "OK".to_string(),
        nodes,
        critical_path,
        critical_path_micros: path.total_micros,
    }
}

#[cfg(test)]
pub(crate) fn test_span(id: &str, parent: Option<&str>, start: i64, duration: u64) -> Span {
    Span {
        trace_id: "trace-1".to_string(),
        span_id: id.to_string(),
        parent_span_id: parent.map(str::to_string),
        name: format!("op-{id}"),
        kind: crate::model::span::SpanKind::Internal,
        service_name: "svc".to_string(),
        node_id: "node-1".to_string(),
        start_time_micros: start,
        duration_micros: duration,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::test_span as span;
    use super::*;
    use crate::model::tree::Node;

    fn by_id(tree: &TraceTree) -> HashMap<&str, &Node> {
        tree.nodes.iter().map(|n| (n.span_id.as_str(), n)).collect()
    }

    /// Deterministic wide/deep tree: node i hangs under (i * 7 + 3) % i.
    fn generated_trace(count: usize) -> Vec<Span> {
        let mut spans = vec![span("n0", None, 0, 10_000)];
        for i in 1..count {
            let parent = (i * 7 + 3) % i;
            let start = (i as i64 * 37) % 9_000;
            let duration = ((i * 53) % 1_500) as u64;
            spans.push(span(
                &format!("n{i}"),
                Some(&format!("n{parent}")),
                start,
                duration,
            ));
        }
        // Reverse so children usually precede their parents in the input.
        spans.reverse();
        spans
    }

    #[test]
    fn empty_input_is_not_found() {
        let tree = build_tree("missing", &[]);
        assert_eq!(tree.status, TreeStatus::NotFound);
        assert_eq!(tree.message, "Trace not found");
        assert!(tree.nodes.is_empty());
        assert!(tree.critical_path.is_empty());
        assert!(tree.root_span_id.is_none());
    }

    #[test]
    fn three_span_scenario() {
        let spans = vec![
            span("A", None, 0, 100),
            span("B", Some("A"), 0, 40),
            span("C", Some("A"), 50, 50),
        ];
        let tree = build_tree("trace-1", &spans);
        let nodes = by_id(&tree);

        assert_eq!(tree.status, TreeStatus::Found);
        assert_eq!(tree.message, "OK");
        assert_eq!(tree.root_span_id.as_deref(), Some("A"));
        assert_eq!(nodes["A"].depth, 0);
        assert_eq!(nodes["B"].depth, 1);
        assert_eq!(nodes["C"].depth, 1);
        assert_eq!(nodes["A"].self_time_micros, 10);
        assert_eq!(nodes["A"].end_time_micros, 100);
        assert_eq!(tree.critical_path, vec!["A", "C"]);
        assert_eq!(tree.critical_path_micros, 150);
        let order: Vec<&str> = tree.nodes.iter().map(|n| n.span_id.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn disjoint_roots_pick_earliest_start() {
        let spans = vec![
            span("R1", None, 10, 100),
            span("R1a", Some("R1"), 20, 90),
            span("R2", None, 5, 10),
            span("R2a", Some("R2"), 6, 2),
        ];
        let tree = build_tree("trace-1", &spans);
        let nodes = by_id(&tree);

        assert_eq!(tree.root_span_id.as_deref(), Some("R2"));
        assert_eq!(tree.nodes.len(), 4);
        assert_eq!(nodes["R1"].depth, 0);
        assert_eq!(nodes["R1a"].depth, 0);
        assert_eq!(nodes["R2a"].depth, 1);
        assert_eq!(tree.critical_path, vec!["R2", "R2a"]);
        assert_eq!(tree.critical_path_micros, 12);
    }

    #[test]
    fn cycle_only_input_is_malformed() {
        let spans = vec![span("a", Some("b"), 0, 1), span("b", Some("a"), 1, 1)];
        let tree = build_tree("trace-1", &spans);
        assert_eq!(tree.status, TreeStatus::Malformed);
        assert!(tree.message.contains("no root span"));
        assert!(tree.nodes.is_empty());
        assert!(tree.critical_path.is_empty());
        assert!(tree.root_span_id.is_none());
    }

    #[test]
    fn cycle_beside_a_root_is_listed_but_ignored() {
        let spans = vec![
            span("root", None, 0, 10),
            span("x", Some("y"), 0, 50),
            span("y", Some("x"), 0, 50),
        ];
        let tree = build_tree("trace-1", &spans);
        assert_eq!(tree.status, TreeStatus::Found);
        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.critical_path, vec!["root"]);
    }

    #[test]
    fn nodes_sorted_by_depth_then_start() {
        let spans = vec![
            span("c2", Some("b"), 30, 5),
            span("b", Some("a"), 20, 30),
            span("c1", Some("b"), 25, 5),
            span("a", None, 0, 100),
            span("b2", Some("a"), 10, 5),
        ];
        let tree = build_tree("trace-1", &spans);
        let order: Vec<&str> = tree.nodes.iter().map(|n| n.span_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b2", "b", "c1", "c2"]);
    }

    #[test]
    fn input_slice_is_untouched() {
        let spans = generated_trace(50);
        let before = spans.clone();
        let _ = build_tree("trace-1", &spans);
        assert_eq!(spans, before);
    }

    #[test]
    fn repeated_builds_serialize_identically() {
        let spans = generated_trace(300);
        let first = serde_json::to_vec(&build_tree("trace-1", &spans)).unwrap();
        let second = serde_json::to_vec(&build_tree("trace-1", &spans)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn generated_tree_properties_hold() {
        let spans = generated_trace(500);
        let tree = build_tree("trace-1", &spans);
        let nodes = by_id(&tree);

        assert_eq!(tree.nodes.len(), spans.len());
        assert_eq!(tree.root_span_id.as_deref(), Some("n0"));

        for span in &spans {
            let node = nodes[span.span_id.as_str()];
            assert!(node.self_time_micros <= node.duration_micros);
            if node.children.is_empty() {
                assert_eq!(node.self_time_micros, node.duration_micros);
            }
            match &span.parent_span_id {
                Some(parent) => {
                    let parent = nodes[parent.as_str()];
                    assert!(parent.children.contains(&span.span_id));
                    assert_eq!(node.depth, parent.depth + 1);
                }
                None => assert_eq!(node.depth, 0),
            }
        }

        let child_count: usize = tree.nodes.iter().map(|n| n.children.len()).sum();
        assert_eq!(child_count, spans.len() - 1);

        assert_eq!(tree.critical_path[0], "n0");
        let path_sum: u64 = tree
            .critical_path
            .iter()
            .map(|id| nodes[id.as_str()].duration_micros)
            .sum();
        assert_eq!(path_sum, tree.critical_path_micros);
        for pair in tree.critical_path.windows(2) {
            assert!(nodes[pair[0].as_str()].children.contains(&pair[1]));
        }

        // Brute force: no root-to-node chain sums higher.
        let mut best = 0u64;
        for node in &tree.nodes {
            let mut sum = 0u64;
            let mut current = Some(node);
            while let Some(n) = current {
                sum += n.duration_micros;
                current = n.parent_span_id.as_deref().map(|p| nodes[p]);
            }
            best = best.max(sum);
        }
        assert_eq!(best, tree.critical_path_micros);
    }
}
