use std::collections::HashMap;

use crate::error::{Result, TraceTreeError};
use crate::model::span::Span;
use crate::model::tree::Node;

/// Nodes of one trace wired into parent/child edges.
pub(crate) struct LinkedTrace {
    /// One node per distinct span id, in input order.
    pub nodes: Vec<Node>,
    /// Child indices per node, same order as `Node::children`.
    pub children: Vec<Vec<usize>>,
    pub root: usize,
}

pub(crate) fn link(spans: &[Span]) -> Result<LinkedTrace> {
    // A repeated span id keeps only its last occurrence.
    let mut last_pos: HashMap<&str, usize> = HashMap::with_capacity(spans.len());
    for (pos, span) in spans.iter().enumerate() {
        last_pos.insert(span.span_id.as_str(), pos);
    }
    let mut nodes: Vec<Node> = spans
        .iter()
        .enumerate()
        .filter(|(pos, span)| last_pos.get(span.span_id.as_str()) == Some(pos))
        .map(|(_, span)| Node::from(span))
        .collect();

    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.span_id.as_str(), i))
        .collect();
    let parents: Vec<Option<usize>> = nodes
        .iter()
        .map(|n| {
            n.parent_span_id
                .as_deref()
                .and_then(|p| index.get(p).copied())
        })
        .collect();

    let mut children = vec![Vec::new(); nodes.len()];
    for (child, parent) in parents.iter().enumerate() {
        if let Some(parent) = *parent {
            children[parent].push(child);
        }
    }
    let child_ids: Vec<Vec<String>> = children
        .iter()
        .map(|kids| kids.iter().map(|&k| nodes[k].span_id.clone()).collect())
        .collect();
    for (node, ids) in nodes.iter_mut().zip(child_ids) {
        node.children = ids;
    }

    let root = select_root(&nodes, &parents).ok_or_else(|| {
        TraceTreeError::MalformedTree(
            "no root span: every parent reference resolves inside the trace".to_string(),
        )
    })?;

    Ok(LinkedTrace {
        nodes,
        children,
        root,
    })
}

/// Earliest-starting node without a resolvable parent. `sort_by_key` is
/// stable, so equal start times fall back to input order.
fn select_root(nodes: &[Node], parents: &[Option<usize>]) -> Option<usize> {
    let mut candidates: Vec<usize> = parents
        .iter()
        .enumerate()
        .filter(|(_, parent)| parent.is_none())
        .map(|(i, _)| i)
        .collect();
    candidates.sort_by_key(|&i| nodes[i].start_time_micros);
    candidates.first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::test_span as span;

    #[test]
    fn wires_children_in_input_order() {
        let spans = vec![
            span("a", None, 0, 100),
            span("c", Some("a"), 50, 10),
            span("b", Some("a"), 10, 10),
        ];
        let linked = link(&spans).unwrap();
        assert_eq!(linked.nodes[linked.root].span_id, "a");
        assert_eq!(linked.nodes[0].children, vec!["c", "b"]);
        assert_eq!(linked.children[0], vec![1, 2]);
    }

    #[test]
    fn unresolved_parent_becomes_root_candidate() {
        let spans = vec![
            span("late", None, 10, 5),
            span("orphan", Some("missing"), 5, 5),
        ];
        let linked = link(&spans).unwrap();
        assert_eq!(linked.nodes[linked.root].span_id, "orphan");
    }

    #[test]
    fn equal_start_times_pick_first_in_input() {
        let spans = vec![span("first", None, 7, 1), span("second", None, 7, 1)];
        let linked = link(&spans).unwrap();
        assert_eq!(linked.nodes[linked.root].span_id, "first");
    }

    #[test]
    fn cycle_without_root_is_malformed() {
        let spans = vec![span("a", Some("b"), 0, 1), span("b", Some("a"), 0, 1)];
        let err = link(&spans).err().unwrap();
        assert!(matches!(err, TraceTreeError::MalformedTree(_)));
    }

    #[test]
    fn self_parented_span_is_not_a_root() {
        let spans = vec![span("loop", Some("loop"), 0, 10), span("r", None, 5, 1)];
        let linked = link(&spans).unwrap();
        assert_eq!(linked.nodes[linked.root].span_id, "r");
        assert_eq!(linked.nodes[0].children, vec!["loop"]);
    }

    #[test]
    fn duplicate_span_id_keeps_last_occurrence() {
        let spans = vec![
            span("a", None, 0, 10),
            span("a", None, 0, 99),
            span("b", Some("a"), 1, 1),
        ];
        let linked = link(&spans).unwrap();
        assert_eq!(linked.nodes.len(), 2);
        assert_eq!(linked.nodes[0].duration_micros, 99);
        assert_eq!(linked.nodes[0].children, vec!["b"]);
    }
}
