use crate::model::tree::Node;

/// Sets `self_time_micros` on every node: its duration minus the merged,
/// parent-clipped windows of its direct children. Grandchildren are only
/// accounted for through their parent's window.
pub(crate) fn annotate_self_times(nodes: &mut [Node], children: &[Vec<usize>]) {
    let self_times: Vec<u64> = nodes
        .iter()
        .zip(children)
        .map(|(node, kids)| {
            let covered = covered_micros(node, kids.iter().map(|&k| &nodes[k]));
            node.duration_micros.saturating_sub(covered)
        })
        .collect();

    for (node, self_time) in nodes.iter_mut().zip(self_times) {
        node.self_time_micros = self_time;
    }
}

fn covered_micros<'a>(parent: &Node, children: impl Iterator<Item = &'a Node>) -> u64 {
    let mut intervals: Vec<(i64, i64)> = children
        .filter_map(|child| {
            let start = parent.start_time_micros.max(child.start_time_micros);
            let end = parent.end_time_micros.min(child.end_time_micros);
            (end > start).then_some((start, end))
        })
        .collect();
    intervals.sort_unstable();

    let mut covered = 0u64;
    let mut current: Option<(i64, i64)> = None;
    for (start, end) in intervals {
        current = match current {
            Some((cur_start, cur_end)) if start <= cur_end => Some((cur_start, cur_end.max(end))),
            Some((cur_start, cur_end)) => {
                covered = covered.saturating_add(cur_end.abs_diff(cur_start));
                Some((start, end))
            }
            None => Some((start, end)),
        };
    }
    if let Some((cur_start, cur_end)) = current {
        covered = covered.saturating_add(cur_end.abs_diff(cur_start));
    }
    covered
}
