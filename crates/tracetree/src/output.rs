use std::collections::{HashMap, HashSet};

use chrono::SecondsFormat;
use owo_colors::OwoColorize;
use tracetree_core::model::span::Span;
use tracetree_core::model::tree::{Node, TraceTree, TreeStatus};
use tracetree_core::query::{StatusResponse, TraceListItem};
use tracetree_core::time::{format_micros, micros_to_datetime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLine {
    pub text: String,
    pub critical: bool,
}

pub fn print_tree_human(tree: &TraceTree) {
    if tree.status != TreeStatus::Found {
        println!(
            "TRACE {} {}: {}",
            tree.trace_id,
            tree.status.as_str(),
            tree.message
        );
        return;
    }

    println!(
        "TRACE {} root={} spans={} critical_path={}",
        tree.trace_id,
        tree.root_span_id.as_deref().unwrap_or("-"),
        tree.nodes.len(),
        format_micros(tree.critical_path_micros)
    );
    for line in tree_lines(tree) {
        if line.critical {
            println!("{}", line.text.yellow().bold());
        } else {
            println!("{}", line.text);
        }
    }
}

/// Indented rendering of `tree`, one line per node. Nodes whose parent is
/// not part of the trace start their own block; nodes only reachable through
/// a cycle follow afterwards, each unvisited one opening a block.
pub fn tree_lines(tree: &TraceTree) -> Vec<TreeLine> {
    let by_id: HashMap<&str, &Node> = tree.nodes.iter().map(|n| (n.span_id.as_str(), n)).collect();
    let on_path: HashSet<&str> = tree.critical_path.iter().map(String::as_str).collect();

    let tops = tree.nodes.iter().filter(|n| {
        n.parent_span_id
            .as_deref()
            .is_none_or(|p| p == n.span_id || !by_id.contains_key(p))
    });

    let mut lines = Vec::with_capacity(tree.nodes.len());
    let mut seen: HashSet<&str> = HashSet::new();
    for top in tops.chain(tree.nodes.iter()) {
        let mut stack = vec![(top, 0usize)];
        while let Some((node, indent)) = stack.pop() {
            if !seen.insert(node.span_id.as_str()) {
                continue;
            }
            let critical = on_path.contains(node.span_id.as_str());
            lines.push(TreeLine {
                text: format!(
                    "{}{} {} {} [{}] {} self={}",
                    "  ".repeat(indent),
                    if critical { "*" } else { "-" },
                    node.service_name,
                    node.name,
                    node.kind,
                    format_micros(node.duration_micros),
                    format_micros(node.self_time_micros)
                ),
                critical,
            });
            for child in node.children.iter().rev() {
                if let Some(&child) = by_id.get(child.as_str()) {
                    stack.push((child, indent + 1));
                }
            }
        }
    }
    lines
}

pub fn print_spans_human(spans: &[Span]) {
    for span in spans {
        println!(
            "span={} parent={} service={} name=\"{}\" start={} duration={}",
            span.span_id,
            span.parent_span_id.as_deref().unwrap_or("-"),
            span.service_name,
            span.name,
            format_start(span.start_time_micros),
            format_micros(span.duration_micros)
        );
    }
    println!("-- {} spans --", spans.len());
}

pub fn print_traces_human(v: &[TraceListItem]) {
    for item in v {
        println!(
            "trace={} start={} duration={} spans={} status={} service={} root=\"{}\"",
            item.trace_id,
            format_start(item.start_time_micros),
            format_micros(item.duration_micros),
            item.span_count,
            item.status,
            item.root_service.cyan(),
            item.root_name
        );
    }
    println!("-- {} traces --", v.len());
}

pub fn print_status_human(v: &StatusResponse) {
    println!(
        "traces={} spans={} max_traces={}",
        v.trace_count, v.span_count, v.max_traces
    );
    if let Some(oldest) = v.oldest_ingest {
        println!(
            "oldest_ingest={}",
            oldest.to_rfc3339_opts(SecondsFormat::Millis, true)
        );
    }
    if let Some(newest) = v.newest_ingest {
        println!(
            "newest_ingest={}",
            newest.to_rfc3339_opts(SecondsFormat::Millis, true)
        );
    }
}

fn format_start(micros: i64) -> String {
    micros_to_datetime(micros)
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Micros, true))
        .unwrap_or_else(|| micros.to_string())
}
