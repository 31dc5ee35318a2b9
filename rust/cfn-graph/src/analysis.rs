//! The Graph Analyzer (`spec.md` §4.4): six independent passes over a built
//! [`Graph`], each contributing its findings to one [`AnalysisReport`].

use std::collections::HashSet;

use cfn_ir::Ir;
use common::indexmap::IndexMap;
use common::tracing::debug;

use crate::findings::{AnalysisReport, CascadingFailureFinding, CycleFinding, NodeFinding};
use crate::model::{EdgeKind, Graph, NodeKind, ROOT};

pub fn analyze(ir: &Ir, graph: &Graph) -> AnalysisReport {
    AnalysisReport {
        unused_parameters: unused_parameters(graph),
        unused_conditions: unused_conditions(ir, graph),
        no_sourced_outputs: no_sourced_outputs(graph),
        no_sourced_conditions: no_sourced_conditions(ir, graph),
        circular_dependencies: circular_dependencies(graph),
        cascading_provisioning_failures: cascading_provisioning_failures(graph),
    }
}

/// A parameter is unused if nothing depends on it: it has no outgoing edges.
pub fn unused_parameters(graph: &Graph) -> Vec<NodeFinding> {
    graph
        .nodes_of_kind(NodeKind::Parameter)
        .filter(|node| !graph.has_outgoing_edges(&node.name))
        .map(|node| NodeFinding {
            name: node.name.clone(),
            id: node.id.clone(),
        })
        .collect()
}

/// A condition is unused if nothing depends on it (no outgoing edges) *and*
/// it isn't a rule condition — a `Rules` entry is considered self-justifying
/// even if the graph never references it back.
pub fn unused_conditions(ir: &Ir, graph: &Graph) -> Vec<NodeFinding> {
    graph
        .nodes_of_kind(NodeKind::Condition)
        .filter(|node| !graph.has_outgoing_edges(&node.name) && !is_rule_condition(ir, &node.name))
        .map(|node| NodeFinding {
            name: node.name.clone(),
            id: node.id.clone(),
        })
        .collect()
}

fn is_rule_condition(ir: &Ir, condition_name: &str) -> bool {
    ir.conditions
        .iter()
        .any(|c| c.name == condition_name && c.ruled_para.is_some())
}

/// An output is "no sourced" if it fell back to a `root -> output` edge,
/// i.e. its `Value` referenced no resource or parameter at all.
pub fn no_sourced_outputs(graph: &Graph) -> Vec<NodeFinding> {
    graph
        .nodes_of_kind(NodeKind::Output)
        .filter(|node| has_root_incoming(graph, &node.name))
        .map(|node| NodeFinding {
            name: node.name.clone(),
            id: node.id.clone(),
        })
        .collect()
}

/// Same idea for conditions, again exempting rule conditions.
pub fn no_sourced_conditions(ir: &Ir, graph: &Graph) -> Vec<NodeFinding> {
    graph
        .nodes_of_kind(NodeKind::Condition)
        .filter(|node| has_root_incoming(graph, &node.name) && !is_rule_condition(ir, &node.name))
        .map(|node| NodeFinding {
            name: node.name.clone(),
            id: node.id.clone(),
        })
        .collect()
}

fn has_root_incoming(graph: &Graph, name: &str) -> bool {
    graph.incoming_names(name).into_iter().any(|from| from == ROOT)
}

/// DFS-based cycle detection with a recursion-stack. Cycles are
/// deduplicated by rotating to start at the lexicographically smallest
/// node; node iteration order (rather than Python's unordered `set`) is the
/// graph's own insertion order, so results are reproducible across runs.
pub fn circular_dependencies(graph: &Graph) -> Vec<CycleFinding> {
    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut raw_cycles: Vec<Vec<String>> = Vec::new();

    for node in &graph.nodes {
        if !visited.contains(&node.name) {
            dfs_cycle_detection(graph, &node.name, Vec::new(), &mut visited, &mut rec_stack, &mut raw_cycles);
        }
    }

    let mut seen = HashSet::new();
    let mut unique_cycles = Vec::new();
    for cycle in raw_cycles {
        let key = normalize_cycle(&cycle);
        if seen.insert(key) {
            unique_cycles.push(cycle);
        }
    }

    unique_cycles
        .into_iter()
        .map(|cycle| {
            let cycle_type = cycle_type(graph, &cycle);
            let mut nodes_involved: Vec<String> = cycle[..cycle.len() - 1].to_vec();
            nodes_involved.sort();
            nodes_involved.dedup();
            CycleFinding {
                cycle_length: cycle.len() - 1,
                cycle_type,
                nodes_involved,
                cycle,
            }
        })
        .collect()
}

fn dfs_cycle_detection(
    graph: &Graph,
    node: &str,
    mut path: Vec<String>,
    visited: &mut HashSet<String>,
    rec_stack: &mut HashSet<String>,
    cycles: &mut Vec<Vec<String>>,
) {
    if rec_stack.contains(node) {
        let start = path.iter().position(|n| n == node).expect("node is on the recursion stack");
        let mut cycle = path[start..].to_vec();
        cycle.push(node.to_string());
        cycles.push(cycle);
        return;
    }
    if visited.contains(node) {
        return;
    }

    visited.insert(node.to_string());
    rec_stack.insert(node.to_string());
    path.push(node.to_string());

    for next in graph.outgoing_names(node) {
        dfs_cycle_detection(graph, next, path.clone(), visited, rec_stack, cycles);
    }

    rec_stack.remove(node);
}

fn normalize_cycle(cycle: &[String]) -> Vec<String> {
    let min_index = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, name)| name.as_str())
        .map(|(index, _)| index)
        .unwrap_or(0);
    let mut rotated = cycle[min_index..].to_vec();
    rotated.extend_from_slice(&cycle[..min_index]);
    rotated
}

fn cycle_type(graph: &Graph, cycle: &[String]) -> String {
    let mut kinds: Vec<&'static str> = cycle[..cycle.len() - 1]
        .iter()
        .filter_map(|name| graph.node_by_name(name))
        .map(kind_label)
        .collect();
    kinds.sort();
    kinds.dedup();

    match kinds.as_slice() {
        [single] => format!("pure_{single}_cycle"),
        _ => format!("mixed_cycle_{}", kinds.join("_")),
    }
}

fn kind_label(node: &crate::model::Node) -> &'static str {
    match node.kind {
        NodeKind::Root => "root",
        NodeKind::Parameter => "parameter",
        NodeKind::Condition => "condition",
        NodeKind::Resource => "resource",
        NodeKind::Output => "output",
    }
}

/// For every condition that gates a resource's existence, walk each gated
/// resource's dependents; anything reachable that isn't itself protected by
/// the same condition (at either the resource or property level) is a
/// cascading provisioning failure.
pub fn cascading_provisioning_failures(graph: &Graph) -> Vec<CascadingFailureFinding> {
    let (gated_resources, gated_properties) = condition_edges(graph);
    let mut failures = Vec::new();

    for (condition_name, resources) in gated_resources.iter() {
        for gated_resource in resources {
            for child in immediate_children(graph, gated_resource) {
                let mut visited = HashSet::new();
                check_cascading_failure(
                    graph,
                    &child,
                    condition_name,
                    gated_resource,
                    &mut visited,
                    &gated_resources,
                    &gated_properties,
                    &mut failures,
                );
            }
        }
    }

    debug!(count = failures.len(), "cascading provisioning failure analysis complete");
    failures
}

fn condition_edges(graph: &Graph) -> (IndexMap<String, Vec<String>>, IndexMap<String, Vec<String>>) {
    let mut gated_resources: IndexMap<String, Vec<String>> = IndexMap::new();
    let mut gated_properties: IndexMap<String, Vec<String>> = IndexMap::new();

    for edge in &graph.edges {
        match edge.edge_type {
            EdgeKind::ConditionExistence => {
                gated_resources.entry(edge.from.clone()).or_default().push(edge.to.clone());
            }
            EdgeKind::ConditionProperty => {
                gated_properties.entry(edge.from.clone()).or_default().push(edge.to.clone());
            }
            EdgeKind::Default => {}
        }
    }

    (gated_resources, gated_properties)
}

/// Direct dependents of `name` (edges `name -> child`), excluding self-loops.
/// Every edge kind counts — a `condition-property` edge still represents a
/// real dependency for this walk.
fn immediate_children(graph: &Graph, name: &str) -> Vec<String> {
    graph
        .edges
        .iter()
        .filter(|edge| edge.from == name && edge.to != name)
        .map(|edge| edge.to.clone())
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn check_cascading_failure(
    graph: &Graph,
    node_name: &str,
    condition_name: &str,
    gated_resource_name: &str,
    visited: &mut HashSet<String>,
    gated_resources: &IndexMap<String, Vec<String>>,
    gated_properties: &IndexMap<String, Vec<String>>,
    failures: &mut Vec<CascadingFailureFinding>,
) {
    if visited.contains(node_name) {
        return;
    }
    visited.insert(node_name.to_string());

    if gated_resources
        .get(condition_name)
        .is_some_and(|names| names.iter().any(|n| n == node_name))
    {
        return;
    }
    if gated_properties
        .get(condition_name)
        .is_some_and(|names| names.iter().any(|n| n == node_name))
    {
        return;
    }

    failures.push(CascadingFailureFinding {
        gated_resource: gated_resource_name.to_string(),
        dependent_resource: node_name.to_string(),
        condition: condition_name.to_string(),
    });

    for child in immediate_children(graph, node_name) {
        check_cascading_failure(
            graph,
            &child,
            condition_name,
            gated_resource_name,
            visited,
            gated_resources,
            gated_properties,
            failures,
        );
    }
}
