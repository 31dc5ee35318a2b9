//! The Dependency Graph Builder (`spec.md` §4.3).
//!
//! Builds nodes for every IR entity plus a synthetic `root`, then wires
//! edges in IR section order: conditions, then resources, then outputs.
//! Edges always point from the thing depended upon to the thing that
//! depends on it (`param -> resource` when a resource references a
//! parameter), so "does this node have outgoing edges" doubles as "is this
//! node used by anything".
//!
//! A node that ends up with no incoming structural edge at all falls back
//! to a `root -> node` edge. A rule condition's `ruled_para` is handled
//! specially: each ruled parameter's pre-existing `root -> param` edge is
//! *rewritten* in place so its source becomes the condition, rather than
//! adding a second edge alongside it — a parameter can only ever have been
//! pointed at by `root` at this stage (it is the very first edge the
//! builder creates for every parameter), so "first found" is also "only
//! found". A resource's `DependsOn`/`Condition` edges are independent of
//! whether its properties generated any edges, which can leave a resource
//! with *both* a real edge and a `root` edge; that is reachable in the
//! source this was distilled from and is reproduced here rather than
//! silently tightened.

use std::collections::HashMap;

use cfn_ir::{Ir, ResourceArguments};

use crate::model::{Edge, EdgeKind, Graph, Node, NodeKind, ROOT};

pub fn build(ir: &Ir) -> Graph {
    let mut nodes = Vec::new();
    let mut id_to_name: HashMap<&str, &str> = HashMap::new();

    nodes.push(Node {
        id: ROOT.to_string(),
        name: ROOT.to_string(),
        kind: NodeKind::Root,
    });

    for parameter in &ir.parameters {
        id_to_name.insert(&parameter.id, &parameter.name);
        nodes.push(Node {
            id: parameter.id.clone(),
            name: parameter.name.clone(),
            kind: NodeKind::Parameter,
        });
    }
    for condition in &ir.conditions {
        id_to_name.insert(&condition.id, &condition.name);
        nodes.push(Node {
            id: condition.id.clone(),
            name: condition.name.clone(),
            kind: NodeKind::Condition,
        });
    }
    for resource in &ir.resources {
        id_to_name.insert(&resource.id, &resource.name);
        nodes.push(Node {
            id: resource.id.clone(),
            name: resource.name.clone(),
            kind: NodeKind::Resource,
        });
    }
    for output in &ir.outputs {
        id_to_name.insert(&output.id, &output.name);
        nodes.push(Node {
            id: output.id.clone(),
            name: output.name.clone(),
            kind: NodeKind::Output,
        });
    }

    let mut edges = Vec::new();

    for parameter in &ir.parameters {
        edges.push(Edge {
            from: ROOT.to_string(),
            to: parameter.name.clone(),
            edge_type: EdgeKind::Default,
        });
    }

    for condition in &ir.conditions {
        if let Some(ruled_para) = &condition.ruled_para {
            for id in ruled_para {
                if let Some(&name) = id_to_name.get(id.as_str()) {
                    rewrite_root_edge(&mut edges, name, &condition.name);
                }
            }
        }
        let mut generated = false;
        generated |= push_edges(
            &mut edges,
            &id_to_name,
            &condition.depend_para,
            &condition.name,
            EdgeKind::Default,
        );
        generated |= push_edges(
            &mut edges,
            &id_to_name,
            &condition.depend_cond,
            &condition.name,
            EdgeKind::Default,
        );
        if !generated {
            edges.push(Edge {
                from: ROOT.to_string(),
                to: condition.name.clone(),
                edge_type: EdgeKind::Default,
            });
        }
    }

    for resource in &ir.resources {
        handle_resource_arguments(&mut edges, &resource.arguments, &resource.name);

        let mut generated = false;
        for property in &resource.properties {
            generated |= push_edges(
                &mut edges,
                &id_to_name,
                &property.parameter_refs,
                &resource.name,
                EdgeKind::Default,
            );
            generated |= push_edges(
                &mut edges,
                &id_to_name,
                &property.resource_refs,
                &resource.name,
                EdgeKind::Default,
            );
            generated |= push_edges(
                &mut edges,
                &id_to_name,
                &property.depend_conditions,
                &resource.name,
                EdgeKind::ConditionProperty,
            );
        }
        if !generated {
            edges.push(Edge {
                from: ROOT.to_string(),
                to: resource.name.clone(),
                edge_type: EdgeKind::Default,
            });
        }
    }

    for output in &ir.outputs {
        let mut generated = false;
        generated |= push_edges(
            &mut edges,
            &id_to_name,
            &output.source_resource,
            &output.name,
            EdgeKind::Default,
        );
        generated |= push_edges(
            &mut edges,
            &id_to_name,
            &output.source_parameter,
            &output.name,
            EdgeKind::Default,
        );
        if !generated {
            edges.push(Edge {
                from: ROOT.to_string(),
                to: output.name.clone(),
                edge_type: EdgeKind::Default,
            });
        }

        push_edges(
            &mut edges,
            &id_to_name,
            &output.depend_conditions,
            &output.name,
            EdgeKind::ConditionExistence,
        );
        push_edges(
            &mut edges,
            &id_to_name,
            &output.value.depend_conditions,
            &output.name,
            EdgeKind::ConditionProperty,
        );

        // `export_name.depend_conditions` is deliberately not wired into any
        // edge: the source implementation extracts it but never consumes it
        // when building the graph.
        if let Some(export) = &output.export_name {
            push_edges(&mut edges, &id_to_name, &export.depend_para, &output.name, EdgeKind::Default);
            push_edges(
                &mut edges,
                &id_to_name,
                &export.depend_resource,
                &output.name,
                EdgeKind::Default,
            );
        }
    }

    Graph::new(nodes, edges)
}

/// Find the first `root -> param_name` edge and repoint its source at
/// `condition_name`, so the parameter ends up with a `condition -> param`
/// edge instead of the `root -> param` edge every parameter starts with.
fn rewrite_root_edge(edges: &mut [Edge], param_name: &str, condition_name: &str) {
    if let Some(edge) = edges
        .iter_mut()
        .find(|e| e.from == ROOT && e.to == param_name && e.edge_type == EdgeKind::Default)
    {
        edge.from = condition_name.to_string();
    }
}

fn handle_resource_arguments(edges: &mut Vec<Edge>, arguments: &ResourceArguments, resource_name: &str) {
    if let Some(depends_on) = &arguments.depends_on {
        for name in depends_on.names() {
            edges.push(Edge {
                from: name.to_string(),
                to: resource_name.to_string(),
                edge_type: EdgeKind::Default,
            });
        }
    }
    if let Some(condition_name) = &arguments.condition {
        edges.push(Edge {
            from: condition_name.clone(),
            to: resource_name.to_string(),
            edge_type: EdgeKind::ConditionExistence,
        });
    }
}

/// Resolve each id in `ids` to its node name and push an edge `name -> to`.
/// Ids with no known name (shouldn't happen for a well-formed IR, but the
/// builder never panics on one) are silently skipped. Returns whether any
/// edge was generated.
fn push_edges(
    edges: &mut Vec<Edge>,
    id_to_name: &HashMap<&str, &str>,
    ids: &[String],
    to: &str,
    edge_type: EdgeKind,
) -> bool {
    let mut generated = false;
    for id in ids {
        if let Some(&name) = id_to_name.get(id.as_str()) {
            edges.push(Edge {
                from: name.to_string(),
                to: to.to_string(),
                edge_type,
            });
            generated = true;
        }
    }
    generated
}
