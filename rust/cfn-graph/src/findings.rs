//! Output records for the Graph Analyzer (`spec.md` §6).
//!
//! Each analysis only contributes a key to the overall report when it finds
//! something — matching the "no top-level warning for the healthy case"
//! shape of the system this was distilled from — but within this crate the
//! fields stay plain `Vec`s rather than `Option<Vec<_>>` for ergonomic
//! access; `serde` collapses the empty ones away at the edge.

use common::serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeFinding {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleFinding {
    pub cycle: Vec<String>,
    pub cycle_length: usize,
    pub cycle_type: String,
    pub nodes_involved: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadingFailureFinding {
    pub gated_resource: String,
    pub dependent_resource: String,
    pub condition: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisReport {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unused_parameters: Vec<NodeFinding>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unused_conditions: Vec<NodeFinding>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub no_sourced_outputs: Vec<NodeFinding>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub no_sourced_conditions: Vec<NodeFinding>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub circular_dependencies: Vec<CycleFinding>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cascading_provisioning_failures: Vec<CascadingFailureFinding>,
}

impl AnalysisReport {
    pub fn is_clean(&self) -> bool {
        self.unused_parameters.is_empty()
            && self.unused_conditions.is_empty()
            && self.no_sourced_outputs.is_empty()
            && self.no_sourced_conditions.is_empty()
            && self.circular_dependencies.is_empty()
            && self.cascading_provisioning_failures.is_empty()
    }
}
