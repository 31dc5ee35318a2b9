//! The intermediate representation (`spec.md` §3).
//!
//! Every entity here is flat and self-contained: cross-references between
//! entities are stored as ids (strings) rather than as borrowed pointers, so
//! the IR can be serialized, diffed, or handed to the graph builder without
//! lifetime gymnastics. Names that double as condition/output namespaces are
//! `Cond.`/`Out.`-prefixed at construction time and never re-derived later.

use common::indexmap::IndexMap;
use common::serde::Serialize;
use common::serde_yaml::Value;

/// The complete, flattened view of one CloudFormation document.
#[derive(Debug, Clone, Serialize)]
pub struct Ir {
    pub metadata: Metadata,
    pub parameters: Vec<Parameter>,
    pub conditions: Vec<Condition>,
    pub resources: Vec<Resource>,
    pub outputs: Vec<Output>,
}

/// Template-level bookkeeping, independent of any one section.
#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    /// Generated fresh for every build; not derived from document content.
    pub template_id: String,
    /// `AWS` normally; `AWS::Transform` bumps it to `"AWS_<value>"` when
    /// present, matching how the source implementation tags SAM templates.
    pub cloud_service_provider: String,
    pub description: Option<String>,
    /// Everything under the `Metadata` section not recognized as a
    /// presentation-only key (`AWS::CloudFormation::Interface`/`Designer`).
    pub additional_info: IndexMap<String, Value>,
}

/// A top-level `Parameters` entry.
#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub type_: ParameterType,
    pub default: Option<ParameterDefault>,
    pub constraints: Option<ParameterConstraints>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ParameterType {
    String,
    Number,
    CommaDelimitedList,
    /// Synthesized for every `AWS::*` pseudo-parameter the reference
    /// extractor surfaces; never appears in a `Parameters` section literally.
    PseudoParameter,
    /// Synthesized for the implicit "parameter" a `Fn::FindInMap` map name
    /// resolves to, so mapping names share the graph's node space.
    Mapping,
    Other(String),
}

impl From<&str> for ParameterType {
    fn from(raw: &str) -> Self {
        match raw {
            "String" => ParameterType::String,
            "Number" => ParameterType::Number,
            "CommaDelimitedList" => ParameterType::CommaDelimitedList,
            other => ParameterType::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ParameterDefault {
    Scalar(Value),
    List(Vec<String>),
}

/// Collapses the six independent `Allowed*`/`Min*`/`Max*` constraint keys;
/// `None` overall when the parameter declares none of them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParameterConstraints {
    pub allowed_values: Option<Value>,
    pub allowed_pattern: Option<String>,
    pub min_value: Option<Value>,
    pub max_value: Option<Value>,
    pub min_length: Option<Value>,
    pub max_length: Option<Value>,
}

impl ParameterConstraints {
    pub fn is_empty(&self) -> bool {
        self.allowed_values.is_none()
            && self.allowed_pattern.is_none()
            && self.min_value.is_none()
            && self.max_value.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
    }
}

/// A top-level `Conditions` entry, or a condition synthesized from a `Rules`
/// assertion.
#[derive(Debug, Clone, Serialize)]
pub struct Condition {
    pub id: String,
    /// Always `Cond.`-prefixed.
    pub name: String,
    pub body: Value,
    /// Parameter ids a `Rules` assertion validates. `None` both when this
    /// condition did not originate from a `Rules` entry *and* when it did
    /// but its assertions reference no parameters — the builder collapses
    /// the empty case the same way ordinary conditions collapse their
    /// "NA" fields, so a parameter-free rule is graph-indistinguishable
    /// from a plain condition (`spec.md` §4.4.2/§9 analyses key off this).
    pub ruled_para: Option<Vec<String>>,
    /// One entry per `Assertions` item, present only for rule-derived
    /// conditions.
    pub constraint: Option<Vec<Value>>,
    /// Parallel to `constraint`: each assertion's `AssertDescription`, if any.
    pub description: Option<Vec<String>>,
    /// Parameter ids this condition's body references.
    pub depend_para: Vec<String>,
    /// Other condition ids this condition's body references (via `Condition`
    /// keys inside `Fn::And`/`Fn::Or`/`Fn::Not`).
    pub depend_cond: Vec<String>,
}

/// A top-level `Resources` entry that survived CloudFormation-resource
/// filtering.
#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub arguments: ResourceArguments,
    /// Empty when the resource declares no `Properties`.
    pub properties: Vec<PropertyUnit>,
}

/// The recognized non-`Type`/`Properties` top-level resource attributes.
/// `condition` stores the condition *name* (`Cond.`-prefixed), not its id —
/// the graph builder creates edges by name and resolves ids itself.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceArguments {
    pub condition: Option<String>,
    pub depends_on: Option<DependsOn>,
    pub creation_policy: Option<Value>,
    pub update_policy: Option<Value>,
    pub deletion_policy: Option<Value>,
    pub update_replace_policy: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DependsOn {
    Single(String),
    Many(Vec<String>),
}

impl DependsOn {
    pub fn names(&self) -> Vec<&str> {
        match self {
            DependsOn::Single(name) => vec![name.as_str()],
            DependsOn::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// One property of one resource, with its own independently-tracked
/// reference set.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyUnit {
    pub name: String,
    pub value: Value,
    pub resource_refs: Vec<String>,
    pub parameter_refs: Vec<String>,
    pub depend_conditions: Vec<String>,
}

/// A top-level `Outputs` entry.
#[derive(Debug, Clone, Serialize)]
pub struct Output {
    pub id: String,
    /// Always `Out.`-prefixed.
    pub name: String,
    pub description: Option<String>,
    pub value: OutputValue,
    pub source_resource: Vec<String>,
    pub source_parameter: Vec<String>,
    pub export_name: Option<ExportName>,
    /// From the output's own `Condition` attribute, if present.
    pub depend_conditions: Vec<String>,
}

/// The output's `Value` field, tracked separately from `source_resource`/
/// `source_parameter` so a consumer can tell an `Fn::If`-gated value apart
/// from an unconditional one.
#[derive(Debug, Clone, Serialize)]
pub struct OutputValue {
    pub value: Value,
    pub depend_conditions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportName {
    /// The raw `Export.Name` field; not necessarily a plain string; may
    /// itself be an `Fn::Sub`/`Fn::If` expression.
    pub name: Option<Value>,
    pub depend_para: Vec<String>,
    pub depend_resource: Vec<String>,
    pub depend_conditions: Vec<String>,
}
