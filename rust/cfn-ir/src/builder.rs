//! The IR Builder (`spec.md` §4.2): turns a normalized document tree into
//! an [`Ir`](crate::ir::Ir).
//!
//! Ids are assigned to conditions and resources in two passes: first every
//! name in the section gets an id, then each entry's body is walked. This
//! lets a condition or resource reference another one defined later in the
//! same section — CloudFormation templates don't require declaration order,
//! and neither does this builder.

use std::collections::HashSet;

use common::eyre::{bail, Result};
use common::indexmap::IndexMap;
use common::serde_yaml::Value;
use common::tracing::debug;
use common::uuid::Uuid;

use crate::config::{self, AWS_PSEUDO_PARAMETERS, CONDITION_PREFIX, OUTPUT_PREFIX};
use crate::error::Error;
use crate::ir::{
    Condition, DependsOn, ExportName, Ir, Metadata, Output, OutputValue, Parameter,
    ParameterConstraints, ParameterDefault, ParameterType, PropertyUnit, Resource,
    ResourceArguments,
};
use crate::refs::{
    extract_condition_name_refs, extract_if_condition_refs, extract_refs,
    scan_pseudo_parameter_names,
};

/// Build an [`Ir`] from a normalized CloudFormation document tree.
///
/// `document` is expected to already have every short intrinsic tag (`!Ref`,
/// `!Sub`, ...) reified into its `Fn::`-free single-key mapping form; this
/// builder does not perform YAML tag resolution itself.
pub fn build(document: &Value) -> Result<Ir> {
    let Some(root) = document.as_mapping() else {
        bail!(Error::MalformedDocument {
            reason: "top-level document is not a mapping".to_string(),
        });
    };

    let mut builder = IrBuilder::default();

    if let Some(metadata) = root.get(&Value::from("Metadata")) {
        builder.collect_metadata(metadata);
    }
    if let Some(description) = root.get(&Value::from("Description")).and_then(Value::as_str) {
        builder.description = Some(description.to_string());
    }
    if let Some(transform) = root.get(&Value::from("Transform")) {
        builder.apply_transform(transform);
    }

    if let Some(parameters) = root.get(&Value::from("Parameters")).and_then(Value::as_mapping) {
        builder.assign_parameter_ids(parameters);
        builder.extract_parameters(parameters);
    }
    builder.extract_pseudo_parameters(&pseudo_parameter_scan_scopes(root));
    builder.extract_mapping_parameters(root.get(&Value::from("Mappings")));

    let conditions_section = root.get(&Value::from("Conditions")).and_then(Value::as_mapping);
    let rules_section = root.get(&Value::from("Rules")).and_then(Value::as_mapping);

    if let Some(conditions) = conditions_section {
        builder.assign_condition_ids(conditions);
    }
    if let Some(rules) = rules_section {
        builder.assign_rule_condition_ids(rules);
    }
    if let Some(rules) = rules_section {
        builder.extract_rules(rules);
    }
    if let Some(conditions) = conditions_section {
        builder.extract_conditions(conditions);
    }

    if let Some(resources) = root.get(&Value::from("Resources")).and_then(Value::as_mapping) {
        builder.assign_resource_ids(resources);
        builder.extract_resources(resources);
    }

    if let Some(outputs) = root.get(&Value::from("Outputs")).and_then(Value::as_mapping) {
        builder.extract_outputs(outputs);
    }

    Ok(builder.finish())
}

#[derive(Default)]
struct IrBuilder {
    description: Option<String>,
    additional_info: IndexMap<String, Value>,
    cloud_service_provider: Option<String>,

    parameter_name_to_id: IndexMap<String, String>,
    condition_name_to_id: IndexMap<String, String>,
    resource_name_to_id: IndexMap<String, String>,

    parameters: Vec<Parameter>,
    conditions: Vec<Condition>,
    resources: Vec<Resource>,
    outputs: Vec<Output>,
}

impl IrBuilder {
    fn next_id(prefix: &str) -> String {
        format!("{prefix}{}", Uuid::new_v4())
    }

    fn collect_metadata(&mut self, metadata: &Value) {
        let Some(map) = metadata.as_mapping() else {
            return;
        };
        for (key, value) in map.iter() {
            let Some(key) = key.as_str() else { continue };
            if config::KNOWN_PRESENTATION_METADATA_KEYS.contains(&key) {
                continue;
            }
            self.additional_info.insert(key.to_string(), value.clone());
        }
    }

    fn apply_transform(&mut self, transform: &Value) {
        let value = match transform {
            Value::String(s) => Some(s.clone()),
            Value::Sequence(seq) => seq.first().and_then(Value::as_str).map(str::to_string),
            _ => None,
        };
        if let Some(value) = value {
            self.cloud_service_provider = Some(format!("AWS_{value}"));
        }
    }

    // -- Parameters ----------------------------------------------------

    fn assign_parameter_ids(&mut self, parameters: &common::serde_yaml::Mapping) {
        for (name, _) in parameters.iter() {
            let Some(name) = name.as_str() else { continue };
            self.parameter_name_to_id
                .entry(name.to_string())
                .or_insert_with(|| Self::next_id("param-"));
        }
    }

    fn extract_parameters(&mut self, parameters: &common::serde_yaml::Mapping) {
        for (name, body) in parameters.iter() {
            let Some(name) = name.as_str() else { continue };
            let Some(id) = self.parameter_name_to_id.get(name).cloned() else {
                continue;
            };
            let Some(body) = body.as_mapping() else {
                debug!(parameter = name, "skipping parameter with non-mapping body");
                continue;
            };

            let type_ = body
                .get(&Value::from("Type"))
                .and_then(Value::as_str)
                .map(ParameterType::from)
                .unwrap_or(ParameterType::Other(String::new()));

            let default = body.get(&Value::from("Default")).map(|value| {
                if type_ == ParameterType::CommaDelimitedList {
                    if let Some(raw) = value.as_str() {
                        return ParameterDefault::List(
                            raw.split(',').map(|s| s.trim().to_string()).collect(),
                        );
                    }
                }
                ParameterDefault::Scalar(value.clone())
            });

            let constraints = self.extract_constraints(body);
            let description = body
                .get(&Value::from("Description"))
                .and_then(Value::as_str)
                .map(str::to_string);

            self.parameters.push(Parameter {
                id,
                name: name.to_string(),
                type_,
                default,
                constraints,
                description,
            });
        }
    }

    fn extract_constraints(
        &self,
        body: &common::serde_yaml::Mapping,
    ) -> Option<ParameterConstraints> {
        let mut constraints = ParameterConstraints::default();
        constraints.allowed_values = body.get(&Value::from("AllowedValues")).cloned();
        constraints.allowed_pattern = body
            .get(&Value::from("AllowedPattern"))
            .and_then(Value::as_str)
            .map(str::to_string);
        constraints.min_value = body.get(&Value::from("MinValue")).cloned();
        constraints.max_value = body.get(&Value::from("MaxValue")).cloned();
        constraints.min_length = body.get(&Value::from("MinLength")).cloned();
        constraints.max_length = body.get(&Value::from("MaxLength")).cloned();

        if constraints.is_empty() {
            None
        } else {
            Some(constraints)
        }
    }

    fn extract_pseudo_parameters(&mut self, scopes: &[&Value]) {
        for scope in scopes {
            for name in scan_pseudo_parameter_names(scope) {
                if !AWS_PSEUDO_PARAMETERS.contains(&name.as_str()) {
                    continue;
                }
                if self.parameter_name_to_id.contains_key(&name) {
                    continue;
                }
                let id = Self::next_id("param-");
                self.parameter_name_to_id.insert(name.clone(), id.clone());
                self.parameters.push(Parameter {
                    id,
                    name,
                    type_: ParameterType::PseudoParameter,
                    default: None,
                    constraints: None,
                    description: None,
                });
            }
        }
    }

    fn extract_mapping_parameters(&mut self, mappings: Option<&Value>) {
        let Some(map) = mappings.and_then(Value::as_mapping) else {
            return;
        };
        for (name, _) in map.iter() {
            let Some(name) = name.as_str() else { continue };
            if self.parameter_name_to_id.contains_key(name) {
                continue;
            }
            let id = Self::next_id("param-");
            self.parameter_name_to_id.insert(name.to_string(), id.clone());
            self.parameters.push(Parameter {
                id,
                name: name.to_string(),
                type_: ParameterType::Mapping,
                default: None,
                constraints: None,
                description: None,
            });
        }
    }

    // -- Conditions & Rules ----------------------------------------------

    fn assign_condition_ids(&mut self, conditions: &common::serde_yaml::Mapping) {
        for (name, _) in conditions.iter() {
            let Some(name) = name.as_str() else { continue };
            let namespaced = format!("{CONDITION_PREFIX}{name}");
            self.condition_name_to_id
                .entry(namespaced)
                .or_insert_with(|| Self::next_id("cond-"));
        }
    }

    fn assign_rule_condition_ids(&mut self, rules: &common::serde_yaml::Mapping) {
        for (name, _) in rules.iter() {
            let Some(name) = name.as_str() else { continue };
            let namespaced = format!("{CONDITION_PREFIX}{name}");
            self.condition_name_to_id
                .entry(namespaced)
                .or_insert_with(|| Self::next_id("cond-"));
        }
    }

    fn extract_conditions(&mut self, conditions: &common::serde_yaml::Mapping) {
        for (name, body) in conditions.iter() {
            let Some(name) = name.as_str() else { continue };
            let namespaced = format!("{CONDITION_PREFIX}{name}");
            let Some(id) = self.condition_name_to_id.get(&namespaced).cloned() else {
                continue;
            };

            let depend_para = self.resolve_parameter_refs(extract_refs(body));
            let depend_cond = self.resolve_condition_refs(extract_condition_name_refs(body));

            self.conditions.push(Condition {
                id,
                name: namespaced,
                body: body.clone(),
                ruled_para: None,
                constraint: None,
                description: None,
                depend_para,
                depend_cond,
            });
        }
    }

    /// `Rules` entries become conditions. Unlike ordinary conditions,
    /// `ruled_para` is drawn from each assertion's `Assert` value (the
    /// parameters the rule validates) rather than from the rule's own body,
    /// and `depend_para` is drawn from `RuleCondition` (only when it's
    /// itself an intrinsic-function mapping — the common case, a bare
    /// `true`, contributes nothing). A rule never contributes `depend_cond`.
    fn extract_rules(&mut self, rules: &common::serde_yaml::Mapping) {
        for (name, body) in rules.iter() {
            let Some(name) = name.as_str() else { continue };
            let namespaced = format!("{CONDITION_PREFIX}{name}");
            let Some(id) = self.condition_name_to_id.get(&namespaced).cloned() else {
                continue;
            };
            let Some(body_map) = body.as_mapping() else {
                continue;
            };

            let rule_condition = body_map
                .get(&Value::from("RuleCondition"))
                .cloned()
                .unwrap_or(Value::Bool(true));

            let depend_para = if matches!(rule_condition, Value::Mapping(_)) {
                self.resolve_parameter_refs(extract_refs(&rule_condition))
            } else {
                Vec::new()
            };

            let mut ruled_para = Vec::new();
            let mut constraints = Vec::new();
            let mut descriptions = Vec::new();

            if let Some(Value::Sequence(assertions)) = body_map.get(&Value::from("Assertions")) {
                for assertion in assertions {
                    let Some(assertion_map) = assertion.as_mapping() else {
                        continue;
                    };
                    let assert_value = assertion_map.get(&Value::from("Assert")).cloned();
                    if let Some(Value::Mapping(_)) = &assert_value {
                        ruled_para.extend(
                            self.resolve_parameter_refs(extract_refs(assert_value.as_ref().unwrap())),
                        );
                    }
                    constraints.push(assert_value.unwrap_or(Value::Null));
                    let description = assertion_map
                        .get(&Value::from("AssertDescription"))
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_string();
                    descriptions.push(description);
                }
            }

            ruled_para.sort();
            ruled_para.dedup();

            self.conditions.push(Condition {
                id,
                name: namespaced,
                body: rule_condition,
                ruled_para: if ruled_para.is_empty() { None } else { Some(ruled_para) },
                constraint: if constraints.is_empty() { None } else { Some(constraints) },
                description: if descriptions.is_empty() { None } else { Some(descriptions) },
                depend_para,
                depend_cond: Vec::new(),
            });
        }
    }

    // -- Resources --------------------------------------------------------

    fn assign_resource_ids(&mut self, resources: &common::serde_yaml::Mapping) {
        for (name, body) in resources.iter() {
            let Some(name) = name.as_str() else { continue };
            if !is_cfn_resource(body) {
                continue;
            }
            self.resource_name_to_id
                .entry(name.to_string())
                .or_insert_with(|| Self::next_id("res-"));
        }
    }

    fn extract_resources(&mut self, resources: &common::serde_yaml::Mapping) {
        for (name, body) in resources.iter() {
            let Some(name) = name.as_str() else { continue };
            let Some(id) = self.resource_name_to_id.get(name).cloned() else {
                continue;
            };
            let Some(body) = body.as_mapping() else {
                continue;
            };

            let type_ = body
                .get(&Value::from("Type"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            let arguments = self.extract_resource_arguments(body);

            let properties = body
                .get(&Value::from("Properties"))
                .and_then(Value::as_mapping)
                .map(|properties| self.extract_resource_properties(properties))
                .unwrap_or_default();

            self.resources.push(Resource {
                id,
                name: name.to_string(),
                type_,
                arguments,
                properties,
            });
        }
    }

    fn extract_resource_arguments(
        &self,
        body: &common::serde_yaml::Mapping,
    ) -> ResourceArguments {
        let mut arguments = ResourceArguments::default();

        if let Some(name) = body.get(&Value::from("Condition")).and_then(Value::as_str) {
            arguments.condition = Some(format!("{CONDITION_PREFIX}{name}"));
        }
        if let Some(depends_on) = body.get(&Value::from("DependsOn")) {
            arguments.depends_on = match depends_on {
                Value::String(name) => Some(DependsOn::Single(name.clone())),
                Value::Sequence(seq) => Some(DependsOn::Many(
                    seq.iter().filter_map(Value::as_str).map(str::to_string).collect(),
                )),
                _ => None,
            };
        }
        arguments.creation_policy = body.get(&Value::from("CreationPolicy")).cloned();
        arguments.update_policy = body.get(&Value::from("UpdatePolicy")).cloned();
        arguments.deletion_policy = body.get(&Value::from("DeletionPolicy")).cloned();
        arguments.update_replace_policy = body.get(&Value::from("UpdateReplacePolicy")).cloned();

        arguments
    }

    fn extract_resource_properties(
        &self,
        properties: &common::serde_yaml::Mapping,
    ) -> Vec<PropertyUnit> {
        let mut units = Vec::new();
        for (name, value) in properties.iter() {
            let Some(name) = name.as_str() else { continue };

            let raw_refs = extract_refs(value);
            let resource_refs = self.resolve_resource_refs(raw_refs.clone());
            let parameter_refs = self.resolve_parameter_refs(raw_refs);
            let depend_conditions = self.resolve_condition_refs(extract_if_condition_refs(value));

            units.push(PropertyUnit {
                name: name.to_string(),
                value: value.clone(),
                resource_refs,
                parameter_refs,
                depend_conditions,
            });
        }
        units
    }

    // -- Outputs ------------------------------------------------------------

    fn extract_outputs(&mut self, outputs: &common::serde_yaml::Mapping) {
        for (name, body) in outputs.iter() {
            let Some(name) = name.as_str() else { continue };
            if name.starts_with("Fn::ForEach::") {
                continue;
            }
            let Some(body) = body.as_mapping() else {
                continue;
            };

            let id = Self::next_id("out-");
            let namespaced = format!("{OUTPUT_PREFIX}{name}");

            let description = body
                .get(&Value::from("Description"))
                .and_then(Value::as_str)
                .map(str::to_string);

            let raw_value = body.get(&Value::from("Value")).cloned().unwrap_or(Value::Null);
            let value = OutputValue {
                value: raw_value.clone(),
                depend_conditions: self
                    .resolve_condition_refs(extract_if_condition_refs(&raw_value)),
            };

            // `source_resource`/`source_parameter` are drawn from the whole
            // output body excluding `Export` (matching `find_references` over
            // `output_pure_data` in the source this was distilled from), not
            // just `Value` — a pseudo-parameter or ref living in e.g.
            // `Description` still counts as a source.
            let mut output_data = body.clone();
            output_data.remove(&Value::from("Export"));
            let output_refs = extract_refs(&Value::Mapping(output_data));

            let source_resource = self.resolve_resource_refs(output_refs.clone());
            let source_parameter = self.resolve_parameter_refs(output_refs);

            let depend_conditions = body
                .get(&Value::from("Condition"))
                .and_then(Value::as_str)
                .map(|name| self.resolve_condition_refs(vec![format!("{CONDITION_PREFIX}{name}")]))
                .unwrap_or_default();

            let export_name = body
                .get(&Value::from("Export"))
                .and_then(Value::as_mapping)
                .map(|export| self.extract_export_name(export));

            self.outputs.push(Output {
                id,
                name: namespaced,
                description,
                value,
                source_resource,
                source_parameter,
                export_name,
                depend_conditions,
            });
        }
    }

    fn extract_export_name(&self, export: &common::serde_yaml::Mapping) -> ExportName {
        let name = export.get(&Value::from("Name")).cloned();
        let refs = name.as_ref().map(extract_refs).unwrap_or_default();
        let depend_conditions = name
            .as_ref()
            .map(|value| self.resolve_condition_refs(extract_if_condition_refs(value)))
            .unwrap_or_default();

        ExportName {
            depend_para: self.resolve_parameter_refs(refs.clone()),
            depend_resource: self.resolve_resource_refs(refs),
            depend_conditions,
            name,
        }
    }

    // -- Name -> id resolution --------------------------------------------

    /// Resolve raw referenced names to parameter ids, silently dropping
    /// names that aren't known parameters (including pseudo-parameters not
    /// present in `AWS_PSEUDO_PARAMETERS`). Dedups by first occurrence,
    /// preserving insertion order rather than sorting by (random) id — the
    /// lists are insertion-ordered for determinism (`spec.md` §3.2).
    fn resolve_parameter_refs(&self, names: Vec<String>) -> Vec<String> {
        let mut seen = HashSet::new();
        names
            .into_iter()
            .filter_map(|name| self.parameter_name_to_id.get(&name).cloned())
            .filter(|id| seen.insert(id.clone()))
            .collect()
    }

    fn resolve_resource_refs(&self, names: Vec<String>) -> Vec<String> {
        let mut seen = HashSet::new();
        names
            .into_iter()
            .filter_map(|name| self.resource_name_to_id.get(&name).cloned())
            .filter(|id| seen.insert(id.clone()))
            .collect()
    }

    /// `names` are already `Cond.`-prefixed.
    fn resolve_condition_refs(&self, names: Vec<String>) -> Vec<String> {
        let mut seen = HashSet::new();
        names
            .into_iter()
            .filter_map(|name| self.condition_name_to_id.get(&name).cloned())
            .filter(|id| seen.insert(id.clone()))
            .collect()
    }

    fn finish(self) -> Ir {
        Ir {
            metadata: Metadata {
                template_id: Uuid::new_v4().to_string(),
                cloud_service_provider: self
                    .cloud_service_provider
                    .unwrap_or_else(|| "AWS".to_string()),
                description: self.description,
                additional_info: self.additional_info,
            },
            parameters: self.parameters,
            conditions: self.conditions,
            resources: self.resources,
            outputs: self.outputs,
        }
    }
}

/// The sections `spec.md` §4.2 step 3 scans for pseudo-parameter tokens:
/// `Parameters`, `Conditions`, `Rules`, `Outputs`, and each resource's
/// `Properties` specifically (not its whole body — `DependsOn`,
/// `Metadata`, and the other resource arguments are excluded), matching
/// `get_pseudo_parameters_search_scope` in the implementation this was
/// distilled from. Top-level `Metadata`/`Mappings` are excluded too.
fn pseudo_parameter_scan_scopes(root: &common::serde_yaml::Mapping) -> Vec<&Value> {
    let mut scopes = Vec::new();
    for key in ["Parameters", "Conditions", "Rules", "Outputs"] {
        if let Some(value) = root.get(&Value::from(key)) {
            scopes.push(value);
        }
    }
    if let Some(resources) = root.get(&Value::from("Resources")).and_then(Value::as_mapping) {
        for (_, body) in resources.iter() {
            if let Some(properties) =
                body.as_mapping().and_then(|m| m.get(&Value::from("Properties")))
            {
                scopes.push(properties);
            }
        }
    }
    scopes
}

/// Filters list-typed resource bodies, resources missing a `Type`, and
/// `Rain::*` preprocessor types (`spec.md` §4.2, `filter_non_cfn_resources`).
fn is_cfn_resource(body: &Value) -> bool {
    let Some(map) = body.as_mapping() else {
        return false;
    };
    let Some(type_) = map.get(&Value::from("Type")).and_then(Value::as_str) else {
        return false;
    };
    !type_.starts_with("Rain::")
}
