//! The Reference Extractor (`spec.md` §4.1).
//!
//! Three independent traversals over the normalized document tree:
//!
//! - [`extract_refs`] walks intrinsic functions and returns the symbolic
//!   names they reference (parameters, resources, pseudo-parameters,
//!   mappings), plus any bare `AWS::*` pseudo-parameter tokens found in
//!   scalar strings.
//! - [`extract_condition_name_refs`] returns condition names referenced via
//!   a literal `Condition` key (how one condition references another inside
//!   `Fn::And`/`Fn::Or`/`Fn::Not`).
//! - [`extract_if_condition_refs`] returns condition names referenced via
//!   `Fn::If` (how a resource property or output value branches on a
//!   condition).
//!
//! None of these traversals resolve names to ids or validate that a name
//! exists anywhere — that's the IR builder's job. None of them short-circuit
//! on the outer key: recursing into a `Sub`'s bindings can surface further
//! intrinsic functions nested inside.

use common::serde_yaml::Value;

use crate::config::{CONDITION_PREFIX, PSEUDO_PARAMETER_PATTERN, SUBSTITUTION_PATTERN};

/// Extract every symbolic name referenced by intrinsic functions (or bare
/// `AWS::*` tokens in strings) within `value`.
pub fn extract_refs(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    extract_refs_into(value, &mut out);
    out
}

fn extract_refs_into(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Mapping(map) => {
            for (key, val) in map.iter() {
                let Some(key) = key.as_str() else { continue };
                match key {
                    "Ref" | "Fn::Ref" => {
                        if let Some(name) = val.as_str() {
                            out.push(name.to_string());
                        }
                    }
                    "GetAtt" | "Fn::GetAtt" => match val {
                        Value::Sequence(seq) => {
                            if let Some(name) = seq.first().and_then(Value::as_str) {
                                out.push(name.to_string());
                            }
                        }
                        Value::String(s) => {
                            if let Some(head) = s.split('.').next() {
                                out.push(head.to_string());
                            }
                        }
                        _ => {}
                    },
                    "FindInMap" | "Fn::FindInMap" => {
                        if let Value::Sequence(seq) = val {
                            if let Some(name) = seq.first().and_then(Value::as_str) {
                                out.push(name.to_string());
                            }
                            for item in seq.iter().skip(1) {
                                extract_refs_into(item, out);
                            }
                        }
                    }
                    "Sub" | "Fn::Sub" => match val {
                        Value::Sequence(seq) if !seq.is_empty() => {
                            if let Some(template) = seq[0].as_str() {
                                let mut matches: Vec<String> = SUBSTITUTION_PATTERN
                                    .captures_iter(template)
                                    .map(|c| c[1].to_string())
                                    .collect();
                                if let Some(Value::Mapping(bindings)) = seq.get(1) {
                                    for (bind_key, bind_val) in bindings.iter() {
                                        let Some(bind_key) = bind_key.as_str() else {
                                            continue;
                                        };
                                        if let Some(pos) =
                                            matches.iter().position(|m| m == bind_key)
                                        {
                                            extract_refs_into(bind_val, out);
                                            matches.remove(pos);
                                        }
                                    }
                                }
                                for name in matches {
                                    out.push(leading_segment(&name));
                                }
                            }
                        }
                        Value::String(s) => {
                            for cap in SUBSTITUTION_PATTERN.captures_iter(s) {
                                out.push(leading_segment(&cap[1]));
                            }
                        }
                        _ => {}
                    },
                    "Join" | "Fn::Join" => {
                        if let Value::Sequence(seq) = val {
                            if seq.len() > 1 {
                                match &seq[1] {
                                    Value::Sequence(items) => {
                                        for item in items {
                                            if matches!(item, Value::Mapping(_)) {
                                                extract_refs_into(item, out);
                                            }
                                            // string literals contribute nothing
                                        }
                                    }
                                    Value::Mapping(_) => extract_refs_into(&seq[1], out),
                                    _ => {}
                                }
                            }
                        }
                    }
                    _ => extract_refs_into(val, out),
                }
            }
        }
        Value::Sequence(seq) => {
            for item in seq {
                extract_refs_into(item, out);
            }
        }
        Value::String(s) => {
            for hit in PSEUDO_PARAMETER_PATTERN.find_iter(s) {
                out.push(hit.as_str().to_string());
            }
        }
        _ => {}
    }
}

/// `MyInstance.PublicIp` -> `MyInstance`; anything without a `.` is returned as-is.
fn leading_segment(name: &str) -> String {
    name.split('.').next().unwrap_or(name).to_string()
}

/// Extract condition names referenced via a literal `Condition` key (used by
/// `Fn::And`/`Fn::Or`/`Fn::Not` to reference another condition). Names come
/// back `Cond.`-prefixed.
pub fn extract_condition_name_refs(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    extract_condition_name_refs_into(value, &mut out);
    out
}

fn extract_condition_name_refs_into(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Mapping(map) => {
            for (key, val) in map.iter() {
                let Some(key) = key.as_str() else { continue };
                if key == "Condition" {
                    if let Some(name) = val.as_str() {
                        out.push(format!("{CONDITION_PREFIX}{name}"));
                    }
                } else if matches!(val, Value::Mapping(_) | Value::Sequence(_)) {
                    extract_condition_name_refs_into(val, out);
                }
            }
        }
        Value::Sequence(seq) => {
            for item in seq {
                extract_condition_name_refs_into(item, out);
            }
        }
        _ => {}
    }
}

/// Extract condition names referenced via `Fn::If`, i.e. the first element
/// of an `If` array. Recurses into both branches (and anywhere else an `If`
/// may be nested). Names come back `Cond.`-prefixed.
pub fn extract_if_condition_refs(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    extract_if_condition_refs_into(value, &mut out);
    out
}

fn extract_if_condition_refs_into(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Mapping(map) => {
            for (key, val) in map.iter() {
                let Some(key) = key.as_str() else { continue };
                if key == "If" {
                    if let Value::Sequence(seq) = val {
                        if let Some(name) = seq.first().and_then(Value::as_str) {
                            out.push(format!("{CONDITION_PREFIX}{name}"));
                        }
                        if let Some(branch) = seq.get(1) {
                            extract_if_condition_refs_into(branch, out);
                        }
                        if let Some(branch) = seq.get(2) {
                            extract_if_condition_refs_into(branch, out);
                        }
                    }
                } else if matches!(val, Value::Mapping(_) | Value::Sequence(_)) {
                    extract_if_condition_refs_into(val, out);
                }
            }
        }
        Value::Sequence(seq) => {
            for item in seq {
                extract_if_condition_refs_into(item, out);
            }
        }
        _ => {}
    }
}

/// Scan every scalar string anywhere in `value` (keys and values, at any
/// depth) for pseudo-parameter-shaped tokens. Used to find pseudo-parameter
/// uses that aren't wrapped in `Ref` (e.g. literally embedded in an ARN
/// string), mirroring the template-wide scan the source implementation does
/// over each section's serialized form.
pub fn scan_pseudo_parameter_names(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    scan_pseudo_parameter_names_into(value, &mut out);
    out
}

fn scan_pseudo_parameter_names_into(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Mapping(map) => {
            for (key, val) in map.iter() {
                scan_pseudo_parameter_names_into(key, out);
                scan_pseudo_parameter_names_into(val, out);
            }
        }
        Value::Sequence(seq) => {
            for item in seq {
                scan_pseudo_parameter_names_into(item, out);
            }
        }
        Value::String(s) => {
            for hit in PSEUDO_PARAMETER_PATTERN.find_iter(s) {
                out.push(hit.as_str().to_string());
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::serde_yaml;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn ref_round_trip() {
        let value = yaml(r#"Ref: X"#);
        assert_eq!(extract_refs(&value), vec!["X".to_string()]);
    }

    #[test]
    fn get_att_scalar_and_list_forms_agree() {
        let scalar = yaml(r#"GetAtt: "MyInstance.PublicIp""#);
        let list = yaml(
            r#"
            GetAtt:
              - MyInstance
              - PublicIp
            "#,
        );
        assert_eq!(extract_refs(&scalar), vec!["MyInstance".to_string()]);
        assert_eq!(extract_refs(&list), vec!["MyInstance".to_string()]);
    }

    #[test]
    fn find_in_map_recurses_into_keys() {
        let value = yaml(
            r#"
            FindInMap:
              - RegionMap
              - Ref: "AWS::Region"
              - AMI
            "#,
        );
        let refs = extract_refs(&value);
        assert_eq!(refs, vec!["RegionMap".to_string(), "AWS::Region".to_string()]);
    }

    #[test]
    fn sub_scalar_form_truncates_getatt_style_refs() {
        let value = yaml(r#"Sub: "arn:${AWS::Partition}:s3:::${MyBucket.Arn}""#);
        let refs = extract_refs(&value);
        assert_eq!(refs, vec!["AWS::Partition".to_string(), "MyBucket".to_string()]);
    }

    #[test]
    fn sub_with_bindings_shadows_and_still_emits_pseudo_parameter() {
        let value = yaml(
            r#"
            Sub:
              - "Hello ${id} ${AWS::StackName}"
              - id:
                  Ref: "AWS::AccountId"
            "#,
        );
        let refs = extract_refs(&value);
        // `id` is shadowed by the binding, which itself references a pseudo-parameter;
        // `AWS::StackName` is emitted directly since it has no binding.
        assert_eq!(
            refs,
            vec!["AWS::AccountId".to_string(), "AWS::StackName".to_string()]
        );
    }

    #[test]
    fn join_ignores_string_literals_but_recurses_into_refs() {
        let value = yaml(
            r#"
            Join:
              - ","
              - - "Hello"
                - Ref: MyParam
            "#,
        );
        assert_eq!(extract_refs(&value), vec!["MyParam".to_string()]);
    }

    #[test]
    fn condition_name_refs_ignore_if_arrays() {
        let value = yaml(
            r#"
            And:
              - Condition: IsProd
              - If:
                  - IsStaging
                  - true
                  - false
            "#,
        );
        assert_eq!(
            extract_condition_name_refs(&value),
            vec!["Cond.IsProd".to_string()]
        );
    }

    #[test]
    fn if_condition_refs_recurse_into_both_branches() {
        let value = yaml(
            r#"
            If:
              - IsProd
              - Ref: A
              - If:
                  - IsStaging
                  - Ref: B
                  - Ref: C
            "#,
        );
        assert_eq!(
            extract_if_condition_refs(&value),
            vec!["Cond.IsProd".to_string(), "Cond.IsStaging".to_string()]
        );
    }
}
