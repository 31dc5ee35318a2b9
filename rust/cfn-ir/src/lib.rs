//! Lowers a normalized CloudFormation document tree into a flat,
//! reference-resolved intermediate representation.
//!
//! ```text
//! serde_yaml::Value (normalized document) -> builder::build() -> ir::Ir
//! ```
//!
//! This crate does not parse YAML/JSON off disk and does not resolve
//! CloudFormation's short intrinsic-function tags (`!Ref`, `!Sub`, ...) —
//! both are assumed to have already happened, producing the `Fn::`-free
//! single-key-mapping document this crate's [`build`] function consumes.

mod builder;
pub mod config;
pub mod error;
pub mod ir;
pub mod refs;

pub use builder::build;
pub use error::Error;
pub use ir::{
    Condition, DependsOn, ExportName, Ir, Metadata, Output, OutputValue, Parameter,
    ParameterConstraints, ParameterDefault, ParameterType, PropertyUnit, Resource,
    ResourceArguments,
};

#[cfg(test)]
mod tests {
    use super::*;
    use common::serde_yaml;

    fn build_str(doc: &str) -> Ir {
        let value: serde_yaml::Value = serde_yaml::from_str(doc).unwrap();
        build(&value).unwrap()
    }

    #[test]
    fn rejects_non_mapping_document() {
        let value: serde_yaml::Value = serde_yaml::from_str("- 1\n- 2\n").unwrap();
        assert!(build(&value).is_err());
    }

    #[test]
    fn parameter_without_default_has_no_default() {
        let ir = build_str(
            r#"
            Parameters:
              Env:
                Type: String
            "#,
        );
        assert_eq!(ir.parameters.len(), 1);
        assert!(ir.parameters[0].default.is_none());
        assert!(ir.parameters[0].constraints.is_none());
    }

    #[test]
    fn comma_delimited_list_default_is_split() {
        let ir = build_str(
            r#"
            Parameters:
              Zones:
                Type: CommaDelimitedList
                Default: "a,b,c"
            "#,
        );
        match &ir.parameters[0].default {
            Some(ParameterDefault::List(items)) => {
                assert_eq!(items, &vec!["a".to_string(), "b".to_string(), "c".to_string()])
            }
            other => panic!("expected list default, got {other:?}"),
        }
    }

    #[test]
    fn pseudo_parameter_referenced_in_resource_becomes_a_parameter() {
        let ir = build_str(
            r#"
            Resources:
              Bucket:
                Type: AWS::S3::Bucket
                Properties:
                  BucketName:
                    Ref: "AWS::StackName"
            "#,
        );
        assert!(ir
            .parameters
            .iter()
            .any(|p| p.name == "AWS::StackName" && p.type_ == ParameterType::PseudoParameter));
        let refs = &ir.resources[0].properties[0].parameter_refs;
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn rain_resources_are_filtered_out() {
        let ir = build_str(
            r#"
            Resources:
              Module:
                Type: Rain::Module
                Properties:
                  Path: "./module.yaml"
              Bucket:
                Type: AWS::S3::Bucket
            "#,
        );
        assert_eq!(ir.resources.len(), 1);
        assert_eq!(ir.resources[0].name, "Bucket");
    }

    #[test]
    fn resource_condition_is_stored_as_namespaced_name() {
        let ir = build_str(
            r#"
            Conditions:
              IsProd:
                Fn::Equals:
                  - Ref: Env
                  - "prod"
            Parameters:
              Env:
                Type: String
            Resources:
              Bucket:
                Type: AWS::S3::Bucket
                Condition: IsProd
            "#,
        );
        assert_eq!(
            ir.resources[0].arguments.condition,
            Some("Cond.IsProd".to_string())
        );
    }

    #[test]
    fn forward_referenced_condition_resolves() {
        // `Later` is declared after `First` but `First` still resolves its
        // `depend_cond` id, since condition ids are all pre-assigned before
        // any condition body is walked.
        let ir = build_str(
            r#"
            Conditions:
              First:
                Fn::Not:
                  - Condition: Later
              Later:
                Fn::Equals:
                  - "a"
                  - "b"
            "#,
        );
        let first = ir.conditions.iter().find(|c| c.name == "Cond.First").unwrap();
        let later = ir.conditions.iter().find(|c| c.name == "Cond.Later").unwrap();
        assert_eq!(first.depend_cond, vec![later.id.clone()]);
    }

    #[test]
    fn rule_assertion_without_parameter_refs_leaves_ruled_para_none() {
        let ir = build_str(
            r#"
            Rules:
              AlwaysChecked:
                Assertions:
                  - Assert:
                      Fn::Equals:
                        - "1"
                        - "1"
            "#,
        );
        let rule = ir.conditions.iter().find(|c| c.name == "Cond.AlwaysChecked").unwrap();
        assert_eq!(rule.ruled_para, None);
        assert!(rule.constraint.is_some());
    }

    #[test]
    fn rule_assertion_referencing_a_parameter_populates_ruled_para() {
        let ir = build_str(
            r#"
            Parameters:
              InstanceType:
                Type: String
            Rules:
              ValidInstanceType:
                Assertions:
                  - Assert:
                      Fn::Contains:
                        - - t2.micro
                          - t2.small
                        - Ref: InstanceType
            "#,
        );
        let rule = ir
            .conditions
            .iter()
            .find(|c| c.name == "Cond.ValidInstanceType")
            .unwrap();
        assert_eq!(rule.ruled_para.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn output_tracks_export_name_dependencies_independently() {
        let ir = build_str(
            r#"
            Parameters:
              Env:
                Type: String
            Resources:
              Bucket:
                Type: AWS::S3::Bucket
            Outputs:
              BucketArn:
                Value:
                  Fn::GetAtt:
                    - Bucket
                    - Arn
                Export:
                  Name:
                    Fn::Sub: "${Env}-bucket-arn"
            "#,
        );
        let output = &ir.outputs[0];
        assert_eq!(output.source_resource.len(), 1);
        let export = output.export_name.as_ref().unwrap();
        assert_eq!(export.depend_para.len(), 1);
    }

    #[test]
    fn pseudo_parameter_scan_ignores_resource_metadata_and_top_level_mappings() {
        let ir = build_str(
            r#"
            Mappings:
              RegionMap:
                Description: "uses AWS::Region but outside any scanned section"
            Resources:
              Bucket:
                Type: AWS::S3::Bucket
                Metadata:
                  Note: "AWS::AccountId"
                DependsOn: "AWS::NoValue"
                Properties:
                  BucketName: "static-name"
            "#,
        );
        assert!(ir.parameters.is_empty());
    }

    #[test]
    fn output_source_refs_include_non_value_fields_but_not_export() {
        let ir = build_str(
            r#"
            Parameters:
              Env:
                Type: String
            Resources:
              Bucket:
                Type: AWS::S3::Bucket
            Outputs:
              BucketName:
                Description:
                  Fn::Sub: "bucket for ${Env}"
                Value: "static"
                Export:
                  Name:
                    Ref: Bucket
            "#,
        );
        let output = &ir.outputs[0];
        assert_eq!(output.source_parameter.len(), 1);
        assert!(output.source_resource.is_empty());
    }

    #[test]
    fn foreach_outputs_are_skipped() {
        let ir = build_str(
            r#"
            Outputs:
              "Fn::ForEach::Zones":
                - Zone
                - - a
                  - b
                - "Output${Zone}":
                    Value:
                      Ref: Zone
            "#,
        );
        assert!(ir.outputs.is_empty());
    }
}
