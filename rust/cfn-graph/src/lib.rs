//! Builds a dependency graph from a [`cfn_ir::Ir`] and analyzes it.
//!
//! ```text
//! cfn_ir::Ir -> build::build() -> model::Graph -> analysis::analyze() -> findings::AnalysisReport
//! ```

mod build;
pub mod analysis;
pub mod findings;
pub mod model;

pub use build::build;
pub use findings::AnalysisReport;
pub use model::{Edge, EdgeKind, Graph, Node, NodeKind};

use cfn_ir::Ir;

/// Build the dependency graph for `ir` and run every analysis over it.
pub fn analyze(ir: &Ir) -> (Graph, AnalysisReport) {
    let graph = build(ir);
    let report = analysis::analyze(ir, &graph);
    (graph, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::serde_yaml;

    fn ir_from(doc: &str) -> Ir {
        let value: serde_yaml::Value = serde_yaml::from_str(doc).unwrap();
        cfn_ir::build(&value).unwrap()
    }

    #[test]
    fn unreferenced_parameter_is_flagged_unused() {
        let ir = ir_from(
            r#"
            Parameters:
              Unused:
                Type: String
            "#,
        );
        let (_graph, report) = analyze(&ir);
        assert_eq!(report.unused_parameters.len(), 1);
        assert_eq!(report.unused_parameters[0].name, "Unused");
    }

    #[test]
    fn parameter_used_by_a_resource_is_not_unused() {
        let ir = ir_from(
            r#"
            Parameters:
              Env:
                Type: String
            Resources:
              Bucket:
                Type: AWS::S3::Bucket
                Properties:
                  BucketName:
                    Ref: Env
            "#,
        );
        let (_graph, report) = analyze(&ir);
        assert!(report.unused_parameters.is_empty());
    }

    #[test]
    fn condition_never_referenced_is_no_sourced_and_unused() {
        let ir = ir_from(
            r#"
            Parameters:
              Env:
                Type: String
            Conditions:
              IsProd:
                Fn::Equals:
                  - Ref: Env
                  - prod
            "#,
        );
        let (_graph, report) = analyze(&ir);
        assert_eq!(report.unused_conditions.len(), 1);
        assert_eq!(report.no_sourced_conditions.len(), 1);
    }

    #[test]
    fn rule_condition_is_exempt_from_unused_and_no_sourced() {
        let ir = ir_from(
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
                        - Ref: InstanceType
            "#,
        );
        let (_graph, report) = analyze(&ir);
        assert!(report.unused_conditions.is_empty());
        assert!(report.no_sourced_conditions.is_empty());
    }

    #[test]
    fn ruled_parameter_root_edge_is_rewritten_to_the_rule_condition() {
        let ir = ir_from(
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
        let (graph, _report) = analyze(&ir);
        // The parameter's original `root -> InstanceType` edge is rewritten
        // so the rule condition is its sole source; it still has no
        // outgoing edges of its own; that is, unused-parameter
        // classification doesn't read an inbound edge (`spec.md` §4.4.1).
        assert_eq!(graph.incoming_names("InstanceType"), vec!["Cond.ValidInstanceType"]);
    }

    #[test]
    fn output_with_literal_value_is_no_sourced() {
        let ir = ir_from(
            r#"
            Outputs:
              StaticValue:
                Value: "hello"
            "#,
        );
        let (_graph, report) = analyze(&ir);
        assert_eq!(report.no_sourced_outputs.len(), 1);
    }

    #[test]
    fn direct_self_reference_is_a_pure_resource_cycle() {
        let ir = ir_from(
            r#"
            Resources:
              A:
                Type: AWS::S3::Bucket
                DependsOn: B
              B:
                Type: AWS::S3::Bucket
                DependsOn: A
            "#,
        );
        let (_graph, report) = analyze(&ir);
        assert_eq!(report.circular_dependencies.len(), 1);
        let cycle = &report.circular_dependencies[0];
        assert_eq!(cycle.cycle_type, "pure_resource_cycle");
        assert_eq!(cycle.cycle_length, 2);
    }

    #[test]
    fn gated_resource_dependent_without_condition_is_a_cascading_failure() {
        let ir = ir_from(
            r#"
            Parameters:
              Env:
                Type: String
            Conditions:
              IsProd:
                Fn::Equals:
                  - Ref: Env
                  - prod
            Resources:
              Gated:
                Type: AWS::S3::Bucket
                Condition: IsProd
              Dependent:
                Type: AWS::S3::BucketPolicy
                Properties:
                  Bucket:
                    Ref: Gated
            "#,
        );
        let (_graph, report) = analyze(&ir);
        assert_eq!(report.cascading_provisioning_failures.len(), 1);
        let failure = &report.cascading_provisioning_failures[0];
        assert_eq!(failure.gated_resource, "Gated");
        assert_eq!(failure.dependent_resource, "Dependent");
        assert_eq!(failure.condition, "Cond.IsProd");
    }

    #[test]
    fn dependent_resource_gated_by_the_same_condition_is_not_a_failure() {
        let ir = ir_from(
            r#"
            Parameters:
              Env:
                Type: String
            Conditions:
              IsProd:
                Fn::Equals:
                  - Ref: Env
                  - prod
            Resources:
              Gated:
                Type: AWS::S3::Bucket
                Condition: IsProd
              AlsoGated:
                Type: AWS::S3::BucketPolicy
                Condition: IsProd
                Properties:
                  Bucket:
                    Ref: Gated
            "#,
        );
        let (_graph, report) = analyze(&ir);
        assert!(report.cascading_provisioning_failures.is_empty());
    }

    #[test]
    fn property_level_if_on_the_protecting_condition_stops_cascading_failure() {
        let ir = ir_from(
            r#"
            Parameters:
              Env:
                Type: String
            Conditions:
              IsProd:
                Fn::Equals:
                  - Ref: Env
                  - prod
            Resources:
              Gated:
                Type: AWS::S3::Bucket
                Condition: IsProd
              Dependent:
                Type: AWS::S3::BucketPolicy
                Properties:
                  Bucket:
                    If:
                      - IsProd
                      - Ref: Gated
                      - null
            "#,
        );
        let (_graph, report) = analyze(&ir);
        assert!(report.cascading_provisioning_failures.is_empty());
    }
}
