//! Fixed tables and patterns from the external interface contract.
//!
//! None of this is runtime configuration in the usual sense — it's the
//! closed set of CloudFormation intrinsic-function tags, pseudo-parameter
//! names, and key mappings that the IR builder is specified against. See
//! `spec.md` §6.

use common::once_cell::sync::Lazy;
use common::regex::Regex;

/// CloudFormation short tags the document loader is expected to have
/// already reified into single-key mappings (e.g. `!Ref X` -> `{"Ref": X}`)
/// before it reaches this crate.
pub const CFN_SHORT_TAGS: &[&str] = &[
    "Ref",
    "Sub",
    "GetAtt",
    "Join",
    "Select",
    "Split",
    "Equals",
    "If",
    "FindInMap",
    "GetAZs",
    "Base64",
    "Cidr",
    "Transform",
    "ImportValue",
    "Not",
    "And",
    "Or",
    "Condition",
    "ForEach",
    "ValueOf",
    "Rain::Embed",
    "Rain::Module",
];

/// The closed set of AWS pseudo-parameters.
pub const AWS_PSEUDO_PARAMETERS: &[&str] = &[
    "AWS::StackName",
    "AWS::Region",
    "AWS::AccountId",
    "AWS::NoValue",
    "AWS::Partition",
    "AWS::URLSuffix",
    "AWS::StackId",
    "AWS::NotificationARNs",
];

/// `${NAME}` substitution pattern used inside `Fn::Sub` strings.
pub static SUBSTITUTION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("substitution pattern is valid"));

/// Pattern matching any pseudo-parameter-shaped token, e.g. `AWS::Region`.
pub static PSEUDO_PARAMETER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"AWS::[A-Za-z0-9]+").expect("pseudo-parameter pattern is valid"));

/// Namespace prefix for condition ids/names in the IR, to avoid collisions
/// with resource/parameter names that share the identifier space.
pub const CONDITION_PREFIX: &str = "Cond.";

/// Namespace prefix for output ids/names in the IR.
pub const OUTPUT_PREFIX: &str = "Out.";

/// Metadata keys that are presentation-only and excluded from `additional_info`.
pub const KNOWN_PRESENTATION_METADATA_KEYS: &[&str] = &[
    "AWS::CloudFormation::Interface",
    "AWS::CloudFormation::Designer",
];

/// Translate a recognized CloudFormation resource top-level key (besides
/// `Type`/`Properties`) to its canonical argument name. Returns `None` for
/// keys that aren't part of the recognized argument mapping.
pub fn canonical_argument_name(cfn_key: &str) -> Option<&'static str> {
    Some(match cfn_key {
        "Condition" => "condition",
        "DependsOn" => "depends_on",
        "CreationPolicy" => "creation_policy",
        "UpdatePolicy" => "update_policy",
        "DeletionPolicy" => "deletion_policy",
        "UpdateReplacePolicy" => "update_replace_policy",
        _ => return None,
    })
}
