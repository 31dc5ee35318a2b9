use common::thiserror::Error;

/// The one fatal error class the IR builder can raise.
///
/// Everything else described in `spec.md` §7 (intrinsic-function shape
/// mismatches, unknown reference names, filtered resources) is recovered
/// from silently and never surfaces here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed CloudFormation document: {reason}")]
    MalformedDocument { reason: String },
}
