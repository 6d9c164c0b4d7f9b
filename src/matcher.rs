//! Signature matching.
//!
//! Compares declared members against a [`CallableContract`] by name text:
//! each declared type is normalized and must equal the contract type's short
//! or fully qualified name. No type system is consulted, so a custom type
//! spelled through an alias or a partial namespace may fail to match.

use dyncode_core::type_name::normalize;
use thiserror::Error;

use crate::analyzer::MemberSignature;
use crate::contract::CallableContract;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("no member matches {contract}")]
    NoMatch { contract: CallableContract },
}

/// The first candidate, in declaration order, whose signature fits `contract`.
pub fn match_signature<'a>(
    contract: &CallableContract,
    candidates: &'a [MemberSignature],
) -> Result<&'a MemberSignature, MatchError> {
    candidates
        .iter()
        .find(|candidate| signature_matches(contract, candidate))
        .ok_or_else(|| MatchError::NoMatch {
            contract: contract.clone(),
        })
}

fn signature_matches(contract: &CallableContract, candidate: &MemberSignature) -> bool {
    returns_match(contract, &candidate.return_type)
        && candidate.parameters.len() == contract.arity()
        && candidate
            .parameters
            .iter()
            .zip(contract.inputs())
            .all(|(param, input)| input.matches_text(&normalize(&param.type_text)))
}

fn returns_match(contract: &CallableContract, return_type: &str) -> bool {
    let normalized = normalize(return_type);
    match contract.output() {
        Some(output) => output.matches_text(&normalized),
        None => matches!(normalized.as_str(), "void" | "Void" | "System.Void"),
    }
}
