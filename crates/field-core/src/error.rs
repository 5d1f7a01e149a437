//! Error taxonomy shared by every engine operation.

use crate::project::ProjectStatus;
use crate::roles::Role;
use rust_decimal::Decimal;
use thiserror::Error;

/// Failures produced by engine operations.
///
/// Every variant is local and recoverable: the operation that returned it
/// left the project untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// A spend request exceeded the current budget.
    #[error("insufficient budget: required {required}, available {available}")]
    InsufficientBudget {
        /// Amount the operation needed.
        required: Decimal,
        /// Budget at the time of the request.
        available: Decimal,
    },
    /// One or more preconditions failed; every blocker is listed.
    #[error("preconditions not met: {}", .0.join("; "))]
    PreconditionNotMet(Vec<String>),
    /// Fewer role approvals than the gate quorum.
    #[error("insufficient approvals: {have} of {needed} required")]
    InsufficientApprovals {
        /// Count of roles that approved.
        have: usize,
        /// Quorum for the gate given the team size.
        needed: usize,
    },
    /// Required roles have not signed off and the decision was not forced.
    #[error("required roles have not signed off: {}", join_roles(.0))]
    RequiredRolesMissing(Vec<Role>),
    /// Input outside its meaningful range.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Catalog lookup failed.
    #[error("unknown {kind}: {key}")]
    UnknownOption {
        /// Catalog name, e.g. "lease option".
        kind: &'static str,
        /// Key that was looked up.
        key: String,
    },
    /// The project has reached a terminal status.
    #[error("project is closed ({0:?})")]
    ProjectClosed(ProjectStatus),
    /// Arithmetic produced a non-finite value.
    #[error("non-finite numeric value encountered")]
    NonFinite,
    /// Static tables failed validation.
    #[error("invalid economic tables: {0}")]
    InvalidTable(String),
}

fn join_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience alias for engine results.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_message_lists_every_item() {
        let e = EngineError::PreconditionNotMet(vec!["a".into(), "b".into()]);
        assert_eq!(e.to_string(), "preconditions not met: a; b");
    }

    #[test]
    fn roles_are_named_in_message() {
        let e = EngineError::RequiredRolesMissing(vec![Role::Geologist, Role::FinanceAnalyst]);
        assert_eq!(
            e.to_string(),
            "required roles have not signed off: geologist, finance_analyst"
        );
    }
}
