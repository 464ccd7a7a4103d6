// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// Typed failures raised by the constraint engine.
///
/// These are carried inside [`anyhow::Error`] by the fallible engine APIs;
/// callers that need to distinguish the failure class can downcast.
/// Constraint violations are never errors; they are reported as data in
/// [`crate::ValidationOutcome`].
#[derive(Debug, Clone, Error)]
pub enum ConstraintError {
    /// Type description missing, malformed, or a recognized constraint tag
    /// with the wrong number of arguments.
    #[error("invalid constraint schema for `{type_name}`: {reason}")]
    Schema { type_name: String, reason: String },

    /// An expression string does not match any recognized form, or path
    /// traversal hit a structural mismatch.
    #[error("cannot resolve expression `{expr}`: {reason}")]
    Expression { expr: String, reason: String },

    /// The external document resolver failed to fetch a referenced document.
    /// Distinct from an absent reference field, which is a vacuous pass.
    #[error("failed to fetch `{path}` from referenced object `{reference}`: {reason}")]
    Resolution {
        reference: String,
        path: String,
        reason: String,
    },
}

impl ConstraintError {
    pub(crate) fn schema(type_name: &str, reason: impl Into<String>) -> anyhow::Error {
        ConstraintError::Schema {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
        .into()
    }

    pub(crate) fn expression(expr: &str, reason: impl Into<String>) -> anyhow::Error {
        ConstraintError::Expression {
            expr: expr.to_string(),
            reason: reason.into(),
        }
        .into()
    }

    pub(crate) fn resolution(reference: &str, path: &str, reason: impl Into<String>) -> anyhow::Error {
        ConstraintError::Resolution {
            reference: reference.to_string(),
            path: path.to_string(),
            reason: reason.into(),
        }
        .into()
    }
}
