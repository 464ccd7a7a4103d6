// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod engine;
mod error;
mod expr;
mod number;
mod resolver;
mod schema;
mod typespec;
mod value;

pub use engine::{ConditionalViolation, Engine, FailedConstraints, ValidationOutcome};
pub use error::ConstraintError;
pub use resolver::{DocumentResolver, RefRequest};
pub use schema::TypeProvider;
pub use value::Value;

/// Items in `unstable` are likely to change.
pub mod unstable {
    pub use crate::expr::*;
    pub use crate::schema::*;
    pub use crate::typespec::*;
}
