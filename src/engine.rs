// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::ConstraintError;
use crate::expr::Expr;
use crate::resolver::{DocumentResolver, Resolver};
use crate::schema::{ConstraintSet, ConstraintSpec, TypeProvider};
use crate::value::Value;

use std::collections::BTreeSet;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One violated `conditionally_required` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalViolation {
    /// The field whose presence triggered the requirement.
    pub trigger: String,
    /// Every field the trigger requires.
    pub required: Vec<String>,
    /// The required fields absent from the document.
    pub missing: Vec<String>,
}

/// The violated constraints of one validation call, grouped by kind.
///
/// All three groups are always present; an empty list means every
/// applicable spec of that kind held.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedConstraints {
    pub unique: Vec<String>,
    pub contains: Vec<String>,
    pub conditionally_required: Vec<ConditionalViolation>,
}

/// The verdict of one validation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub validated: bool,
    pub failed_constraints: FailedConstraints,
}

/// The constraint evaluation engine.
///
/// Stateless across calls: each [`Engine::validate`] fetches the type
/// description fresh, builds its own constraint set, and never mutates the
/// document.
pub struct Engine {
    types: Box<dyn TypeProvider>,
    documents: Box<dyn DocumentResolver>,
}

impl Engine {
    pub fn new(types: Box<dyn TypeProvider>, documents: Box<dyn DocumentResolver>) -> Self {
        Self { types, documents }
    }

    /// Validates `data` against the constraint declarations of `obj_type`.
    ///
    /// Every applicable spec of every kind is evaluated, with no
    /// short-circuit on the first failure, so the outcome reports all
    /// violations at once. Structural problems (malformed expressions,
    /// resolver failures, a malformed type description) are errors, not
    /// violations.
    pub fn validate(&self, obj_type: &str, data: &Value) -> Result<ValidationOutcome> {
        if data.as_object().is_err() {
            bail!("document for `{obj_type}` must be a mapping of fields");
        }

        let description = self
            .types
            .type_description(obj_type)
            .map_err(|e| ConstraintError::schema(obj_type, e.to_string()))?;
        let constraints = ConstraintSet::parse(obj_type, &description)?;
        debug!(obj_type, declarations = constraints.len(), "validating document");

        let constraints = filter_applicable(&constraints, data)?;

        let mut resolver = Resolver::new(data, self.documents.as_ref());
        resolver.prefetch(resolvable_exprs(&constraints))?;

        let mut failed = FailedConstraints::default();
        check_unique(&resolver, &constraints.unique, &mut failed.unique)?;
        check_contains(&resolver, &constraints.contains, &mut failed.contains)?;
        check_conditionally_required(
            data,
            &constraints.conditionally_required,
            &mut failed.conditionally_required,
        );

        let validated = failed.unique.is_empty()
            && failed.contains.is_empty()
            && failed.conditionally_required.is_empty();
        Ok(ValidationOutcome {
            validated,
            failed_constraints: failed,
        })
    }
}

/// Drops `contains` specs that do not apply to this document: a spec whose
/// reference expressions' top-level fields are all absent describes an
/// optional part of the type the document legitimately omits.
///
/// Returns a new set; the input is never mutated. `unique` and
/// `conditionally_required` specs are always retained: an absent unique
/// field resolves to an empty list and passes vacuously.
fn filter_applicable(constraints: &ConstraintSet, data: &Value) -> Result<ConstraintSet> {
    let mut filtered = constraints.clone();
    let mut retained = Vec::with_capacity(constraints.contains.len());
    for spec in &constraints.contains {
        let mut keys = vec![];
        for reference in spec.references() {
            if let Some(key) = Expr::parse(reference)?.document_key() {
                keys.push(key.to_string());
            }
        }
        // A spec referencing only literals is always applicable.
        let applicable = keys.is_empty() || keys.iter().any(|k| data.has_field(k));
        if applicable {
            retained.push(spec.clone());
        } else {
            debug!(spec = %spec.joined(), "dropping inapplicable contains constraint");
        }
    }
    filtered.contains = retained;
    Ok(filtered)
}

/// The expression strings the resolver will evaluate, for prefetching.
/// `conditionally_required` arguments are field names checked directly
/// against the document and never resolved.
fn resolvable_exprs(constraints: &ConstraintSet) -> impl Iterator<Item = &str> {
    constraints
        .unique
        .iter()
        .chain(constraints.contains.iter())
        .flat_map(|spec| spec.exprs())
        .map(String::as_str)
}

fn check_unique(
    resolver: &Resolver,
    specs: &[ConstraintSpec],
    failed: &mut Vec<String>,
) -> Result<()> {
    for spec in specs {
        let values = resolver.resolve(&Expr::parse(spec.subject())?)?;
        let distinct: BTreeSet<&Value> = values.iter().collect();
        if distinct.len() != values.len() {
            failed.push(spec.subject().to_string());
        }
    }
    Ok(())
}

fn check_contains(
    resolver: &Resolver,
    specs: &[ConstraintSpec],
    failed: &mut Vec<String>,
) -> Result<()> {
    for spec in specs {
        let subject: BTreeSet<Value> = resolver
            .resolve(&Expr::parse(spec.subject())?)?
            .into_iter()
            .collect();
        let mut reference = BTreeSet::new();
        for text in spec.references() {
            reference.extend(resolver.resolve(&Expr::parse(text)?)?);
        }
        if !subject.is_subset(&reference) {
            failed.push(spec.joined());
        }
    }
    Ok(())
}

fn check_conditionally_required(
    data: &Value,
    specs: &[ConstraintSpec],
    failed: &mut Vec<ConditionalViolation>,
) {
    for spec in specs {
        let trigger = spec.subject();
        if !data.has_field(trigger) {
            continue;
        }
        let missing: Vec<String> = spec
            .references()
            .iter()
            .filter(|field| !data.has_field(field))
            .cloned()
            .collect();
        if !missing.is_empty() {
            failed.push(ConditionalViolation {
                trigger: trigger.to_string(),
                required: spec.references().to_vec(),
                missing,
            });
        }
    }
}
