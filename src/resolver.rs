// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::ConstraintError;
use crate::expr::{Expr, ExprKind, Path};
use crate::value::Value;

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use tracing::debug;

/// One cross-document lookup: an opaque reference string and the
/// slash-delimited path to fetch from the referenced document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefRequest {
    pub reference: String,
    pub path: String,
}

/// Dereferences reference strings embedded in documents.
///
/// Implemented over whatever service owns the object store. For a
/// non-wildcard path the implementation returns the nested value at that
/// path in the referenced document; for a wildcard path it returns the
/// referenced document's relevant branch, and the engine performs the
/// wildcard extraction itself.
pub trait DocumentResolver {
    fn resolve_reference(&self, reference: &str, path: &str) -> Result<Value>;

    /// Resolves a batch of lookups, one result per request, in order.
    ///
    /// The engine batches every reference lookup of one validation call
    /// into a single `resolve_references` call. Implementations backed by a
    /// remote store should override this with one multi-object fetch.
    fn resolve_references(&self, requests: &[RefRequest]) -> Result<Vec<Value>> {
        requests
            .iter()
            .map(|r| self.resolve_reference(&r.reference, &r.path))
            .collect()
    }
}

/// Evaluates expressions against one document.
///
/// Holds the document under validation, the external resolver for
/// cross-document expressions, and the values prefetched for them.
pub(crate) struct Resolver<'a> {
    document: &'a Value,
    external: &'a dyn DocumentResolver,
    fetched: BTreeMap<(String, String), Value>,
}

impl<'a> Resolver<'a> {
    pub fn new(document: &'a Value, external: &'a dyn DocumentResolver) -> Self {
        Self {
            document,
            external,
            fetched: BTreeMap::new(),
        }
    }

    /// Fetches every distinct cross-document lookup among `exprs` with one
    /// batched resolver call.
    pub fn prefetch<'e>(&mut self, exprs: impl Iterator<Item = &'e str>) -> Result<()> {
        let mut wanted = BTreeSet::new();
        for text in exprs {
            let expr = Expr::parse(text)?;
            if let ExprKind::CrossRef { field, path } = expr.kind() {
                if let Some(reference) = self.reference_target(&expr, field)? {
                    wanted.insert(RefRequest {
                        reference: reference.to_string(),
                        path: path.slash_path(),
                    });
                }
            }
        }
        if wanted.is_empty() {
            return Ok(());
        }

        let requests: Vec<RefRequest> = wanted.into_iter().collect();
        let values = self.external.resolve_references(&requests).map_err(|e| {
            let references: Vec<&str> = requests.iter().map(|r| r.reference.as_str()).collect();
            let paths: Vec<&str> = requests.iter().map(|r| r.path.as_str()).collect();
            ConstraintError::resolution(&references.join(","), &paths.join(","), e.to_string())
        })?;
        if values.len() != requests.len() {
            return Err(ConstraintError::resolution(
                "",
                "",
                format!(
                    "resolver returned {} values for {} requests",
                    values.len(),
                    requests.len()
                ),
            ));
        }
        for (request, value) in requests.into_iter().zip(values) {
            self.fetched.insert((request.reference, request.path), value);
        }
        Ok(())
    }

    /// Resolves one expression to its value list.
    ///
    /// A legitimately absent field yields an empty list; a structural
    /// mismatch (descending through a scalar, a non-mapping under
    /// `values(...)`) is a hard error.
    pub fn resolve(&self, expr: &Expr) -> Result<Vec<Value>> {
        let values = match expr.kind() {
            ExprKind::Literal(items) => items.iter().map(|s| Value::from(s.as_str())).collect(),
            ExprKind::Values(path) => self.mapping_values(expr, path)?,
            ExprKind::Path(path) => coerce_list(self.walk(expr, path)?),
            ExprKind::CrossRef { field, path } => self.resolve_cross_ref(expr, field, path)?,
        };
        let sample = &values[..values.len().min(20)];
        debug!(expr = %expr, count = values.len(), sample = ?sample, "resolved expression");
        Ok(values)
    }

    /// Descends the document one attribute per path segment. A missing
    /// attribute short-circuits to `Undefined`; a present non-mapping in
    /// the middle of the path is a structural mismatch.
    fn walk(&self, expr: &Expr, path: &Path) -> Result<&Value> {
        let mut current = self.document;
        for segment in path.segments() {
            match current {
                Value::Undefined => return Ok(&Value::Undefined),
                Value::Object(_) => current = &current[segment.as_str()],
                _ => {
                    return Err(ConstraintError::expression(
                        expr.text(),
                        format!("cannot descend into non-mapping value at `{segment}`"),
                    ))
                }
            }
        }
        Ok(current)
    }

    fn mapping_values(&self, expr: &Expr, path: &Path) -> Result<Vec<Value>> {
        match self.walk(expr, path)? {
            Value::Undefined | Value::Null => Ok(vec![]),
            Value::Object(fields) => Ok(fields.values().cloned().collect()),
            _ => Err(ConstraintError::expression(
                expr.text(),
                format!("`{path}` is not a mapping"),
            )),
        }
    }

    /// The reference string held by the expression's reference field, or
    /// `None` when the field is absent or empty (the vacuous case).
    fn reference_target(&self, expr: &Expr, field: &str) -> Result<Option<&str>> {
        match &self.document[field] {
            Value::Undefined | Value::Null => Ok(None),
            Value::String(s) if s.is_empty() => Ok(None),
            Value::String(s) => Ok(Some(s.as_ref())),
            _ => Err(ConstraintError::expression(
                expr.text(),
                format!("reference field `{field}` must hold a reference string"),
            )),
        }
    }

    fn resolve_cross_ref(&self, expr: &Expr, field: &str, path: &Path) -> Result<Vec<Value>> {
        let Some(reference) = self.reference_target(expr, field)? else {
            return Ok(vec![]);
        };

        let slash_path = path.slash_path();
        let fetched_now;
        let fetched = match self.fetched.get(&(reference.to_string(), slash_path.clone())) {
            Some(value) => value,
            None => {
                fetched_now = self
                    .external
                    .resolve_reference(reference, &slash_path)
                    .map_err(|e| {
                        ConstraintError::resolution(reference, &slash_path, e.to_string())
                    })?;
                &fetched_now
            }
        };

        if path.has_wildcard() {
            self.extract_wildcard(expr, fetched, path)
        } else {
            Ok(coerce_list(fetched))
        }
    }

    /// Pulls `leaf-key` out of each element of the array at `array-field`
    /// in the fetched branch. Expression parsing has already pinned the
    /// path shape to exactly `array-field.[*].leaf-key`.
    fn extract_wildcard(&self, expr: &Expr, branch: &Value, path: &Path) -> Result<Vec<Value>> {
        let array_field = &path.segments()[0];
        let leaf_key = &path.segments()[2];
        match &branch[array_field.as_str()] {
            Value::Undefined | Value::Null => Ok(vec![]),
            Value::Array(items) => {
                let mut values = vec![];
                for item in items.iter() {
                    match &item[leaf_key.as_str()] {
                        Value::Undefined | Value::Null => continue,
                        v => values.push(v.clone()),
                    }
                }
                Ok(values)
            }
            _ => Err(ConstraintError::expression(
                expr.text(),
                format!("wildcard field `{array_field}` is not an array"),
            )),
        }
    }
}

/// The list form of a resolved value: an array contributes its elements, a
/// mapping its keys, an absent value nothing, and a scalar itself.
fn coerce_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Undefined | Value::Null => vec![],
        Value::Array(items) => items.iter().cloned().collect(),
        Value::Object(fields) => fields.keys().cloned().collect(),
        other => vec![other.clone()],
    }
}
