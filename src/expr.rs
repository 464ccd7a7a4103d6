// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::ConstraintError;

use core::fmt;
use std::rc::Rc;

use anyhow::Result;

/// The wildcard path segment in cross-document references.
pub const WILDCARD: &str = "[*]";

/// A dotted attribute path (`data.row_ids`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    fn parse(expr: &str, text: &str) -> Result<Path> {
        if text.is_empty() {
            return Err(ConstraintError::expression(expr, "empty path"));
        }
        let segments: Vec<String> = text.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ConstraintError::expression(expr, "empty path segment"));
        }
        Ok(Path { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The first segment, i.e. the top-level document field the path enters.
    pub fn first(&self) -> &str {
        &self.segments[0]
    }

    pub fn has_wildcard(&self) -> bool {
        self.segments.iter().any(|s| s == WILDCARD)
    }

    /// Slash-delimited form handed to the document resolver
    /// (`features.[*].id` becomes `features/[*]/id`).
    pub fn slash_path(&self) -> String {
        self.segments.join("/")
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// The syntactic form of one value expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    /// `set(a,b,c)`: literal values, verbatim (no whitespace trimming).
    Literal(Vec<String>),
    /// `values(path.to.field)`: the value collection of the mapping at path.
    Values(Path),
    /// `field:included.path`: a path into the document referenced by the
    /// reference string held in the top-level `field` attribute.
    CrossRef { field: String, path: Path },
    /// Bare dotted path into the document.
    Path(Path),
}

/// One parsed value expression from a constraint declaration.
///
/// Keeps the source text alongside the parsed form so violation records can
/// quote expressions exactly as they appear in the type description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    text: Rc<str>,
    kind: ExprKind,
}

impl Expr {
    /// Parses an expression string, dispatching on its prefix.
    ///
    /// The forms are mutually exclusive and tried in priority order:
    /// `set(` literal, `values(` mapping values, `:` cross-reference, then
    /// bare dotted path.
    pub fn parse(text: &str) -> Result<Expr> {
        let kind = Self::parse_kind(text)?;
        Ok(Expr {
            text: text.into(),
            kind,
        })
    }

    fn parse_kind(text: &str) -> Result<ExprKind> {
        if text.is_empty() {
            return Err(ConstraintError::expression(text, "empty expression"));
        }

        if let Some(rest) = text.strip_prefix("set(") {
            let inner = rest
                .strip_suffix(')')
                .ok_or_else(|| ConstraintError::expression(text, "unbalanced parentheses"))?;
            let items = inner.split(',').map(str::to_string).collect();
            return Ok(ExprKind::Literal(items));
        }

        if let Some(rest) = text.strip_prefix("values(") {
            let inner = rest
                .strip_suffix(')')
                .ok_or_else(|| ConstraintError::expression(text, "unbalanced parentheses"))?;
            let path = Path::parse(text, inner)?;
            if path.has_wildcard() {
                return Err(ConstraintError::expression(
                    text,
                    "wildcard is only supported in cross-document references",
                ));
            }
            return Ok(ExprKind::Values(path));
        }

        if let Some((field, included)) = text.split_once(':') {
            if field.is_empty() {
                return Err(ConstraintError::expression(text, "empty reference field"));
            }
            let path = Path::parse(text, included)?;
            // Wildcard extraction only works for two-level nested data.
            if path.has_wildcard()
                && !(path.segments().len() == 3 && path.segments()[1] == WILDCARD)
            {
                return Err(ConstraintError::expression(
                    text,
                    "wildcard extraction is only supported for `array-field.[*].leaf-key` patterns",
                ));
            }
            return Ok(ExprKind::CrossRef {
                field: field.to_string(),
                path,
            });
        }

        let path = Path::parse(text, text)?;
        if path.has_wildcard() {
            return Err(ConstraintError::expression(
                text,
                "wildcard is only supported in cross-document references",
            ));
        }
        Ok(ExprKind::Path(path))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    /// The top-level document field this expression reads, if any.
    ///
    /// Constraint filtering uses this to decide whether a `contains` spec is
    /// applicable to a document. Literals read no document field.
    pub fn document_key(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Literal(_) => None,
            ExprKind::Values(path) | ExprKind::Path(path) => Some(path.first()),
            ExprKind::CrossRef { field, .. } => Some(field),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}
