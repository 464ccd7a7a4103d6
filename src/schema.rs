// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::ConstraintError;

use anyhow::Result;

/// Source of type descriptions containing `@tag` constraint lines.
///
/// Implemented over whatever service owns type metadata; descriptions are
/// fetched fresh for every validation call.
pub trait TypeProvider {
    fn type_description(&self, type_name: &str) -> Result<String>;
}

/// The recognized constraint kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    Contains,
    ConditionallyRequired,
    /// Declared in type descriptions but never evaluated. Parsed so that
    /// descriptions carrying it remain loadable.
    RowSum,
}

impl ConstraintKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ConstraintKind::Unique => "unique",
            ConstraintKind::Contains => "contains",
            ConstraintKind::ConditionallyRequired => "conditionally_required",
            ConstraintKind::RowSum => "rowsum",
        }
    }

    fn from_tag(tag: &str) -> Option<ConstraintKind> {
        match tag {
            "unique" => Some(ConstraintKind::Unique),
            "contains" => Some(ConstraintKind::Contains),
            "conditionally_required" => Some(ConstraintKind::ConditionallyRequired),
            "rowsum" => Some(ConstraintKind::RowSum),
            _ => None,
        }
    }
}

/// One parsed `@tag ...` declaration: the ordered expression strings from
/// the remainder of the line.
///
/// For `contains` and `conditionally_required` the first expression is the
/// subject and the rest are references; `unique` has a single expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintSpec {
    exprs: Vec<String>,
}

impl ConstraintSpec {
    pub fn exprs(&self) -> &[String] {
        &self.exprs
    }

    pub fn subject(&self) -> &str {
        &self.exprs[0]
    }

    pub fn references(&self) -> &[String] {
        &self.exprs[1..]
    }

    /// The spec as it appeared in the description, used verbatim in
    /// violation records.
    pub fn joined(&self) -> String {
        self.exprs.join(" ")
    }
}

/// All constraint declarations parsed from one type description.
///
/// Every recognized kind is always present; a kind that does not appear in
/// the description has an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintSet {
    pub unique: Vec<ConstraintSpec>,
    pub contains: Vec<ConstraintSpec>,
    pub conditionally_required: Vec<ConstraintSpec>,
    pub rowsum: Vec<ConstraintSpec>,
}

impl ConstraintSet {
    /// Extracts constraint declarations from a type's free-text description.
    ///
    /// A line whose first token is `@unique`, `@contains`,
    /// `@conditionally_required` or `@rowsum` contributes one spec: the
    /// whitespace-tokenized remainder of the line. Lines with unknown tags
    /// and plain prose are ignored. Expression strings are not validated
    /// here; malformed expressions surface at resolution time.
    pub fn parse(type_name: &str, description: &str) -> Result<ConstraintSet> {
        let mut set = ConstraintSet::default();
        for line in description.lines() {
            let line = line.trim_start();
            let Some(rest) = line.strip_prefix('@') else {
                continue;
            };
            let mut tokens = rest.split_whitespace();
            let Some(tag) = tokens.next() else {
                continue;
            };
            let Some(kind) = ConstraintKind::from_tag(tag) else {
                continue;
            };
            let exprs: Vec<String> = tokens.map(str::to_string).collect();
            set.add(type_name, kind, exprs)?;
        }
        Ok(set)
    }

    fn add(&mut self, type_name: &str, kind: ConstraintKind, exprs: Vec<String>) -> Result<()> {
        let arity_ok = match kind {
            ConstraintKind::Unique => exprs.len() == 1,
            ConstraintKind::Contains | ConstraintKind::ConditionallyRequired => exprs.len() >= 2,
            ConstraintKind::RowSum => !exprs.is_empty(),
        };
        if !arity_ok {
            return Err(ConstraintError::schema(
                type_name,
                format!(
                    "`@{}` declaration with {} argument(s)",
                    kind.tag(),
                    exprs.len()
                ),
            ));
        }

        let specs = match kind {
            ConstraintKind::Unique => &mut self.unique,
            ConstraintKind::Contains => &mut self.contains,
            ConstraintKind::ConditionallyRequired => &mut self.conditionally_required,
            ConstraintKind::RowSum => &mut self.rowsum,
        };
        specs.push(ConstraintSpec { exprs });
        Ok(())
    }

    /// Total number of declarations, all kinds included.
    pub fn len(&self) -> usize {
        self.unique.len() + self.contains.len() + self.conditionally_required.len()
            + self.rowsum.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
