// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{anyhow, bail, Result};
use constrix::*;
use serde::{Deserialize, Serialize};
use test_generator::test_resources;

const DEFAULT_TYPE: &str = "KBaseMatrices.ExpressionMatrix-3.0";

/// Type descriptions served from a map.
struct StaticTypes(BTreeMap<String, String>);

impl TypeProvider for StaticTypes {
    fn type_description(&self, type_name: &str) -> Result<String> {
        self.0
            .get(type_name)
            .cloned()
            .ok_or_else(|| anyhow!("unknown type `{type_name}`"))
    }
}

/// Referenced documents served from a map. Counts batched lookups so tests
/// can assert that one validation performs one external round trip.
struct StaticDocuments {
    documents: BTreeMap<String, Value>,
    batch_calls: Rc<Cell<usize>>,
}

impl DocumentResolver for StaticDocuments {
    fn resolve_reference(&self, reference: &str, path: &str) -> Result<Value> {
        let Some(doc) = self.documents.get(reference) else {
            bail!("no object with reference `{reference}`");
        };
        if path.contains("[*]") {
            // Wildcard lookups get the whole branch; the engine extracts.
            return Ok(doc.clone());
        }
        let mut current = doc;
        for segment in path.split('/') {
            current = &current[segment];
        }
        Ok(current.clone())
    }

    fn resolve_references(&self, requests: &[RefRequest]) -> Result<Vec<Value>> {
        self.batch_calls.set(self.batch_calls.get() + 1);
        requests
            .iter()
            .map(|r| self.resolve_reference(&r.reference, &r.path))
            .collect()
    }
}

fn build_engine(
    obj_type: &str,
    description: &str,
    refs: Option<&Value>,
) -> Result<(Engine, Rc<Cell<usize>>)> {
    let mut types = BTreeMap::new();
    types.insert(obj_type.to_string(), description.to_string());

    let mut documents = BTreeMap::new();
    if let Some(refs) = refs {
        for (reference, doc) in refs.as_object()? {
            documents.insert(reference.as_string()?.to_string(), doc.clone());
        }
    }

    let batch_calls = Rc::new(Cell::new(0));
    let engine = Engine::new(
        Box::new(StaticTypes(types)),
        Box::new(StaticDocuments {
            documents,
            batch_calls: batch_calls.clone(),
        }),
    );
    Ok((engine, batch_calls))
}

#[derive(Serialize, Deserialize, Debug)]
struct TestCase {
    note: String,
    obj_type: Option<String>,
    description: String,
    data: Value,
    refs: Option<Value>,
    want_validated: Option<bool>,
    want_failed: Option<Value>,
    error: Option<String>,
    skip: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn eval_case(case: &TestCase) -> Result<ValidationOutcome> {
    let obj_type = case.obj_type.as_deref().unwrap_or(DEFAULT_TYPE);
    let (engine, _) = build_engine(obj_type, &case.description, case.refs.as_ref())?;
    engine.validate(obj_type, &case.data)
}

fn yaml_test_impl(file: &str) -> Result<()> {
    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    println!("running {file}");

    for case in &test.cases {
        print!("case {} ", case.note);
        if case.skip == Some(true) {
            println!("skipped");
            continue;
        }

        match eval_case(case) {
            Ok(outcome) => {
                if let Some(expected) = &case.error {
                    bail!("validation succeeded but an error containing `{expected}` was expected");
                }
                if let Some(want) = case.want_validated {
                    if outcome.validated != want {
                        bail!("validated is {} but {} was expected", outcome.validated, want);
                    }
                }
                if let Some(want_failed) = &case.want_failed {
                    let computed = Value::from_json_str(&serde_json::to_string(
                        &outcome.failed_constraints,
                    )?)?;
                    if &computed != want_failed {
                        bail!(
                            "failed constraints mismatch:\nleft  = {}\nright = {}",
                            computed.to_json_str()?,
                            want_failed.to_json_str()?
                        );
                    }
                }
            }
            Err(actual) => match &case.error {
                Some(expected) => {
                    let actual = actual.to_string();
                    if !actual.contains(expected) {
                        bail!(
                            "Error message\n`{}`\ndoes not contain `{}`",
                            actual,
                            expected
                        );
                    }
                    println!("{actual}");
                }
                None => return Err(actual),
            },
        }

        println!("passed");
    }

    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // If Err is returned, it doesn't always get printed by cargo test.
            // Therefore, panic with the error.
            panic!("{}", e);
        }
    }
}

#[test_resources("tests/engine/cases/*.yaml")]
fn yaml_cases(resource: &str) {
    yaml_test(resource).unwrap();
}

#[test]
fn reference_lookups_are_batched() -> Result<()> {
    let description = r#"
        @contains values(row_mapping) row_attributemapping_ref:instances
        @contains values(col_mapping) col_attributemapping_ref:instances
    "#;
    let data = Value::from_json_str(
        r#"{
            "row_mapping": {"r1": "i1"},
            "col_mapping": {"c1": "i1"},
            "row_attributemapping_ref": "55/1/2",
            "col_attributemapping_ref": "55/1/2"
        }"#,
    )?;
    let refs = Value::from_json_str(r#"{"55/1/2": {"instances": {"i1": ["x"]}}}"#)?;

    let (engine, batch_calls) = build_engine(DEFAULT_TYPE, description, Some(&refs))?;
    let outcome = engine.validate(DEFAULT_TYPE, &data)?;

    assert!(outcome.validated);
    // Both cross references resolve through one batched call.
    assert_eq!(batch_calls.get(), 1);
    Ok(())
}

#[test]
fn no_lookup_without_cross_references() -> Result<()> {
    let data = Value::from_json_str(r#"{"data": {"row_ids": ["r1"]}}"#)?;
    let (engine, batch_calls) = build_engine(DEFAULT_TYPE, "@unique data.row_ids", None)?;
    engine.validate(DEFAULT_TYPE, &data)?;
    assert_eq!(batch_calls.get(), 0);
    Ok(())
}

#[test]
fn validation_is_deterministic() -> Result<()> {
    let description = r#"
        @unique data.row_ids
        @unique data.col_ids
        @contains data.row_ids row_mapping
    "#;
    let data = Value::from_json_str(
        r#"{
            "data": {"row_ids": ["a", "a"], "col_ids": ["c", "c"]},
            "row_mapping": {"a": "i1"}
        }"#,
    )?;

    let (engine, _) = build_engine(DEFAULT_TYPE, description, None)?;
    let first = engine.validate(DEFAULT_TYPE, &data)?;
    let second = engine.validate(DEFAULT_TYPE, &data)?;
    assert_eq!(first, second);
    assert_eq!(
        first.failed_constraints.unique,
        vec!["data.row_ids", "data.col_ids"]
    );
    Ok(())
}

#[test]
fn missing_type_is_a_schema_error() -> Result<()> {
    let (engine, _) = build_engine(DEFAULT_TYPE, "@unique data.row_ids", None)?;
    let err = engine
        .validate("KBaseMatrices.FitnessMatrix-1.0", &Value::new_object())
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConstraintError>(),
        Some(ConstraintError::Schema { .. })
    ));
    Ok(())
}

#[test]
fn malformed_expression_is_an_expression_error() -> Result<()> {
    let data = Value::from_json_str(r#"{"data": {"row_ids": ["r1"]}}"#)?;
    let (engine, _) = build_engine(DEFAULT_TYPE, "@unique values(data.row_ids", None)?;
    let err = engine.validate(DEFAULT_TYPE, &data).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConstraintError>(),
        Some(ConstraintError::Expression { .. })
    ));
    Ok(())
}

#[test]
fn failed_fetch_is_a_resolution_error() -> Result<()> {
    let data = Value::from_json_str(
        r#"{"row_mapping": {"r1": "i1"}, "row_attributemapping_ref": "99/9/9"}"#,
    )?;
    let (engine, _) = build_engine(
        DEFAULT_TYPE,
        "@contains values(row_mapping) row_attributemapping_ref:instances",
        None,
    )?;
    let err = engine.validate(DEFAULT_TYPE, &data).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConstraintError>(),
        Some(ConstraintError::Resolution { .. })
    ));
    Ok(())
}
