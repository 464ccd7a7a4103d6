// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use anyhow::Result;
use constrix::*;
use pretty_assertions::assert_eq;

#[test]
fn constructors() -> Result<()> {
    assert_eq!(Value::new_object(), Value::from_json_str("{}")?);
    assert_eq!(Value::new_array(), Value::from_json_str("[]")?);
    Ok(())
}

#[test]
fn serialize_number() -> Result<()> {
    // Check that integer values are serialized without fractional part
    assert_eq!(serde_json::to_string_pretty(&Value::from(1.0))?, "1");
    assert_eq!(serde_json::to_string_pretty(&Value::from(-1.0))?, "-1");

    // Ensure that fractional parts are also serialized.
    assert_eq!(serde_json::to_string_pretty(&Value::from(1.1))?, "1.1");
    assert_eq!(serde_json::to_string_pretty(&Value::from(-1.1))?, "-1.1");

    Ok(())
}

#[test]
fn serialize_string() -> Result<()> {
    assert_eq!(
        Value::String("Hello, World\n".into()).to_json_str()?,
        "\"Hello, World\\n\""
    );
    Ok(())
}

#[test]
fn serialize_undefined() -> Result<()> {
    assert_eq!(Value::Undefined.to_json_str()?, "\"<undefined>\"");
    Ok(())
}

#[test]
fn value_as_index() -> Result<()> {
    let idx = Value::from(2.0);

    let mut item = Value::new_array();
    item.as_array_mut()?.push(Value::from(3.0));
    item.as_array_mut()?.push(Value::from(4.0));
    item.as_array_mut()?.push(Value::from(5.0));

    // Check case of item present.
    assert_eq!(&Value::from_json_str("[1, 2, [3, 4, 5]]")?[&idx], &item);

    // Check case of item not present.
    let idx = Value::from(5.0);
    assert_eq!(
        &Value::from_json_str("[1, 2, [3, 4, 5]]")?[&idx],
        &Value::Undefined
    );

    // Check case of non indexable item.
    assert_eq!(&Value::Undefined[&idx], &Value::Undefined);
    assert_eq!(&Value::Null[&idx], &Value::Undefined);
    assert_eq!(&Value::Bool(true)[&idx], &Value::Undefined);
    assert_eq!(&Value::String("Hello".into())[&idx], &Value::Undefined);

    Ok(())
}

#[test]
fn string_as_index() -> Result<()> {
    let obj = Value::from_json_str(r#"{ "a" : 5, "b" : 6 }"#)?;
    assert_eq!(&obj["a"], &Value::from(5.0));
    assert_eq!(&obj["b".to_owned()], &Value::from(6.0));
    assert_eq!(&obj["c"], &Value::Undefined);
    Ok(())
}

#[test]
fn non_string_keys_serialize_as_json() -> Result<()> {
    let mut obj = Value::new_object();
    obj.as_object_mut()?.insert(Value::from(1.0), Value::Null);
    obj.as_object_mut()?
        .insert(Value::Bool(false), Value::Null);

    let json = serde_json::to_string(&obj)?;
    assert_eq!(json, r#"{"false":null,"1":null}"#);
    Ok(())
}

#[test]
fn has_field() -> Result<()> {
    let doc = Value::from_json_str(r#"{"row_mapping": {"r1": "i1"}, "empty": null}"#)?;
    assert!(doc.has_field("row_mapping"));
    assert!(doc.has_field("empty"));
    assert!(!doc.has_field("col_mapping"));

    // Only objects have fields.
    assert!(!Value::from_json_str("[1, 2]")?.has_field("0"));
    Ok(())
}

#[test]
fn without_empty_fields() -> Result<()> {
    let doc = Value::from_json_str(
        r#"{
            "name": "matrix",
            "description": "",
            "row_mapping": {},
            "col_mapping": {"c1": "i1"},
            "attributes": [],
            "count": 0,
            "flag": false,
            "genome_ref": null
        }"#,
    )?;

    let stripped = doc.without_empty_fields();
    assert_eq!(
        stripped,
        Value::from_json_str(r#"{"name": "matrix", "col_mapping": {"c1": "i1"}}"#)?
    );

    // The original document is untouched.
    assert!(doc.has_field("row_mapping"));

    // Non-objects pass through unchanged.
    assert_eq!(Value::Null.without_empty_fields(), Value::Null);
    Ok(())
}
