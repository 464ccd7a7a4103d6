// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mining typed-object spec definitions for generics fields.
//!
//! Matrix-like objects declare their numeric payload with a generics value
//! type (`FloatMatrix2D data;`) inside a `structure { ... }` block. These
//! helpers locate that block in a raw spec definition and map each field
//! holding a generics value, so callers know where a fetched object keeps
//! its tabular data.

use std::collections::BTreeMap;

use anyhow::{bail, Result};

/// Recognized generics value types. Extend this list (and the callers that
/// interpret each type's payload) when a new generics type is added.
pub const GENERICS_TYPES: [&str; 1] = ["FloatMatrix2D"];

/// The bare type name inside a full object type string:
/// `KBaseMatrices.ExpressionMatrix-3.0` yields `ExpressionMatrix`.
pub fn short_type_name(obj_type: &str) -> Result<&str> {
    let Some(dot) = obj_type.find('.') else {
        bail!("`{obj_type}` has no module separator");
    };
    let Some(dash) = obj_type.rfind('-') else {
        bail!("`{obj_type}` has no version separator");
    };
    if dash <= dot + 1 {
        bail!("`{obj_type}` is not a `Module.Type-Version` type string");
    }
    Ok(&obj_type[dot + 1..dash])
}

/// Extracts the `structure { ... }` body text declaring `obj_type` from a
/// raw spec definition: everything between the last `structure` keyword
/// preceding the type's closing `Name;` and that marker.
pub fn structure_body(obj_type: &str, spec_def: &str) -> Result<String> {
    let name = short_type_name(obj_type)?;
    let marker = format!("{name};");
    let Some(head) = spec_def.split(&marker).next().filter(|h| h.len() < spec_def.len()) else {
        bail!("cannot locate type `{name}` in spec definition");
    };
    let body = head.rsplit("structure").next().unwrap_or(head);
    Ok(body.trim().to_string())
}

/// Maps field name to generics type for every generics-typed field declared
/// in a structure body. Errors when the body declares none.
pub fn generics_fields(body: &str) -> Result<BTreeMap<String, String>> {
    let mut fields = BTreeMap::new();
    for generics_type in GENERICS_TYPES {
        for declaration in body.split(generics_type).skip(1) {
            let decl = declaration.split(';').next().unwrap_or("").trim();
            if let Some(field) = decl.split_whitespace().last() {
                fields.insert(field.to_string(), generics_type.to_string());
            }
        }
    }
    if fields.is_empty() {
        bail!("no generics-typed field found in structure body");
    }
    Ok(fields)
}
