// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::cmp::Ordering;

use serde::ser::Serializer;
use serde::Serialize;

/// A numeric document value.
///
/// Wraps an `f64` with a total order (`f64::total_cmp`) so that numeric
/// values can participate in `BTreeMap` keys and `BTreeSet` membership the
/// same way every other [`crate::Value`] variant does.
#[derive(Debug, Clone, Copy)]
pub struct Number(f64);

impl Number {
    pub fn as_f64(&self) -> f64 {
        self.0
    }

    /// True if the value is finite and has no fractional part.
    pub fn is_integer(&self) -> bool {
        self.0.is_finite() && self.0.fract() == 0.0
    }

    pub fn as_i64(&self) -> Option<i64> {
        if self.is_integer() && self.0 >= i64::MIN as f64 && self.0 <= i64::MAX as f64 {
            Some(self.0 as i64)
        } else {
            None
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for Number {}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<f64> for Number {
    fn from(n: f64) -> Self {
        Number(n)
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Number(n as f64)
    }
}

impl From<u64> for Number {
    fn from(n: u64) -> Self {
        Number(n as f64)
    }
}

impl From<usize> for Number {
    fn from(n: usize) -> Self {
        Number(n as f64)
    }
}

impl Serialize for Number {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Integral values serialize without a fractional part.
        match self.as_i64() {
            Some(i) => serializer.serialize_i64(i),
            None => serializer.serialize_f64(self.0),
        }
    }
}
