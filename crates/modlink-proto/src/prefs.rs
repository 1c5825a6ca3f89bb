//! Typed values held by a remote preference group.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Point-in-time contents of one preference group, keyed by preference
/// name.
pub type PrefsMap = HashMap<String, PrefValue>;

/// A single typed preference value.
///
/// The remote store is type-preserving: a value written as an integer
/// comes back as an integer, never coerced. Readers that ask for the
/// wrong type see absence, not a converted value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PrefValue {
    /// Boolean flag.
    Bool(bool),
    /// 64-bit integer.
    Int(i64),
    /// 64-bit floating-point number.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Set of unique strings, held in sorted order.
    StrSet(BTreeSet<String>),
}

impl PrefValue {
    /// The boolean payload, if this value is a boolean.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The integer payload, if this value is an integer.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The floating-point payload, if this value is a float.
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// The string payload, if this value is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// The string-set payload, if this value is a string set.
    #[must_use]
    pub fn as_str_set(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::StrSet(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for PrefValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for PrefValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for PrefValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for PrefValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for PrefValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<BTreeSet<String>> for PrefValue {
    fn from(v: BTreeSet<String>) -> Self {
        Self::StrSet(v)
    }
}

// =============================================================================
// Tests
// =============================================================================
