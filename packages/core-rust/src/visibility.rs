//! Conditional visibility rules.
//!
//! A field carrying a [`VisibilityCondition`] is shown only while the
//! condition holds against the live value of the field it references.
//! [`evaluate`] is a pure function so it can run outside any render pass.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::FieldConfig;
use crate::types::{FormValues, Value};

/// Comparison operator of a visibility condition.
///
/// Lowercase variant names match the config tags exactly. Any other tag
/// deserializes to [`Operator::Unknown`], which never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Strict equality with the literal.
    Eq,
    /// Strict inequality with the literal.
    Ne,
    /// Numeric greater-than after coercing both sides.
    Gt,
    /// Numeric less-than after coercing both sides.
    Lt,
    /// The watched value is an array containing the literal.
    Includes,
    /// Unrecognized operator tag.
    #[serde(other)]
    Unknown,
}

/// Condition under which a field is visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityCondition {
    /// Name of the field whose value is watched.
    pub field: String,
    /// How the watched value is compared.
    pub operator: Operator,
    /// Literal the watched value is compared against.
    pub value: Value,
}

impl VisibilityCondition {
    /// Creates a condition.
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

/// Evaluates `condition` against the watched value.
///
/// `watched` is `None` when the referenced field has no value at all.
/// Unknown operators fail closed: the field stays hidden.
#[must_use]
pub fn evaluate(condition: &VisibilityCondition, watched: Option<&Value>) -> bool {
    let literal = &condition.value;
    match condition.operator {
        Operator::Eq => watched.is_some_and(|w| w.strict_eq(literal)),
        Operator::Ne => !watched.is_some_and(|w| w.strict_eq(literal)),
        Operator::Gt => coerce(watched) > literal.to_number(),
        Operator::Lt => coerce(watched) < literal.to_number(),
        Operator::Includes => watched
            .and_then(Value::as_array)
            .is_some_and(|items| items.iter().any(|item| item.strict_eq(literal))),
        Operator::Unknown => false,
    }
}

/// Evaluates an optional condition; fields without one are always visible.
#[must_use]
pub fn is_visible(condition: Option<&VisibilityCondition>, watched: Option<&Value>) -> bool {
    condition.map_or(true, |c| evaluate(c, watched))
}

/// Names of the fields in `fields` that are hidden under `values`.
///
/// A condition watching a hidden field sees no value, so hiding cascades
/// down chains of conditions regardless of config order. Cyclic
/// conditions stop after one pass per field.
#[must_use]
pub fn hidden_fields(fields: &[FieldConfig], values: &FormValues) -> BTreeSet<String> {
    let mut hidden = BTreeSet::new();
    for _ in 0..=fields.len() {
        let next: BTreeSet<String> = fields
            .iter()
            .filter(|field| {
                let watched = field
                    .visible_if
                    .as_ref()
                    .filter(|c| !hidden.contains(&c.field))
                    .and_then(|c| values.get(&c.field));
                !is_visible(field.visible_if.as_ref(), watched)
            })
            .map(|field| field.name.clone())
            .collect();
        if next == hidden {
            break;
        }
        hidden = next;
    }
    hidden
}

// An undefined watched value coerces to NaN, so every numeric comparison fails.
fn coerce(watched: Option<&Value>) -> f64 {
    watched.map_or(f64::NAN, Value::to_number)
}
