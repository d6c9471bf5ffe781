//! Option-mode selection and static option filtering.
//!
//! A selectable field resolves its options in exactly one mode, picked by
//! priority: remote fetch when an endpoint is configured, else filtering of
//! the static list by the parent field's value, else the static list as is.
//! The async remote path lives in the runtime crate; everything here is pure.

use std::collections::BTreeMap;

use crate::config::{FieldConfig, FieldOption};
use crate::types::Value;

/// Record key holding the option label when `labelKey` is not set.
pub const DEFAULT_LABEL_KEY: &str = "label";
/// Record key holding the option value when `valueKey` is not set.
pub const DEFAULT_VALUE_KEY: &str = "value";
/// Query parameter carrying the parent key when `parentKeyName` is not set.
pub const DEFAULT_PARENT_KEY_NAME: &str = "parentId";

/// How a field's option list is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionMode {
    /// Fetched from `target`.
    Remote {
        /// Endpoint from `props.apiTarget`.
        target: String,
    },
    /// Static options filtered by the parent field's key.
    DependentStatic {
        /// Name of the parent field.
        parent: String,
    },
    /// Static options shown unfiltered.
    Standalone,
}

impl OptionMode {
    /// Picks the mode for `field`.
    #[must_use]
    pub fn for_field(field: &FieldConfig) -> Self {
        if let Some(target) = field.props.api_target.as_deref().filter(|t| !t.is_empty()) {
            return Self::Remote {
                target: target.to_string(),
            };
        }
        match &field.depends_on {
            Some(parent) => Self::DependentStatic {
                parent: parent.clone(),
            },
            None => Self::Standalone,
        }
    }

    /// Whether options come from the network.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

/// Normalizes a parent value to its lookup key.
///
/// Objects reduce to `value`, then `id`; primitives stringify. `null`, the
/// empty string and undefined have no key.
#[must_use]
pub fn parent_key(parent_value: Option<&Value>) -> Option<String> {
    parent_value.and_then(Value::key_string)
}

/// Static options grouped by the key of their `parent_id`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticOptionIndex {
    groups: BTreeMap<String, Vec<FieldOption>>,
}

impl StaticOptionIndex {
    /// Groups `options`. Options without a parent are not indexed.
    #[must_use]
    pub fn new(options: &[FieldOption]) -> Self {
        let mut groups: BTreeMap<String, Vec<FieldOption>> = BTreeMap::new();
        for option in options {
            if let Some(key) = option.parent_id.as_ref().and_then(Value::key_string) {
                groups.entry(key).or_default().push(option.clone());
            }
        }
        Self { groups }
    }

    /// Options belonging to `parent_key`.
    #[must_use]
    pub fn get(&self, parent_key: &str) -> &[FieldOption] {
        self.groups.get(parent_key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct parent keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no option carries a parent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Options to display for a non-remote field given its parent's value.
///
/// A dependent field without a parent key shows nothing. Remote fields
/// return an empty list; their options come from the resolver.
#[must_use]
pub fn static_display_options(field: &FieldConfig, parent_value: Option<&Value>) -> Vec<FieldOption> {
    match OptionMode::for_field(field) {
        OptionMode::Remote { .. } => Vec::new(),
        OptionMode::DependentStatic { .. } => match parent_key(parent_value) {
            Some(key) => StaticOptionIndex::new(field.option_list()).get(&key).to_vec(),
            None => Vec::new(),
        },
        OptionMode::Standalone => field.option_list().to_vec(),
    }
}

/// Converts a remote record into an option using the configured keys.
///
/// The label is the display string of `record[label_key]`, falling back to
/// the value's, and the value is `record[value_key]` as is. Returns `None`
/// for non-object records and for records without a value.
#[must_use]
pub fn option_from_record(record: &Value, label_key: &str, value_key: &str) -> Option<FieldOption> {
    let map = record.as_map()?;
    let value = map.get(value_key)?.clone();
    let label = map
        .get(label_key)
        .unwrap_or(&value)
        .to_string();
    Some(FieldOption {
        label,
        value,
        parent_id: None,
    })
}

/// Whether `value` (or every element of a multi value) appears among
/// `options`, comparing lookup keys.
#[must_use]
pub fn value_is_listed(value: &Value, options: &[FieldOption]) -> bool {
    let listed = |v: &Value| {
        v.key_string()
            .is_some_and(|key| options.iter().any(|o| o.value.key_string().as_deref() == Some(&key)))
    };
    match value {
        Value::Array(items) => items.iter().all(listed),
        other => listed(other),
    }
}
