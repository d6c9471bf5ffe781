//! Form controller: sole owner of field values, errors and interaction state.
//!
//! Validation follows the "on touched" policy: a field is validated when it
//! loses focus after interaction, and from then on re-validated on every
//! change. After the first submit every field re-validates on change.
//! Fields removed from the render tree are unregistered, which clears their
//! value so hidden fields never leak stale data into a submit.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::config::{default_values, FormDefinition};
use crate::schema::{build_schema, FormSchema};
use crate::types::{ErrorMap, FieldError, FormValues, Value};

/// Side effects requested alongside a programmatic value change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetValueOptions {
    /// Validate the field after setting it.
    pub should_validate: bool,
    /// Update the field's dirty flag.
    pub should_dirty: bool,
    /// Mark the field as touched.
    pub should_touch: bool,
}

/// Owns the state of one form instance.
#[derive(Debug, Clone)]
pub struct FormController {
    definition: Arc<FormDefinition>,
    schema: Arc<FormSchema>,
    defaults: FormValues,
    values: FormValues,
    errors: ErrorMap,
    dirty: BTreeSet<String>,
    touched: BTreeSet<String>,
    registered: BTreeSet<String>,
    submit_count: u32,
}

impl FormController {
    /// Creates a controller, building the schema from the definition.
    #[must_use]
    pub fn new(definition: FormDefinition) -> Self {
        let schema = build_schema(&definition.fields);
        Self::with_schema(definition, schema)
    }

    /// Creates a controller with a prebuilt schema.
    #[must_use]
    pub fn with_schema(definition: FormDefinition, schema: FormSchema) -> Self {
        let defaults = default_values(&definition.fields);
        Self {
            definition: Arc::new(definition),
            schema: Arc::new(schema),
            values: defaults.clone(),
            defaults,
            errors: ErrorMap::new(),
            dirty: BTreeSet::new(),
            touched: BTreeSet::new(),
            registered: BTreeSet::new(),
            submit_count: 0,
        }
    }

    /// Replaces the baseline values (e.g. a saved record opened for editing)
    /// and clears errors and interaction state.
    pub fn reset(&mut self, values: FormValues) {
        let mut baseline = default_values(&self.definition.fields);
        for (name, value) in values.iter() {
            baseline.insert(name.clone(), value.clone());
        }
        self.values = baseline.clone();
        self.defaults = baseline;
        self.errors.clear();
        self.dirty.clear();
        self.touched.clear();
        self.submit_count = 0;
    }

    /// The field configs this form was built from.
    #[must_use]
    pub fn definition(&self) -> &Arc<FormDefinition> {
        &self.definition
    }

    /// The aggregate schema.
    #[must_use]
    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    /// Current value of `name`.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// All current values.
    #[must_use]
    pub fn values(&self) -> &FormValues {
        &self.values
    }

    /// Current errors.
    #[must_use]
    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    /// Current error of `name`.
    #[must_use]
    pub fn error(&self, name: &str) -> Option<&FieldError> {
        self.errors.get(name)
    }

    /// Whether any field differs from its baseline.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Whether `name` differs from its baseline.
    #[must_use]
    pub fn is_field_dirty(&self, name: &str) -> bool {
        self.dirty.contains(name)
    }

    /// Whether `name` has lost focus after interaction.
    #[must_use]
    pub fn is_touched(&self, name: &str) -> bool {
        self.touched.contains(name)
    }

    /// Whether `name` is currently mounted.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.registered.contains(name)
    }

    /// Number of submit attempts since creation or the last reset.
    #[must_use]
    pub fn submit_count(&self) -> u32 {
        self.submit_count
    }

    /// A user edit. Re-validates the field once it has been touched or the
    /// form has been submitted.
    pub fn change(&mut self, name: &str, value: Option<Value>) {
        let revalidate = self.touched.contains(name) || self.submit_count > 0;
        self.set_value(
            name,
            value,
            SetValueOptions {
                should_validate: revalidate,
                should_dirty: true,
                should_touch: false,
            },
        );
    }

    /// The field lost focus: mark it touched and validate it.
    pub fn blur(&mut self, name: &str) {
        self.touched.insert(name.to_string());
        self.trigger(name);
    }

    /// Programmatic value change. `None` leaves the field undefined.
    pub fn set_value(&mut self, name: &str, value: Option<Value>, options: SetValueOptions) {
        self.values.set(name, value);
        if options.should_dirty {
            self.refresh_dirty(name);
        }
        if options.should_touch {
            self.touched.insert(name.to_string());
        }
        if options.should_validate {
            self.trigger(name);
        }
    }

    /// Validates one field against the schema, updating its error.
    /// Returns whether it passed.
    pub fn trigger(&mut self, name: &str) -> bool {
        match self.schema.validate_field(name, &self.values) {
            Some(error) => {
                self.errors.insert(name, error);
                false
            }
            None => {
                self.errors.remove(name);
                true
            }
        }
    }

    /// Records an error for `name`, replacing any existing one.
    pub fn set_error(&mut self, name: &str, error: FieldError) {
        self.errors.insert(name, error);
    }

    /// Removes the error of `name`.
    pub fn clear_error(&mut self, name: &str) {
        self.errors.remove(name);
    }

    /// Removes every error.
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Mounts `name`. A field re-mounting without a value gets its default
    /// back. Returns `true` if the field was not mounted before.
    pub fn register(&mut self, name: &str) -> bool {
        if !self.registered.insert(name.to_string()) {
            return false;
        }
        if !self.values.contains(name) {
            if let Some(default) = self.defaults.get(name).cloned() {
                self.values.insert(name, default);
            }
        }
        true
    }

    /// Unmounts `name`, clearing its value, error and interaction state.
    pub fn unregister(&mut self, name: &str) {
        self.registered.remove(name);
        if let Some(stale) = self.values.remove(name) {
            debug!(field = name, ?stale, "cleared value of unregistered field");
        }
        self.errors.remove(name);
        self.dirty.remove(name);
        self.touched.remove(name);
    }

    pub(crate) fn record_submit(&mut self) {
        self.submit_count = self.submit_count.saturating_add(1);
    }

    pub(crate) fn replace_errors(&mut self, errors: ErrorMap) {
        self.errors = errors;
    }

    fn refresh_dirty(&mut self, name: &str) {
        if self.values.get(name) == self.defaults.get(name) {
            self.dirty.remove(name);
        } else {
            self.dirty.insert(name.to_string());
        }
    }
}
