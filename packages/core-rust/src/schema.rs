//! Schema factory: synthesizes an aggregate validation schema from field configs.

use chrono::NaiveDate;

use crate::bricks::{Constraint, SelectBrick, ValidationKind};
use crate::config::FieldConfig;
use crate::types::{ErrorMap, FieldError, FormValues};

/// Aggregate schema for a form: one constraint per configured field.
#[derive(Debug, Clone)]
pub struct FormSchema {
    /// Field schemas in config order.
    pub fields: Vec<FieldSchema>,
}

/// Constraint bound to a single field.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    /// Name of the field.
    pub name: String,
    /// Whether the schema layer enforces presence.
    pub required: bool,
    /// Whether the field was relaxed because it has a visibility condition.
    pub conditional: bool,
    /// The composed constraint.
    pub constraint: Constraint,
}

/// Result of validating a value set against a [`FormSchema`].
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    /// Every field conforms. Carries the transformed output values.
    Valid {
        /// Output values; undeclared keys pass through untouched.
        values: FormValues,
    },
    /// One or more fields failed.
    Invalid {
        /// First failure message per field.
        errors: ErrorMap,
    },
}

impl ValidationResult {
    /// Whether validation passed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

/// Builds the aggregate schema for `configs`, resolving dates against today.
#[must_use]
pub fn build_schema(configs: &[FieldConfig]) -> FormSchema {
    build_schema_at(configs, chrono::Local::now().date_naive())
}

/// Builds the aggregate schema for `configs` with an explicit reference day.
///
/// For each field the brick is picked by validation kind. The required
/// variant is used only for `required` fields without a visibility
/// condition; a conditional field's requiredness is left to the manual layer
/// of smart submit, and its constraint is widened to accept undefined,
/// `null` and the empty string.
#[must_use]
pub fn build_schema_at(configs: &[FieldConfig], today: NaiveDate) -> FormSchema {
    let fields = configs
        .iter()
        .map(|field| field_schema(field, today))
        .collect();
    FormSchema { fields }
}

fn field_schema(field: &FieldConfig, today: NaiveDate) -> FieldSchema {
    let required = field.required && field.visible_if.is_none();
    let params = field.brick_params(today);
    let brick = field.validation_kind.brick();

    let mut constraint = if field.validation_kind == ValidationKind::Select && params.options.is_empty() {
        // No declared values to match against.
        SelectBrick::any_choice(&field.label, required)
    } else if required {
        brick.required(&field.label, &params)
    } else {
        brick.optional(&params)
    };

    if field.visible_if.is_some() {
        constraint = constraint.relaxed();
    }

    FieldSchema {
        name: field.name.clone(),
        required,
        conditional: field.visible_if.is_some(),
        constraint,
    }
}

impl FormSchema {
    /// Looks up the schema of one field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validates a whole value set.
    #[must_use]
    pub fn validate(&self, values: &FormValues) -> ValidationResult {
        let mut output = values.clone();
        let mut errors = ErrorMap::new();
        for field in &self.fields {
            match field.constraint.validate(values.get(&field.name)) {
                Ok(parsed) => {
                    output.set(&field.name, parsed);
                }
                Err(message) => errors.insert(field.name.clone(), FieldError::schema(message)),
            }
        }
        if errors.is_empty() {
            ValidationResult::Valid { values: output }
        } else {
            ValidationResult::Invalid { errors }
        }
    }

    /// Validates a single field, returning its error if any.
    ///
    /// Fields not declared in the schema always pass.
    #[must_use]
    pub fn validate_field(&self, name: &str, values: &FormValues) -> Option<FieldError> {
        let field = self.field(name)?;
        field
            .constraint
            .validate(values.get(name))
            .err()
            .map(FieldError::schema)
    }
}
