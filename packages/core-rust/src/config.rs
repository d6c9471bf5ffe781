//! Declarative field configuration.
//!
//! A form is described by an ordered list of [`FieldConfig`]s authored by the
//! integrator. The list is static: built once per form definition and read
//! only at runtime. Keys are camelCase to match the authored JSON.

use std::collections::{BTreeMap, HashSet};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::bricks::{BrickParams, PasswordMode, ValidationKind};
use crate::date::DateMode;
use crate::types::{FormValues, Value};
use crate::visibility::VisibilityCondition;

/// Widget kind tag. Unrecognized tags deserialize to [`UiKind::Unknown`] and
/// render as a text input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UiKind {
    Text,
    Dropdown,
    AsyncDropdown,
    Radio,
    Checkbox,
    Slider,
    Datetime,
    File,
    Location,
    #[serde(other)]
    Unknown,
}

/// A selectable option. `parent_id` links the option to a parent field's
/// value for cascading filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOption {
    /// Text shown to the user.
    pub label: String,
    /// Value stored in the form.
    pub value: Value,
    /// Value of the parent field this option belongs to.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_id: Option<Value>,
}

impl FieldOption {
    /// Creates a standalone option.
    pub fn new(label: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            parent_id: None,
        }
    }

    /// Links the option to a parent value.
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<Value>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

/// Field props. Known keys are typed; everything else is kept verbatim in
/// `extra` and handed to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldProps {
    /// Lower bound for Number fields.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub min: Option<f64>,
    /// Minimum age in years for Date fields.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub min_age: Option<u32>,
    /// Password policy or date display mode, depending on the field kind.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mode: Option<String>,
    /// Failure message for Agreed fields.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    /// Maximum number of files for File fields.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_files: Option<usize>,
    /// Remote option endpoint for dependent dropdowns.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub api_target: Option<String>,
    /// Record key holding an option's label.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub label_key: Option<String>,
    /// Record key holding an option's value.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value_key: Option<String>,
    /// Query parameter carrying the parent key.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_key_name: Option<String>,
    /// Renderer-only props.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Configuration of one form field. Identity is `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    /// Unique field name; key into the form values.
    pub name: String,
    /// Human-readable label, also used in error messages.
    pub label: String,
    /// Widget tag (JSON key `ui`).
    #[serde(rename = "ui", default = "default_ui")]
    pub ui_kind: UiKind,
    /// Validation brick selector (JSON key `type`).
    #[serde(rename = "type", default = "default_validation")]
    pub validation_kind: ValidationKind,
    /// Whether a value must be supplied while the field is visible.
    #[serde(default)]
    pub required: bool,
    /// Static choices for option-bearing widgets.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub options: Option<Vec<FieldOption>>,
    /// Whether the field holds a list of choices.
    #[serde(default)]
    pub is_multi: bool,
    /// Widget and brick parameters.
    #[serde(default)]
    pub props: FieldProps,
    /// Condition gating the field's visibility.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub visible_if: Option<VisibilityCondition>,
    /// Name of the parent field this field's options cascade from.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub depends_on: Option<String>,
    /// Initial value used when the form is created or the field re-mounts.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub default_value: Option<Value>,
}

fn default_ui() -> UiKind {
    UiKind::Text
}

fn default_validation() -> ValidationKind {
    ValidationKind::Text
}

impl FieldConfig {
    /// Creates a text field with the given name and label.
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            ui_kind: UiKind::Text,
            validation_kind: ValidationKind::Text,
            required: false,
            options: None,
            is_multi: false,
            props: FieldProps::default(),
            visible_if: None,
            depends_on: None,
            default_value: None,
        }
    }

    /// Sets the widget kind.
    #[must_use]
    pub fn ui(mut self, ui_kind: UiKind) -> Self {
        self.ui_kind = ui_kind;
        self
    }

    /// Sets the validation kind.
    #[must_use]
    pub fn kind(mut self, kind: ValidationKind) -> Self {
        self.validation_kind = kind;
        self
    }

    /// Marks the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the declared options.
    #[must_use]
    pub fn options(mut self, options: Vec<FieldOption>) -> Self {
        self.options = Some(options);
        self
    }

    /// Allows multiple selected values.
    #[must_use]
    pub fn multi(mut self) -> Self {
        self.is_multi = true;
        self
    }

    /// Replaces the props.
    #[must_use]
    pub fn props(mut self, props: FieldProps) -> Self {
        self.props = props;
        self
    }

    /// Shows the field only while `condition` holds.
    #[must_use]
    pub fn visible_if(mut self, condition: VisibilityCondition) -> Self {
        self.visible_if = Some(condition);
        self
    }

    /// Makes the field's options depend on `parent`.
    #[must_use]
    pub fn depends_on(mut self, parent: impl Into<String>) -> Self {
        self.depends_on = Some(parent.into());
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Declared options, or an empty slice.
    #[must_use]
    pub fn option_list(&self) -> &[FieldOption] {
        self.options.as_deref().unwrap_or_default()
    }

    /// Date display mode from `props.mode`, defaulting to [`DateMode::Date`].
    #[must_use]
    pub fn date_mode(&self) -> DateMode {
        match self.props.mode.as_deref() {
            Some("time") => DateMode::Time,
            Some("datetime") => DateMode::Datetime,
            _ => DateMode::Date,
        }
    }

    /// Brick parameters derived from this field's options and props.
    #[must_use]
    pub fn brick_params(&self, today: chrono::NaiveDate) -> BrickParams {
        BrickParams {
            options: self.option_list().iter().map(|o| o.value.clone()).collect(),
            min: self.props.min,
            min_age: self.props.min_age,
            password_mode: match self.props.mode.as_deref() {
                Some("numeric") => PasswordMode::Numeric,
                _ => PasswordMode::Complex,
            },
            message: self.props.message.clone(),
            max_files: self.props.max_files,
            today,
        }
    }
}

/// An ordered list of field configs with unique names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormDefinition {
    pub fields: Vec<FieldConfig>,
}

impl FormDefinition {
    /// Wraps `fields`, rejecting duplicate names.
    ///
    /// # Errors
    ///
    /// Returns an error if two fields share a name.
    pub fn new(fields: Vec<FieldConfig>) -> anyhow::Result<Self> {
        let definition = Self { fields };
        definition.check()?;
        Ok(definition)
    }

    /// Parses a JSON array of field configs.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or field names repeat.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let fields: Vec<FieldConfig> =
            serde_json::from_str(json).context("failed to parse form definition")?;
        Self::new(fields)
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn check(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                bail!("duplicate field name: {}", field.name);
            }
        }
        for field in &self.fields {
            let references = field
                .visible_if
                .as_ref()
                .map(|c| c.field.as_str())
                .into_iter()
                .chain(field.depends_on.as_deref());
            for referenced in references {
                if !seen.contains(referenced) {
                    tracing::warn!(
                        field = %field.name,
                        referenced,
                        "field references a name not declared in this form"
                    );
                }
            }
        }
        Ok(())
    }
}

/// Initial values: each field's `default_value`, if any.
#[must_use]
pub fn default_values(fields: &[FieldConfig]) -> FormValues {
    fields
        .iter()
        .filter_map(|f| f.default_value.clone().map(|v| (f.name.clone(), v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visibility::Operator;

    const PET_FORM: &str = r#"[
        {"name":"havepets","label":"I have pets","ui":"radio","type":"Select","required":true,
         "options":[{"label":"Yes","value":"yes"},{"label":"No","value":"no"}],"defaultValue":"no"},
        {"name":"petName","label":"What is your pet's name?","ui":"text","type":"Text","required":true,
         "visibleIf":{"field":"havepets","operator":"eq","value":"yes"}},
        {"name":"accountPin","label":"Security PIN","ui":"text","type":"Password","required":true,
         "props":{"mode":"numeric","secureTextEntry":true,"maxLength":4}}
    ]"#;

    #[test]
    fn parses_authored_json() {
        let form = FormDefinition::from_json(PET_FORM).expect("valid form");
        assert_eq!(form.fields.len(), 3);

        let pets = form.field("havepets").expect("declared");
        assert_eq!(pets.ui_kind, UiKind::Radio);
        assert_eq!(pets.validation_kind, ValidationKind::Select);
        assert_eq!(pets.option_list().len(), 2);

        let pet_name = form.field("petName").expect("declared");
        let cond = pet_name.visible_if.as_ref().expect("conditional");
        assert_eq!(cond.operator, Operator::Eq);
        assert_eq!(cond.value, Value::from("yes"));

        let pin = form.field("accountPin").expect("declared");
        assert_eq!(pin.props.mode.as_deref(), Some("numeric"));
        assert_eq!(pin.props.extra.get("maxLength"), Some(&Value::Int(4)));
        let today = chrono::NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid");
        assert_eq!(pin.brick_params(today).password_mode, PasswordMode::Numeric);
    }

    #[test]
    fn unknown_tags_fall_back() {
        let form = FormDefinition::from_json(
            r#"[{"name":"x","label":"X","ui":"colorWheel","type":"Hex"}]"#,
        )
        .expect("valid form");
        assert_eq!(form.fields[0].ui_kind, UiKind::Unknown);
        assert_eq!(form.fields[0].validation_kind, ValidationKind::Unknown);
    }

    #[test]
    fn missing_tags_default_to_text() {
        let form = FormDefinition::from_json(r#"[{"name":"x","label":"X"}]"#).expect("valid");
        assert_eq!(form.fields[0].ui_kind, UiKind::Text);
        assert_eq!(form.fields[0].validation_kind, ValidationKind::Text);
        assert!(!form.fields[0].required);
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = FormDefinition::new(vec![FieldConfig::new("a", "A"), FieldConfig::new("a", "B")])
            .unwrap_err();
        assert!(err.to_string().contains("duplicate field name: a"));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(FormDefinition::from_json("{").is_err());
    }

    #[test]
    fn collects_default_values() {
        let form = FormDefinition::from_json(PET_FORM).expect("valid form");
        let defaults = default_values(&form.fields);
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults.get("havepets"), Some(&Value::from("no")));
    }

    #[test]
    fn date_mode_from_props() {
        let mut field = FieldConfig::new("t", "T").kind(ValidationKind::Date);
        assert_eq!(field.date_mode(), DateMode::Date);
        field.props.mode = Some("time".to_string());
        assert_eq!(field.date_mode(), DateMode::Time);
    }
}
