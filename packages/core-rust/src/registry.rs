//! Renderer dispatch and the visibility gate.
//!
//! Rendering is headless: a renderer turns a [`FieldConfig`] plus the current
//! form state into a [`RenderedField`] view-model. The registry maps each
//! [`UiKind`] to a renderer, with integrator overrides taking precedence and a
//! text input as the fallback for unknown kinds.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::config::{FieldConfig, FieldOption, FieldProps, UiKind};
use crate::controller::FormController;
use crate::date::format_for_display;
use crate::options::static_display_options;
use crate::types::{ErrorMap, FieldError, FormValues, Value};
use crate::visibility::hidden_fields;

// ---------------------------------------------------------------------------
// View-model
// ---------------------------------------------------------------------------

/// Widget a field is drawn with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Widget {
    TextInput,
    Dropdown,
    AsyncDropdown,
    RadioGroup,
    CheckboxGroup,
    Slider,
    DateTimePicker,
    FilePicker,
    LocationPicker,
    /// Integrator-defined widget.
    Custom(String),
}

impl Widget {
    /// Whether the widget presents a list of options.
    #[must_use]
    pub fn has_options(&self) -> bool {
        matches!(
            self,
            Self::Dropdown | Self::AsyncDropdown | Self::RadioGroup | Self::CheckboxGroup
        )
    }
}

/// Everything a UI layer needs to draw one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedField {
    pub name: String,
    pub label: String,
    pub widget: Widget,
    pub required: bool,
    pub is_multi: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Display string for date and time values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FieldError>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    pub props: FieldProps,
}

/// Form state visible to renderers.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub values: &'a FormValues,
    pub errors: &'a ErrorMap,
    /// Option lists produced by the async resolver, keyed by field name.
    pub resolved_options: &'a BTreeMap<String, Vec<FieldOption>>,
}

impl RenderContext<'_> {
    /// Options for `field`: resolver output when present, otherwise the
    /// static list filtered by the parent's current value.
    #[must_use]
    pub fn options_for(&self, field: &FieldConfig) -> Vec<FieldOption> {
        if let Some(resolved) = self.resolved_options.get(&field.name) {
            return resolved.clone();
        }
        let parent_value = field.depends_on.as_deref().and_then(|p| self.values.get(p));
        static_display_options(field, parent_value)
    }
}

// ---------------------------------------------------------------------------
// Renderers
// ---------------------------------------------------------------------------

/// Produces the view-model of one field.
pub trait Renderer: Send + Sync {
    fn render(&self, field: &FieldConfig, ctx: &RenderContext<'_>) -> RenderedField;
}

/// Built-in renderer drawing a field with a fixed widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetRenderer(pub Widget);

impl Renderer for WidgetRenderer {
    fn render(&self, field: &FieldConfig, ctx: &RenderContext<'_>) -> RenderedField {
        let value = ctx.values.get(&field.name).cloned();
        let display = match (&self.0, &value) {
            (Widget::DateTimePicker, Some(v)) => {
                Some(format_for_display(v, field.date_mode())).filter(|s| !s.is_empty())
            }
            _ => None,
        };
        let options = if self.0.has_options() {
            ctx.options_for(field)
        } else {
            Vec::new()
        };
        RenderedField {
            name: field.name.clone(),
            label: field.label.clone(),
            widget: self.0.clone(),
            required: field.required,
            is_multi: field.is_multi,
            value,
            display,
            error: ctx.errors.get(&field.name).cloned(),
            options,
            props: field.props.clone(),
        }
    }
}

static TEXT: WidgetRenderer = WidgetRenderer(Widget::TextInput);
static DROPDOWN: WidgetRenderer = WidgetRenderer(Widget::Dropdown);
static ASYNC_DROPDOWN: WidgetRenderer = WidgetRenderer(Widget::AsyncDropdown);
static RADIO: WidgetRenderer = WidgetRenderer(Widget::RadioGroup);
static CHECKBOX: WidgetRenderer = WidgetRenderer(Widget::CheckboxGroup);
static SLIDER: WidgetRenderer = WidgetRenderer(Widget::Slider);
static DATETIME: WidgetRenderer = WidgetRenderer(Widget::DateTimePicker);
static FILE: WidgetRenderer = WidgetRenderer(Widget::FilePicker);
static LOCATION: WidgetRenderer = WidgetRenderer(Widget::LocationPicker);

fn builtin(kind: UiKind) -> &'static dyn Renderer {
    match kind {
        UiKind::Dropdown => &DROPDOWN,
        UiKind::AsyncDropdown => &ASYNC_DROPDOWN,
        UiKind::Radio => &RADIO,
        UiKind::Checkbox => &CHECKBOX,
        UiKind::Slider => &SLIDER,
        UiKind::Datetime => &DATETIME,
        UiKind::File => &FILE,
        UiKind::Location => &LOCATION,
        UiKind::Text | UiKind::Unknown => &TEXT,
    }
}

// ---------------------------------------------------------------------------
// RendererRegistry
// ---------------------------------------------------------------------------

/// Maps widget kinds to renderers.
///
/// Lookups never fail: overrides are consulted first, then the built-in
/// table, whose default arm is the text input.
#[derive(Default, Clone)]
pub struct RendererRegistry {
    overrides: HashMap<UiKind, Arc<dyn Renderer>>,
}

impl RendererRegistry {
    /// Creates a registry with only the built-in renderers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the renderer for `kind`.
    pub fn register(&mut self, kind: UiKind, renderer: Arc<dyn Renderer>) {
        self.overrides.insert(kind, renderer);
    }

    /// Renderer for `kind`.
    #[must_use]
    pub fn resolve(&self, kind: UiKind) -> &dyn Renderer {
        match self.overrides.get(&kind) {
            Some(renderer) => renderer.as_ref(),
            None => builtin(kind),
        }
    }

    /// Renders every visible field of the controller's form, in config order.
    ///
    /// Each field passes through the visibility gate first. Visible fields
    /// are registered with the controller; hidden fields are unregistered,
    /// which clears their value and error even if they never mounted. Registering can
    /// restore a default that changes another field's visibility, so the
    /// gate repeats until no registration changes.
    pub fn render_form(
        &self,
        controller: &mut FormController,
        resolved_options: &BTreeMap<String, Vec<FieldOption>>,
    ) -> Vec<RenderedField> {
        let definition = Arc::clone(controller.definition());

        for _ in 0..=definition.fields.len() {
            let hidden = hidden_fields(&definition.fields, controller.values());
            let mut changed = false;
            for field in &definition.fields {
                if !hidden.contains(&field.name) {
                    changed |= controller.register(&field.name);
                } else if controller.is_registered(&field.name) || controller.value(&field.name).is_some() {
                    controller.unregister(&field.name);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let ctx = RenderContext {
            values: controller.values(),
            errors: controller.errors(),
            resolved_options,
        };
        definition
            .fields
            .iter()
            .filter(|f| controller.is_registered(&f.name))
            .map(|f| self.resolve(f.ui_kind).render(f, &ctx))
            .collect()
    }
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererRegistry")
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bricks::ValidationKind;
    use crate::config::FormDefinition;
    use crate::visibility::{Operator, VisibilityCondition};

    fn form() -> FormController {
        let definition = FormDefinition::new(vec![
            FieldConfig::new("havepets", "I have pets")
                .ui(UiKind::Radio)
                .kind(ValidationKind::Select)
                .options(vec![FieldOption::new("Yes", "yes"), FieldOption::new("No", "no")])
                .default_value("no"),
            FieldConfig::new("petName", "Pet name")
                .required()
                .visible_if(VisibilityCondition::new("havepets", Operator::Eq, "yes")),
            FieldConfig::new("dob", "Date of birth")
                .ui(UiKind::Datetime)
                .kind(ValidationKind::Date),
        ])
        .expect("valid form");
        FormController::new(definition)
    }

    #[test]
    fn unknown_kind_falls_back_to_text() {
        let registry = RendererRegistry::new();
        let field = FieldConfig::new("x", "X").ui(UiKind::Unknown);
        let values = FormValues::new();
        let errors = ErrorMap::new();
        let resolved = BTreeMap::new();
        let ctx = RenderContext {
            values: &values,
            errors: &errors,
            resolved_options: &resolved,
        };
        let rendered = registry.resolve(field.ui_kind).render(&field, &ctx);
        assert_eq!(rendered.widget, Widget::TextInput);
    }

    #[test]
    fn hidden_fields_are_not_rendered() {
        let registry = RendererRegistry::new();
        let mut controller = form();
        let rendered = registry.render_form(&mut controller, &BTreeMap::new());
        let names: Vec<_> = rendered.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["havepets", "dob"]);
        assert_eq!(rendered[0].widget, Widget::RadioGroup);
        assert_eq!(rendered[0].options.len(), 2);
    }

    #[test]
    fn hiding_a_field_clears_its_value() {
        let registry = RendererRegistry::new();
        let mut controller = form();
        controller.change("havepets", Some(Value::from("yes")));
        let rendered = registry.render_form(&mut controller, &BTreeMap::new());
        assert_eq!(rendered.len(), 3);

        controller.change("petName", Some(Value::from("Rex")));
        controller.change("havepets", Some(Value::from("no")));
        registry.render_form(&mut controller, &BTreeMap::new());
        assert!(controller.value("petName").is_none());
        assert!(!controller.is_registered("petName"));
    }

    #[test]
    fn chained_conditions_hide_in_one_render() {
        let definition = FormDefinition::new(vec![
            FieldConfig::new("a", "A").visible_if(VisibilityCondition::new("b", Operator::Eq, "x")),
            FieldConfig::new("b", "B").visible_if(VisibilityCondition::new("c", Operator::Eq, "y")),
            FieldConfig::new("c", "C"),
        ])
        .expect("valid form");
        let registry = RendererRegistry::new();
        let mut controller = FormController::new(definition);
        controller.reset([("a", "v"), ("b", "x"), ("c", "y")].into_iter().collect());
        let rendered = registry.render_form(&mut controller, &BTreeMap::new());
        assert_eq!(rendered.len(), 3);

        controller.change("c", Some(Value::from("n")));
        let rendered = registry.render_form(&mut controller, &BTreeMap::new());
        let names: Vec<_> = rendered.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["c"]);
        assert!(controller.value("a").is_none());
        assert!(controller.value("b").is_none());
    }

    #[test]
    fn hidden_field_that_never_mounted_loses_its_loaded_value() {
        let registry = RendererRegistry::new();
        let mut controller = form();
        controller.reset([("havepets", "no"), ("petName", "Rex")].into_iter().collect());
        registry.render_form(&mut controller, &BTreeMap::new());
        assert!(controller.value("petName").is_none());

        controller.change("havepets", Some(Value::from("yes")));
        registry.render_form(&mut controller, &BTreeMap::new());
        assert_eq!(controller.value("petName"), Some(&Value::from("Rex")));
    }

    #[test]
    fn datetime_values_get_a_display_string() {
        let registry = RendererRegistry::new();
        let mut controller = form();
        controller.change("dob", Some(Value::from("1990-04-15")));
        let rendered = registry.render_form(&mut controller, &BTreeMap::new());
        let dob = rendered.iter().find(|f| f.name == "dob").expect("rendered");
        assert_eq!(dob.display.as_deref(), Some("15/04/1990"));
    }

    #[test]
    fn resolved_options_take_precedence() {
        let registry = RendererRegistry::new();
        let mut controller = form();
        let mut resolved = BTreeMap::new();
        resolved.insert("havepets".to_string(), vec![FieldOption::new("Maybe", "maybe")]);
        let rendered = registry.render_form(&mut controller, &resolved);
        assert_eq!(rendered[0].options, vec![FieldOption::new("Maybe", "maybe")]);
    }

    struct StarRating;

    impl Renderer for StarRating {
        fn render(&self, field: &FieldConfig, ctx: &RenderContext<'_>) -> RenderedField {
            let mut rendered = WidgetRenderer(Widget::Slider).render(field, ctx);
            rendered.widget = Widget::Custom("starRating".to_string());
            rendered
        }
    }

    #[test]
    fn overrides_replace_builtins() {
        let mut registry = RendererRegistry::new();
        registry.register(UiKind::Slider, Arc::new(StarRating));
        let field = FieldConfig::new("rating", "Rating").ui(UiKind::Slider);
        let values = FormValues::new();
        let errors = ErrorMap::new();
        let resolved = BTreeMap::new();
        let ctx = RenderContext {
            values: &values,
            errors: &errors,
            resolved_options: &resolved,
        };
        let rendered = registry.resolve(UiKind::Slider).render(&field, &ctx);
        assert_eq!(rendered.widget, Widget::Custom("starRating".to_string()));
        let text = registry.resolve(UiKind::Text).render(&field, &ctx);
        assert_eq!(text.widget, Widget::TextInput);
    }

    #[test]
    fn view_model_serializes_camel_case() {
        let registry = RendererRegistry::new();
        let mut controller = form();
        let rendered = registry.render_form(&mut controller, &BTreeMap::new());
        let json = serde_json::to_value(&rendered[0]).expect("serializable");
        assert_eq!(json["widget"], "radioGroup");
        assert_eq!(json["isMulti"], false);
        assert_eq!(json["value"], "no");
    }
}
