//! `Formwork` Core. A config-driven form engine covering values, visibility,
//! validation bricks, schema factory, renderer dispatch, form controller and smart submit.

pub mod bricks;
pub mod config;
pub mod controller;
pub mod date;
pub mod file;
pub mod options;
pub mod registry;
pub mod schema;
pub mod submit;
pub mod types;
pub mod visibility;

pub use bricks::{Brick, BrickParams, Constraint, PasswordMode, ValidationKind};
pub use config::{default_values, FieldConfig, FieldOption, FieldProps, FormDefinition, UiKind};
pub use controller::{FormController, SetValueOptions};
pub use date::{format_for_display, normalize_to_date, DateMode};
pub use file::{is_file_value, FileDescriptor};
pub use options::{option_from_record, parent_key, static_display_options, OptionMode};
pub use registry::{RenderContext, RenderedField, Renderer, RendererRegistry, Widget};
pub use schema::{build_schema, FormSchema, ValidationResult};
pub use submit::{clean_visible_data, SubmitOutcome};
pub use types::{ErrorKind, ErrorMap, FieldError, FormValues, Value};
pub use visibility::{evaluate, hidden_fields, is_visible, Operator, VisibilityCondition};
