//! Validation bricks: reusable value constraints.
//!
//! Every brick offers a `required` and an `optional` variant, both producing
//! a [`Constraint`]. The schema factory picks a brick by [`ValidationKind`]
//! and composes the resulting constraints into a form schema.

use std::fmt;
use std::sync::{Arc, LazyLock};

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::date::normalize_to_date_on;
use crate::file::is_file_value;
use crate::types::Value;

// Literal patterns; a pattern that fails to compile matches nothing.
static EMAIL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$").ok()
});
static MOBILE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[6-9]\d{9}$").ok());
static PAN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[A-Z]{5}[0-9]{4}[A-Z]").ok());
static DIGITS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^\d+$").ok());
static PIN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^\d{4,6}$").ok());

fn matches(pattern: &Option<Regex>, s: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(s))
}

// ---------------------------------------------------------------------------
// Constraint
// ---------------------------------------------------------------------------

type CheckFn = dyn Fn(&Value) -> Result<Value, String> + Send + Sync;

/// A predicate over a field value plus the messages it reports.
///
/// A constraint first decides whether the value is present at all
/// (undefined, `null`, empty string), then runs its check on present values.
/// The check may transform the value (trim, lower-case, coerce); the
/// transformed value is what validation outputs.
#[derive(Clone)]
pub struct Constraint {
    name: &'static str,
    check: Arc<CheckFn>,
    missing_message: Option<String>,
    accepts_null: bool,
    accepts_empty: bool,
}

impl Constraint {
    /// Creates a constraint that rejects undefined input with `missing_message`.
    pub fn new<F>(name: &'static str, missing_message: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            name,
            check: Arc::new(check),
            missing_message: Some(missing_message.into()),
            accepts_null: false,
            accepts_empty: false,
        }
    }

    /// Accepts undefined input.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.missing_message = None;
        self
    }

    /// Accepts `null`.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.accepts_null = true;
        self
    }

    /// Accepts the empty string.
    #[must_use]
    pub fn or_empty(mut self) -> Self {
        self.accepts_empty = true;
        self
    }

    /// Accepts undefined, `null` and the empty string in addition to the
    /// normal domain.
    #[must_use]
    pub fn relaxed(self) -> Self {
        self.optional().nullable().or_empty()
    }

    /// Short name of the brick that built this constraint.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether undefined input passes.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.missing_message.is_none()
    }

    /// Validates `value`, returning the (possibly transformed) output.
    ///
    /// `Ok(None)` means the field stays undefined.
    ///
    /// # Errors
    ///
    /// Returns the human-readable message of the first failed rule.
    pub fn validate(&self, value: Option<&Value>) -> Result<Option<Value>, String> {
        let Some(value) = value else {
            return match &self.missing_message {
                Some(message) => Err(message.clone()),
                None => Ok(None),
            };
        };
        match value {
            Value::Null if self.accepts_null => Ok(Some(Value::Null)),
            Value::String(s) if s.is_empty() && self.accepts_empty => {
                Ok(Some(Value::String(String::new())))
            }
            other => (self.check)(other).map(Some),
        }
    }

    /// Whether `value` passes.
    #[must_use]
    pub fn accepts(&self, value: Option<&Value>) -> bool {
        self.validate(value).is_ok()
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("name", &self.name)
            .field("optional", &self.is_optional())
            .field("accepts_null", &self.accepts_null)
            .field("accepts_empty", &self.accepts_empty)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Brick catalog
// ---------------------------------------------------------------------------

/// Password strength policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordMode {
    /// 4-6 digit PIN.
    Numeric,
    /// At least 8 characters mixing upper, lower, digit and symbol.
    #[default]
    Complex,
}

/// Brick-specific parameters, resolved from a field's props.
#[derive(Debug, Clone)]
pub struct BrickParams {
    /// Declared option values (Select).
    pub options: Vec<Value>,
    /// Lower bound (Number).
    pub min: Option<f64>,
    /// Minimum age in years (Date).
    pub min_age: Option<u32>,
    /// Password policy (Password).
    pub password_mode: PasswordMode,
    /// Custom failure message (Agreed).
    pub message: Option<String>,
    /// Maximum number of files (File).
    pub max_files: Option<usize>,
    /// Reference day for time-only input and age checks (Date).
    pub today: NaiveDate,
}

impl Default for BrickParams {
    fn default() -> Self {
        Self {
            options: Vec::new(),
            min: None,
            min_age: None,
            password_mode: PasswordMode::default(),
            message: None,
            max_files: None,
            today: chrono::Local::now().date_naive(),
        }
    }
}

/// A constraint builder with required and optional variants.
pub trait Brick: Send + Sync {
    /// Constraint for a field that must be filled in.
    fn required(&self, label: &str, params: &BrickParams) -> Constraint;

    /// Constraint for a field that may be left empty.
    fn optional(&self, params: &BrickParams) -> Constraint;
}

/// Key selecting a brick. PascalCase tags match the config `type` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationKind {
    Email,
    Mobile,
    Pan,
    Pincode,
    Text,
    Number,
    Date,
    Select,
    Required,
    File,
    Password,
    Location,
    Agreed,
    /// Unrecognized tag; validated as a permissive optional string.
    #[serde(other)]
    Unknown,
}

impl ValidationKind {
    /// The brick implementing this kind.
    #[must_use]
    pub fn brick(self) -> &'static dyn Brick {
        match self {
            Self::Email => &EmailBrick,
            Self::Mobile => &MobileBrick,
            Self::Pan => &PanBrick,
            Self::Pincode => &PincodeBrick,
            Self::Text => &TextBrick,
            Self::Number => &NumberBrick,
            Self::Date => &DateBrick,
            Self::Select => &SelectBrick,
            Self::Required => &RequiredBrick,
            Self::File => &FileBrick,
            Self::Password => &PasswordBrick,
            Self::Location => &LocationBrick,
            Self::Agreed => &AgreedBrick,
            Self::Unknown => &PermissiveTextBrick,
        }
    }
}

fn required_message(label: &str) -> String {
    format!("{label} is required")
}

fn expect_string(value: &Value) -> Result<&str, String> {
    value.as_str().ok_or_else(|| "Expected text".to_string())
}

// Required string bricks reject empty input with the label message, then
// hand the raw string to the formatting rule.
fn string_rule<F>(name: &'static str, label: &str, rule: F) -> Constraint
where
    F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
{
    let message = required_message(label);
    let empty_message = message.clone();
    Constraint::new(name, message, move |value| {
        let s = expect_string(value)?;
        if s.is_empty() {
            return Err(empty_message.clone());
        }
        rule(s)
    })
}

fn optional_string_rule<F>(name: &'static str, rule: F) -> Constraint
where
    F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
{
    Constraint::new(name, "Required", move |value| rule(expect_string(value)?))
        .optional()
        .or_empty()
}

fn email_rule(s: &str) -> Result<Value, String> {
    let normalized = s.trim().to_lowercase();
    if matches(&EMAIL, &normalized) {
        Ok(Value::String(normalized))
    } else {
        Err("Invalid email format".to_string())
    }
}

fn mobile_rule(s: &str) -> Result<Value, String> {
    if matches(&MOBILE, s) {
        Ok(Value::from(s))
    } else {
        Err("Invalid 10-digit number".to_string())
    }
}

fn pan_rule(s: &str) -> Result<Value, String> {
    let upper = s.to_uppercase();
    if matches(&PAN, &upper) {
        Ok(Value::String(upper))
    } else {
        Err("Invalid PAN format".to_string())
    }
}

fn pincode_rule(s: &str) -> Result<Value, String> {
    if s.chars().count() != 6 {
        return Err("Must be 6 digits".to_string());
    }
    if !matches(&DIGITS, s) {
        return Err("Numbers only".to_string());
    }
    Ok(Value::from(s))
}

/// Email address, trimmed and lower-cased.
#[derive(Debug, Clone, Copy)]
pub struct EmailBrick;

impl Brick for EmailBrick {
    fn required(&self, label: &str, _params: &BrickParams) -> Constraint {
        string_rule("email", label, email_rule)
    }

    fn optional(&self, _params: &BrickParams) -> Constraint {
        optional_string_rule("email", email_rule)
    }
}

/// Ten-digit mobile number starting with 6-9.
#[derive(Debug, Clone, Copy)]
pub struct MobileBrick;

impl Brick for MobileBrick {
    fn required(&self, label: &str, _params: &BrickParams) -> Constraint {
        string_rule("mobile", label, mobile_rule)
    }

    fn optional(&self, _params: &BrickParams) -> Constraint {
        optional_string_rule("mobile", mobile_rule)
    }
}

/// Permanent account number, upper-cased.
#[derive(Debug, Clone, Copy)]
pub struct PanBrick;

impl Brick for PanBrick {
    fn required(&self, label: &str, _params: &BrickParams) -> Constraint {
        string_rule("pan", label, pan_rule)
    }

    fn optional(&self, _params: &BrickParams) -> Constraint {
        optional_string_rule("pan", pan_rule)
    }
}

/// Six-digit postal code.
#[derive(Debug, Clone, Copy)]
pub struct PincodeBrick;

impl Brick for PincodeBrick {
    fn required(&self, label: &str, _params: &BrickParams) -> Constraint {
        string_rule("pincode", label, pincode_rule)
    }

    fn optional(&self, _params: &BrickParams) -> Constraint {
        optional_string_rule("pincode", pincode_rule)
    }
}

/// Free text. The required variant trims and rejects blank input.
#[derive(Debug, Clone, Copy)]
pub struct TextBrick;

impl Brick for TextBrick {
    fn required(&self, label: &str, _params: &BrickParams) -> Constraint {
        let message = required_message(label);
        let blank = message.clone();
        Constraint::new("text", message, move |value| {
            let trimmed = expect_string(value)?.trim();
            if trimmed.is_empty() {
                Err(blank.clone())
            } else {
                Ok(Value::from(trimmed))
            }
        })
    }

    fn optional(&self, _params: &BrickParams) -> Constraint {
        optional_string_rule("text", |s| Ok(Value::from(s)))
    }
}

/// Fallback for unknown kinds: any string, or nothing.
#[derive(Debug, Clone, Copy)]
pub struct PermissiveTextBrick;

impl Brick for PermissiveTextBrick {
    fn required(&self, _label: &str, params: &BrickParams) -> Constraint {
        self.optional(params)
    }

    fn optional(&self, _params: &BrickParams) -> Constraint {
        Constraint::new("string", "Required", |value| {
            expect_string(value).map(Value::from)
        })
        .optional()
    }
}

/// Number, coerced from string input and checked against a lower bound.
#[derive(Debug, Clone, Copy)]
pub struct NumberBrick;

impl NumberBrick {
    fn rule(label: &str, min: Option<f64>) -> impl Fn(&Value) -> Result<Value, String> {
        let label = label.to_string();
        move |value| {
            let n = value.to_number();
            if matches!(value, Value::Map(_) | Value::Date(_)) || !n.is_finite() {
                return Err(format!("{label} must be a number"));
            }
            if let Some(min) = min {
                if n < min {
                    return Err(format!("{label} must be at least {}", Value::number(min)));
                }
            }
            Ok(Value::number(n))
        }
    }
}

impl Brick for NumberBrick {
    fn required(&self, label: &str, params: &BrickParams) -> Constraint {
        let message = required_message(label);
        let blank = message.clone();
        let rule = Self::rule(label, Some(params.min.unwrap_or(0.0)));
        Constraint::new("number", message, move |value| match value {
            Value::Null => Err(blank.clone()),
            Value::String(s) if s.trim().is_empty() => Err(blank.clone()),
            other => rule(other),
        })
    }

    fn optional(&self, params: &BrickParams) -> Constraint {
        Constraint::new("number", "Required", Self::rule("Value", params.min))
            .optional()
            .or_empty()
    }
}

/// Date from any accepted shape, with an optional minimum age.
///
/// The age check compares calendar years only: someone born late in the
/// year passes up to a year early.
#[derive(Debug, Clone, Copy)]
pub struct DateBrick;

impl DateBrick {
    fn rule(
        empty_message: Option<String>,
        min_age: Option<u32>,
        today: NaiveDate,
    ) -> impl Fn(&Value) -> Result<Value, String> {
        move |value| {
            let Some(date) = normalize_to_date_on(value, today) else {
                return match (&empty_message, value) {
                    (Some(message), Value::String(s)) if s.trim().is_empty() => {
                        Err(message.clone())
                    }
                    (Some(message), Value::Null) => Err(message.clone()),
                    _ => Err("Invalid date".to_string()),
                };
            };
            if let Some(min_age) = min_age {
                if today.year() - date.year() < i32::try_from(min_age).unwrap_or(i32::MAX) {
                    return Err(format!("You must be at least {min_age} years old"));
                }
            }
            Ok(Value::Date(date))
        }
    }
}

impl Brick for DateBrick {
    fn required(&self, label: &str, params: &BrickParams) -> Constraint {
        let message = required_message(label);
        Constraint::new(
            "date",
            message.clone(),
            Self::rule(Some(message), params.min_age, params.today),
        )
    }

    fn optional(&self, params: &BrickParams) -> Constraint {
        Constraint::new("date", "Required", Self::rule(None, None, params.today))
            .optional()
            .nullable()
            .or_empty()
    }
}

/// One of a fixed set of values. String input is lower-cased before matching,
/// the declared set is matched as written. Arrays are checked element-wise.
#[derive(Debug, Clone, Copy)]
pub struct SelectBrick;

impl SelectBrick {
    fn match_one(options: &[Value], value: &Value) -> Option<Value> {
        let wanted = match value {
            Value::String(s) => s.to_lowercase(),
            Value::Int(_) | Value::Float(_) | Value::Bool(_) => value.to_string(),
            _ => return None,
        };
        options
            .iter()
            .find(|option| option.to_string() == wanted)
            .cloned()
    }

    fn rule(options: Vec<Value>, message: String, non_empty: bool) -> impl Fn(&Value) -> Result<Value, String> {
        move |value| match value {
            Value::Array(items) => {
                if non_empty && items.is_empty() {
                    return Err(message.clone());
                }
                items
                    .iter()
                    .map(|item| Self::match_one(&options, item).ok_or_else(|| message.clone()))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            other => Self::match_one(&options, other).ok_or_else(|| message.clone()),
        }
    }
}

impl SelectBrick {
    /// Constraint for a select with no declared options (remote or not yet
    /// loaded): any scalar choice or list of choices.
    #[must_use]
    pub fn any_choice(label: &str, required: bool) -> Constraint {
        let message = format!("Please select a valid {label}");
        let blank = message.clone();
        let constraint = Constraint::new("select", message, move |value| match value {
            Value::String(s) if required && s.is_empty() => Err(blank.clone()),
            Value::Array(items) if required && items.is_empty() => Err(blank.clone()),
            Value::String(_) | Value::Int(_) | Value::Float(_) | Value::Array(_) => {
                Ok(value.clone())
            }
            _ => Err(blank.clone()),
        });
        if required {
            constraint
        } else {
            constraint.optional().or_empty()
        }
    }
}

impl Brick for SelectBrick {
    fn required(&self, label: &str, params: &BrickParams) -> Constraint {
        let message = format!("Please select a valid {label}");
        Constraint::new(
            "select",
            message.clone(),
            Self::rule(params.options.clone(), message, true),
        )
    }

    fn optional(&self, params: &BrickParams) -> Constraint {
        Constraint::new(
            "select",
            "Required",
            Self::rule(params.options.clone(), "Invalid option".to_string(), false),
        )
        .optional()
    }
}

/// Any value shape; absent when null, empty string, empty array or empty object.
#[derive(Debug, Clone, Copy)]
pub struct RequiredBrick;

impl Brick for RequiredBrick {
    fn required(&self, label: &str, _params: &BrickParams) -> Constraint {
        let message = required_message(label);
        let absent = message.clone();
        Constraint::new("required", message, move |value| {
            if value.is_empty_like() {
                Err(absent.clone())
            } else {
                Ok(value.clone())
            }
        })
    }

    fn optional(&self, _params: &BrickParams) -> Constraint {
        Constraint::new("required", "Required", |value| Ok(value.clone())).optional()
    }
}

/// One or more files; see [`is_file_value`] for the accepted representations.
#[derive(Debug, Clone, Copy)]
pub struct FileBrick;

impl FileBrick {
    fn rule(empty_message: Option<String>, max_files: Option<usize>) -> impl Fn(&Value) -> Result<Value, String> {
        move |value| {
            let files: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                Value::Null => Vec::new(),
                single => vec![single],
            };
            if files.is_empty() {
                return match &empty_message {
                    Some(message) => Err(message.clone()),
                    None => Ok(value.clone()),
                };
            }
            if let Some(max) = max_files {
                if files.len() > max {
                    return Err(format!("You can upload at most {max} files"));
                }
            }
            if files.iter().all(|f| is_file_value(f)) {
                Ok(value.clone())
            } else {
                Err("Invalid file".to_string())
            }
        }
    }
}

impl Brick for FileBrick {
    fn required(&self, label: &str, params: &BrickParams) -> Constraint {
        let message = required_message(label);
        Constraint::new("file", message.clone(), Self::rule(Some(message), params.max_files))
    }

    fn optional(&self, params: &BrickParams) -> Constraint {
        Constraint::new("file", "Required", Self::rule(None, params.max_files))
            .optional()
            .nullable()
    }
}

/// Password or PIN, depending on [`PasswordMode`].
#[derive(Debug, Clone, Copy)]
pub struct PasswordBrick;

impl PasswordBrick {
    fn rule(label: &str, mode: PasswordMode) -> impl Fn(&str) -> Result<Value, String> {
        let label = label.to_string();
        move |s| {
            match mode {
                PasswordMode::Numeric => {
                    if !matches(&PIN, s) {
                        return Err(format!("{label} must be 4-6 digits"));
                    }
                }
                PasswordMode::Complex => {
                    if s.chars().count() < 8 {
                        return Err("Password must be at least 8 characters".to_string());
                    }
                    if !s.chars().any(char::is_uppercase) {
                        return Err("Password must contain an uppercase letter".to_string());
                    }
                    if !s.chars().any(char::is_lowercase) {
                        return Err("Password must contain a lowercase letter".to_string());
                    }
                    if !s.chars().any(|c| c.is_ascii_digit()) {
                        return Err("Password must contain a number".to_string());
                    }
                    if s.chars().all(char::is_alphanumeric) {
                        return Err("Password must contain a special character".to_string());
                    }
                }
            }
            Ok(Value::from(s))
        }
    }
}

impl Brick for PasswordBrick {
    fn required(&self, label: &str, params: &BrickParams) -> Constraint {
        string_rule("password", label, Self::rule(label, params.password_mode))
    }

    fn optional(&self, params: &BrickParams) -> Constraint {
        optional_string_rule("password", Self::rule("PIN", params.password_mode))
    }
}

/// Geographic coordinates: `{ latitude, longitude, accuracy? }`.
#[derive(Debug, Clone, Copy)]
pub struct LocationBrick;

impl LocationBrick {
    fn rule(empty_message: Option<String>) -> impl Fn(&Value) -> Result<Value, String> {
        move |value| {
            if value.is_empty_like() {
                return match &empty_message {
                    Some(message) => Err(message.clone()),
                    None => Ok(value.clone()),
                };
            }
            let invalid = || "Invalid location".to_string();
            let map = value.as_map().ok_or_else(invalid)?;
            let coordinate = |key: &str, bound: f64| {
                map.get(key)
                    .filter(|v| matches!(v, Value::Int(_) | Value::Float(_)))
                    .map(Value::to_number)
                    .filter(|n| n.abs() <= bound)
            };
            match (coordinate("latitude", 90.0), coordinate("longitude", 180.0)) {
                (Some(_), Some(_)) => Ok(value.clone()),
                _ => Err(invalid()),
            }
        }
    }
}

impl Brick for LocationBrick {
    fn required(&self, label: &str, _params: &BrickParams) -> Constraint {
        let message = required_message(label);
        Constraint::new("location", message.clone(), Self::rule(Some(message)))
    }

    fn optional(&self, _params: &BrickParams) -> Constraint {
        Constraint::new("location", "Required", Self::rule(None))
            .optional()
            .nullable()
    }
}

/// Boolean acknowledgement that must be `true`.
#[derive(Debug, Clone, Copy)]
pub struct AgreedBrick;

impl Brick for AgreedBrick {
    fn required(&self, label: &str, params: &BrickParams) -> Constraint {
        let message = params
            .message
            .clone()
            .unwrap_or_else(|| required_message(label));
        let refused = message.clone();
        Constraint::new("agreed", message, move |value| match value {
            Value::Bool(true) => Ok(Value::Bool(true)),
            _ => Err(refused.clone()),
        })
    }

    /// Undefined passes; any supplied value must still be `true`.
    fn optional(&self, params: &BrickParams) -> Constraint {
        let refused = params
            .message
            .clone()
            .unwrap_or_else(|| "Must be accepted".to_string());
        Constraint::new("agreed", "Required", move |value| match value {
            Value::Bool(true) => Ok(Value::Bool(true)),
            _ => Err(refused.clone()),
        })
        .optional()
    }
}
