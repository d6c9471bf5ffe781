//! Smart submit: schema validation plus visibility-aware requiredness.
//!
//! Conditional fields are relaxed at the schema layer, so a passing schema
//! says nothing about whether a visible, required conditional field was
//! filled in. The manual pass below checks exactly that, and strips the
//! values of hidden fields from the submitted output.

use tracing::debug;

use crate::config::FieldConfig;
use crate::controller::FormController;
use crate::schema::ValidationResult;
use crate::types::{ErrorMap, FieldError, FormValues, Value};
use crate::visibility::hidden_fields;

/// Outcome of [`FormController::smart_submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// All checks passed; carries the cleaned values handed to the success callback.
    Submitted(FormValues),
    /// Validation failed; carries the merged errors handed to the error callback.
    Rejected(ErrorMap),
}

impl SubmitOutcome {
    /// Whether the success path ran.
    #[must_use]
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted(_))
    }
}

/// Manual pass over every conditional field.
///
/// Returns `data` without the values of currently hidden fields, and a
/// `"<label> is required"` error for each visible, required field that is
/// empty. A field watching a hidden field is itself judged against no value.
#[must_use]
pub fn clean_visible_data(fields: &[FieldConfig], data: &FormValues) -> (FormValues, ErrorMap) {
    let hidden = hidden_fields(fields, data);
    let mut clean = data.clone();
    let mut manual_errors = ErrorMap::new();
    for field in fields.iter().filter(|f| f.visible_if.is_some()) {
        if hidden.contains(&field.name) {
            clean.remove(&field.name);
            continue;
        }
        let empty = data.get(&field.name).map_or(true, Value::is_empty_like);
        if field.required && empty {
            manual_errors.insert(
                field.name.clone(),
                FieldError::manual(format!("{} is required", field.label)),
            );
        }
    }
    (clean, manual_errors)
}

impl FormController {
    /// Validates and submits the form.
    ///
    /// 1. Validate the values of visible fields against the schema. Hidden
    ///    fields are left out, so they never carry a schema error.
    /// 2. On schema failure, run the manual pass over the raw values, merge
    ///    its errors into the schema errors (manual entries win on
    ///    collision), store the merged set and call `on_error`.
    /// 3. On schema success, run the manual pass over the validated output.
    ///    Manual errors are stored and reported through `on_error`; the
    ///    success callback is not called. Otherwise `on_success` receives
    ///    the output with hidden-field values stripped.
    pub fn smart_submit<S, E>(&mut self, on_success: S, on_error: E) -> SubmitOutcome
    where
        S: FnOnce(&FormValues),
        E: FnOnce(&ErrorMap),
    {
        self.record_submit();
        let fields = self.definition().fields.clone();
        let (visible_values, _) = clean_visible_data(&fields, self.values());

        match self.schema().validate(&visible_values) {
            ValidationResult::Invalid { mut errors } => {
                let (_, manual_errors) = clean_visible_data(&fields, self.values());
                if !manual_errors.is_empty() {
                    debug!(count = manual_errors.len(), "merging manual visibility errors");
                }
                errors.merge(manual_errors);
                self.replace_errors(errors.clone());
                on_error(&errors);
                SubmitOutcome::Rejected(errors)
            }
            ValidationResult::Valid { values } => {
                let (clean, manual_errors) = clean_visible_data(&fields, &values);
                if manual_errors.is_empty() {
                    self.clear_errors();
                    on_success(&clean);
                    SubmitOutcome::Submitted(clean)
                } else {
                    debug!(count = manual_errors.len(), "visible required fields left empty");
                    self.clear_errors();
                    for (name, error) in manual_errors.iter() {
                        self.set_error(name, error.clone());
                    }
                    on_error(&manual_errors);
                    SubmitOutcome::Rejected(manual_errors)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::bricks::ValidationKind;
    use crate::config::{FieldOption, FieldProps, FormDefinition};
    use crate::schema::build_schema_at;
    use crate::types::ErrorKind;
    use crate::visibility::{Operator, VisibilityCondition};

    fn form(fields: Vec<FieldConfig>, values: FormValues) -> FormController {
        let definition = FormDefinition::new(fields).expect("valid form");
        let today = chrono::NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid");
        let schema = build_schema_at(&definition.fields, today);
        let mut controller = FormController::with_schema(definition, schema);
        controller.reset(values);
        controller
    }

    fn pet_name() -> FieldConfig {
        FieldConfig::new("petName", "What is your pet's name?")
            .required()
            .visible_if(VisibilityCondition::new("havepets", Operator::Eq, "yes"))
    }

    #[test]
    fn structural_error_blocks_success() {
        let age = FieldConfig::new("age", "Age")
            .kind(ValidationKind::Number)
            .required()
            .props(FieldProps {
                min: Some(18.0),
                ..FieldProps::default()
            });
        let mut controller = form(vec![age], [("age", "17")].into_iter().collect());
        let succeeded = Cell::new(false);
        let outcome = controller.smart_submit(|_| succeeded.set(true), |_| {});
        assert!(!succeeded.get());
        let SubmitOutcome::Rejected(errors) = outcome else {
            panic!("expected rejection");
        };
        assert_eq!(errors.get("age").map(|e| e.kind), Some(ErrorKind::Schema));
        assert!(controller.error("age").is_some());
    }

    #[test]
    fn hidden_conditional_field_is_stripped() {
        let values: FormValues = [("havepets", "no"), ("petName", "")].into_iter().collect();
        let mut controller = form(vec![pet_name()], values);
        let mut submitted = None;
        let outcome = controller.smart_submit(|v| submitted = Some(v.clone()), |_| {});
        assert!(outcome.is_submitted());
        let submitted = submitted.expect("success callback ran");
        assert!(!submitted.contains("petName"));
        assert_eq!(submitted.get("havepets"), Some(&Value::from("no")));
    }

    #[test]
    fn hidden_conditional_field_never_fails_the_schema() {
        let have_pets = FieldConfig::new("havepets", "Do you have pets?")
            .kind(ValidationKind::Select)
            .options(vec![FieldOption::new("Yes", "yes"), FieldOption::new("No", "no")]);
        let pet_email = FieldConfig::new("petEmail", "Pet email")
            .kind(ValidationKind::Email)
            .required()
            .visible_if(VisibilityCondition::new("havepets", Operator::Eq, "yes"));
        let values: FormValues = [("havepets", "no"), ("petEmail", "bad")].into_iter().collect();
        let mut controller = form(vec![have_pets, pet_email], values);
        let SubmitOutcome::Submitted(clean) = controller.smart_submit(|_| {}, |_| {}) else {
            panic!("expected submit");
        };
        assert!(!clean.contains("petEmail"));
        assert!(controller.error("petEmail").is_none());
    }

    #[test]
    fn chained_hidden_fields_are_stripped() {
        let fields = vec![
            FieldConfig::new("a", "A")
                .required()
                .visible_if(VisibilityCondition::new("b", Operator::Eq, "x")),
            FieldConfig::new("b", "B").visible_if(VisibilityCondition::new("c", Operator::Eq, "y")),
            FieldConfig::new("c", "C"),
        ];
        let values: FormValues = [("a", ""), ("b", "x"), ("c", "n")].into_iter().collect();
        let (clean, errors) = clean_visible_data(&fields, &values);
        assert!(errors.is_empty());
        assert!(!clean.contains("a"));
        assert!(!clean.contains("b"));
        assert_eq!(clean.get("c"), Some(&Value::from("n")));
    }

    #[test]
    fn visible_empty_conditional_field_gets_manual_error() {
        let values: FormValues = [("havepets", "yes"), ("petName", "")].into_iter().collect();
        let mut controller = form(vec![pet_name()], values);
        let succeeded = Cell::new(false);
        let reported = Cell::new(0);
        let outcome = controller.smart_submit(
            |_| succeeded.set(true),
            |errors| reported.set(errors.len()),
        );
        assert!(!succeeded.get());
        assert_eq!(reported.get(), 1);
        assert!(!outcome.is_submitted());
        assert_eq!(
            controller.error("petName"),
            Some(&FieldError::manual("What is your pet's name? is required"))
        );
    }

    #[test]
    fn visible_filled_conditional_field_is_kept() {
        let values: FormValues = [("havepets", "yes"), ("petName", " Rex ")].into_iter().collect();
        let mut controller = form(vec![pet_name()], values);
        let SubmitOutcome::Submitted(clean) = controller.smart_submit(|_| {}, |_| {}) else {
            panic!("expected submit");
        };
        assert_eq!(clean.get("petName"), Some(&Value::from("Rex")));
    }

    #[test]
    fn manual_errors_are_merged_with_schema_errors() {
        let email = FieldConfig::new("email", "Email").kind(ValidationKind::Email).required();
        let values: FormValues = [("havepets", "yes")].into_iter().collect();
        let mut controller = form(vec![email, pet_name()], values);
        let mut reported = ErrorMap::new();
        let outcome = controller.smart_submit(|_| {}, |errors| reported = errors.clone());
        assert!(!outcome.is_submitted());
        assert_eq!(reported.len(), 2);
        assert_eq!(reported.get("email").map(|e| e.kind), Some(ErrorKind::Schema));
        assert_eq!(reported.get("petName").map(|e| e.kind), Some(ErrorKind::Manual));
        assert_eq!(controller.errors(), &reported);
    }

    #[test]
    fn manual_error_wins_on_collision() {
        // A non-string value fails the text brick and is also "empty".
        let values: FormValues = [
            ("havepets", Value::from("yes")),
            ("petName", Value::Array(vec![])),
        ]
        .into_iter()
        .collect();
        let mut controller = form(vec![pet_name()], values);
        let SubmitOutcome::Rejected(errors) = controller.smart_submit(|_| {}, |_| {}) else {
            panic!("expected rejection");
        };
        assert_eq!(errors.get("petName").map(|e| e.kind), Some(ErrorKind::Manual));
    }

    #[test]
    fn clean_visible_data_ignores_unconditional_fields() {
        let plain = FieldConfig::new("name", "Name").required();
        let data: FormValues = [("name", "")].into_iter().collect();
        let (clean, errors) = clean_visible_data(&[plain], &data);
        assert_eq!(clean, data);
        assert!(errors.is_empty());
    }

    #[test]
    fn submit_count_enables_revalidation_on_change() {
        let email = FieldConfig::new("email", "Email").kind(ValidationKind::Email).required();
        let mut controller = form(vec![email], FormValues::new());
        controller.smart_submit(|_| {}, |_| {});
        assert_eq!(controller.submit_count(), 1);
        controller.change("email", Some(Value::from("a@b.io")));
        assert!(controller.error("email").is_none());
        controller.change("email", Some(Value::from("nope")));
        assert!(controller.error("email").is_some());
    }
}
