//! Multi-step form state.
//!
//! A [`Wizard`] owns the values of one form across all of its steps. Moving
//! forward only checks the fields that belong to the current step; the full
//! schema (plus cross-field rules) is checked once, at submission.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

/// A form whose fields are split across ordered steps.
pub trait StepForm: Validate + Default + Clone + Serialize + DeserializeOwned {
    /// Stable name used for drafts and URLs.
    const NAME: &'static str;

    /// Field names owned by each step, in display order.
    fn steps() -> &'static [&'static [&'static str]];

    /// Rules spanning several fields. Only checked at submission.
    fn check_consistency(&self) -> Result<(), FieldError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WizardError {
    #[error("{}", .error.message)]
    Invalid { step: usize, error: FieldError },
    #[error("This is the last step. Submit the form instead.")]
    AtFinalStep,
    #[error("Form data could not be read: {0}")]
    Malformed(String),
}

impl WizardError {
    pub fn field_error(&self) -> Option<&FieldError> {
        match self {
            WizardError::Invalid { error, .. } => Some(error),
            _ => None,
        }
    }
}

fn humanize(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => spaced,
    }
}

/// First failing field among `fields`, in their declared order.
pub fn first_error_in(errors: &ValidationErrors, fields: &[&str]) -> Option<FieldError> {
    let field_errors = errors.field_errors();
    fields.iter().find_map(|field| {
        let failures = field_errors.get(*field)?;
        let failure = failures.first()?;
        let message = failure
            .message
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_else(|| format!("{} is invalid.", humanize(field)));
        Some(FieldError::new(field, message))
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wizard<F> {
    step: usize,
    values: F,
    /// Id of the record being edited; `None` while adding.
    editing: Option<String>,
}

impl<F: StepForm> Default for Wizard<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: StepForm> Wizard<F> {
    pub fn new() -> Self {
        Self {
            step: 0,
            values: F::default(),
            editing: None,
        }
    }

    /// Starts an edit of an existing record, pre-populated with its values.
    pub fn editing(id: impl Into<String>, values: F) -> Self {
        Self {
            step: 0,
            values,
            editing: Some(id.into()),
        }
    }

    /// Single-page forms that arrive complete in one request.
    pub fn with_values(values: F) -> Self {
        Self {
            step: F::steps().len().saturating_sub(1),
            values,
            editing: None,
        }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn step_count(&self) -> usize {
        F::steps().len().max(1)
    }

    pub fn is_final_step(&self) -> bool {
        self.step + 1 >= self.step_count()
    }

    pub fn step_fields(&self) -> &'static [&'static str] {
        F::steps().get(self.step).copied().unwrap_or(&[])
    }

    pub fn values(&self) -> &F {
        &self.values
    }

    pub fn editing_id(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    /// Which step owns `field`, if any.
    pub fn step_of(field: &str) -> Option<usize> {
        F::steps().iter().position(|fields| fields.contains(&field))
    }

    /// Overlays posted values onto the draft. Unknown keys are ignored by the
    /// form's deserializer; a value of the wrong type leaves the draft untouched.
    pub fn merge(&mut self, patch: Map<String, Value>) -> Result<(), WizardError> {
        let mut current = match serde_json::to_value(&self.values) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => return Err(WizardError::Malformed(e.to_string())),
        };
        for (key, value) in patch {
            current.insert(key, value);
        }
        self.values = serde_json::from_value(Value::Object(current))
            .map_err(|e| WizardError::Malformed(e.to_string()))?;
        Ok(())
    }

    /// Validates the current step's fields and moves forward on success.
    pub fn advance(&mut self) -> Result<usize, WizardError> {
        if self.is_final_step() {
            return Err(WizardError::AtFinalStep);
        }
        if let Err(errors) = self.values.validate() {
            if let Some(error) = first_error_in(&errors, self.step_fields()) {
                return Err(WizardError::Invalid {
                    step: self.step,
                    error,
                });
            }
        }
        self.step += 1;
        Ok(self.step)
    }

    /// Moves back one step without validating anything.
    pub fn retreat(&mut self) -> usize {
        self.step = self.step.saturating_sub(1);
        self.step
    }

    /// Full-schema check run at submission. On failure the wizard moves back
    /// to the step that owns the first failing field.
    pub fn validate_all(&mut self) -> Result<(), WizardError> {
        if let Err(errors) = self.values.validate() {
            for (step, fields) in F::steps().iter().enumerate() {
                if let Some(error) = first_error_in(&errors, fields) {
                    self.step = step;
                    return Err(WizardError::Invalid { step, error });
                }
            }
            // Errors on fields that no step lists.
            let field_errors = errors.field_errors();
            let stray: Vec<&str> = field_errors.keys().map(|k| &**k).collect();
            if let Some(error) = first_error_in(&errors, &stray) {
                return Err(WizardError::Invalid {
                    step: self.step,
                    error,
                });
            }
        }

        if let Err(error) = self.values.check_consistency() {
            let step = Self::step_of(&error.field).unwrap_or(self.step);
            self.step = step;
            return Err(WizardError::Invalid { step, error });
        }
        Ok(())
    }

    /// Back to a blank form on the first step.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
    #[serde(default)]
    struct ProfileForm {
        #[validate(length(min = 1, message = "Name is required."))]
        name: String,
        #[validate(email(message = "A valid email is required."))]
        email: String,
        #[validate(length(min = 10, message = "Bio must be at least 10 characters."))]
        bio: String,
    }

    impl StepForm for ProfileForm {
        const NAME: &'static str = "profile";

        fn steps() -> &'static [&'static [&'static str]] {
            &[&["name", "email"], &["bio"]]
        }
    }

    fn patch(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("patch must be an object"),
        }
    }

    #[test]
    fn advance_with_missing_required_field_keeps_step() {
        let mut wizard = Wizard::<ProfileForm>::new();
        wizard.merge(patch(json!({"email": "a@b.org"}))).unwrap();

        let err = wizard.advance().unwrap_err();
        assert_eq!(wizard.step(), 0);
        assert_eq!(err.field_error().unwrap().field, "name");
        assert_eq!(err.to_string(), "Name is required.");
    }

    #[test]
    fn advance_only_checks_current_step() {
        let mut wizard = Wizard::<ProfileForm>::new();
        wizard.merge(patch(json!({"name": "Ada", "email": "ada@example.org"}))).unwrap();
        // `bio` is invalid but belongs to step 1.
        assert_eq!(wizard.advance().unwrap(), 1);
        assert!(wizard.is_final_step());
        assert_eq!(wizard.advance().unwrap_err(), WizardError::AtFinalStep);
    }

    #[test]
    fn first_error_follows_declared_field_order() {
        let mut wizard = Wizard::<ProfileForm>::new();
        let err = wizard.advance().unwrap_err();
        assert_eq!(err.field_error().unwrap().field, "name");
    }

    #[test]
    fn retreat_never_validates_and_stops_at_zero() {
        let mut wizard = Wizard::<ProfileForm>::new();
        wizard.merge(patch(json!({"name": "Ada", "email": "ada@example.org"}))).unwrap();
        wizard.advance().unwrap();
        wizard.merge(patch(json!({"name": ""}))).unwrap();
        assert_eq!(wizard.retreat(), 0);
        assert_eq!(wizard.retreat(), 0);
    }

    #[test]
    fn final_validation_returns_to_the_offending_step() {
        let mut wizard = Wizard::<ProfileForm>::new();
        wizard.merge(patch(json!({"name": "Ada", "email": "ada@example.org"}))).unwrap();
        wizard.advance().unwrap();
        wizard
            .merge(patch(json!({"bio": "Wrote the first program.", "email": "not-an-email"})))
            .unwrap();

        let err = wizard.validate_all().unwrap_err();
        assert_eq!(wizard.step(), 0);
        assert!(matches!(err, WizardError::Invalid { step: 0, .. }));
        assert_eq!(err.field_error().unwrap().field, "email");
    }

    #[test]
    fn wrong_value_type_leaves_draft_untouched() {
        let mut wizard = Wizard::<ProfileForm>::new();
        wizard.merge(patch(json!({"name": "Ada"}))).unwrap();
        let err = wizard.merge(patch(json!({"name": 42}))).unwrap_err();
        assert!(matches!(err, WizardError::Malformed(_)));
        assert_eq!(wizard.values().name, "Ada");
    }

    #[test]
    fn reset_clears_values_and_step() {
        let mut wizard = Wizard::<ProfileForm>::editing("abc", ProfileForm {
            name: "Ada".to_string(),
            ..Default::default()
        });
        wizard.reset();
        assert_eq!(wizard.step(), 0);
        assert_eq!(wizard.values().name, "");
        assert_eq!(wizard.editing_id(), None);
    }
}
