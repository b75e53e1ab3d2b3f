use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::forms::wizard::{StepForm, Wizard, WizardError};
use crate::helper::file_encoding_helpers::{self, EncodeError, EncodedFiles, FileRule, UploadedFile};
use crate::helper::notification_helpers::NotificationQueue;

/// What a persistence call reports back.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubmitOutcome<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<T>,
}

impl<T> SubmitOutcome<T> {
    pub fn ok(message: impl Into<String>, record: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            record: Some(record),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            record: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] WizardError),
    #[error(transparent)]
    File(#[from] EncodeError),
    #[error("{0}")]
    Persistence(String),
}

impl SubmissionError {
    /// Field to highlight in the form, when the failure belongs to one.
    pub fn field(&self) -> Option<&str> {
        match self {
            SubmissionError::Validation(e) => e.field_error().map(|f| f.field.as_str()),
            SubmissionError::File(e) => Some(e.field()),
            SubmissionError::Persistence(_) => None,
        }
    }
}

/// Runs a finished wizard through validation, file encoding and persistence,
/// strictly in that order. Nothing reaches `persist` unless every field is
/// valid and every file is encoded.
///
/// On success the wizard is reset, a success notification is queued and
/// `on_done` sees the persisted record. On any failure the error is queued
/// and the wizard keeps its values for correction. No retries.
pub fn submit_wizard<F, T, P, D>(
    wizard: &mut Wizard<F>,
    files: &HashMap<String, UploadedFile>,
    rules: &[FileRule],
    notifications: &mut NotificationQueue,
    persist: P,
    on_done: D,
) -> Result<SubmitOutcome<T>, SubmissionError>
where
    F: StepForm,
    P: FnOnce(F, EncodedFiles, Option<&str>) -> SubmitOutcome<T>,
    D: FnOnce(&T),
{
    if let Err(e) = wizard.validate_all() {
        notifications.error(e.to_string());
        return Err(e.into());
    }

    let encoded = match file_encoding_helpers::encode_all(rules, files) {
        Ok(encoded) => encoded,
        Err(e) => {
            notifications.error(e.to_string());
            return Err(e.into());
        }
    };

    let editing = wizard.editing_id().map(str::to_string);
    let outcome = persist(wizard.values().clone(), encoded, editing.as_deref());
    if !outcome.success {
        notifications.error(outcome.message.clone());
        return Err(SubmissionError::Persistence(outcome.message));
    }

    wizard.reset();
    notifications.success(outcome.message.clone());
    if let Some(record) = &outcome.record {
        on_done(record);
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::content_forms::{BannerForm, FaqForm};
    use crate::forms::{ContentForm, FormMode};
    use crate::models::NotificationKind;
    use std::cell::Cell;

    fn valid_banner() -> BannerForm {
        BannerForm {
            title_line1: "Welcome".to_string(),
            title_line2: "to ResearchDesk".to_string(),
            subtitle: "Research support from proposal to publication".to_string(),
            primary_button_text: "Get started".to_string(),
            primary_button_link: "/contact".to_string(),
            order: 0,
            ..Default::default()
        }
    }

    #[test]
    fn mandatory_image_missing_never_reaches_the_store() {
        let mut wizard = Wizard::with_values(valid_banner());
        let mut queue = NotificationQueue::default();
        let store_called = Cell::new(false);

        let result = submit_wizard(
            &mut wizard,
            &HashMap::new(),
            &BannerForm::file_rules(FormMode::Add),
            &mut queue,
            |_, _, _| {
                store_called.set(true);
                SubmitOutcome::ok("saved", ())
            },
            |_| {},
        );

        assert!(matches!(result, Err(SubmissionError::File(EncodeError::Missing { .. }))));
        assert!(!store_called.get());
        assert_eq!(queue.last().unwrap().r#type, NotificationKind::Error);
        assert_eq!(wizard.values().title_line1, "Welcome");
    }

    #[test]
    fn invalid_values_never_reach_the_store() {
        let mut wizard = Wizard::with_values(FaqForm::default());
        let mut queue = NotificationQueue::default();
        let store_called = Cell::new(false);

        let result = submit_wizard(
            &mut wizard,
            &HashMap::new(),
            &[],
            &mut queue,
            |_, _, _| {
                store_called.set(true);
                SubmitOutcome::ok("saved", ())
            },
            |_| {},
        );

        assert!(matches!(result, Err(SubmissionError::Validation(_))));
        assert_eq!(result.unwrap_err().field(), Some("question"));
        assert!(!store_called.get());
    }

    #[test]
    fn persistence_failure_keeps_the_draft_and_surfaces_the_message() {
        let form = FaqForm {
            question: "How long does review take?".to_string(),
            answer: "Usually four to six weeks.".to_string(),
            ..Default::default()
        };
        let mut wizard = Wizard::with_values(form);
        let mut queue = NotificationQueue::default();
        let done_called = Cell::new(false);

        let result: Result<SubmitOutcome<()>, _> = submit_wizard(
            &mut wizard,
            &HashMap::new(),
            &[],
            &mut queue,
            |_, _, _| SubmitOutcome::failed("A user with this email already exists."),
            |_| done_called.set(true),
        );

        assert_eq!(
            result.unwrap_err().to_string(),
            "A user with this email already exists."
        );
        assert_eq!(queue.last().unwrap().message, "A user with this email already exists.");
        assert_eq!(wizard.values().question, "How long does review take?");
        assert!(!done_called.get());
    }

    #[test]
    fn success_resets_the_wizard_and_calls_done() {
        let form = FaqForm {
            question: "Do you offer plagiarism checks?".to_string(),
            answer: "Yes, for every manuscript.".to_string(),
            ..Default::default()
        };
        let mut wizard = Wizard::editing("faq-1", form);
        let mut queue = NotificationQueue::default();
        let seen_editing = Cell::new(false);
        let done_with = Cell::new(0u32);

        let outcome = submit_wizard(
            &mut wizard,
            &HashMap::new(),
            &[],
            &mut queue,
            |_, _, editing| {
                seen_editing.set(editing == Some("faq-1"));
                SubmitOutcome::ok("FAQ updated successfully.", 7u32)
            },
            |record| done_with.set(*record),
        )
        .unwrap();

        assert!(outcome.success);
        assert!(seen_editing.get());
        assert_eq!(done_with.get(), 7);
        assert_eq!(wizard.values().question, "");
        assert_eq!(wizard.editing_id(), None);
        assert_eq!(queue.last().unwrap().r#type, NotificationKind::Success);
    }
}
