//! Forms posted by site visitors. Each arrives complete in one request and
//! goes through the same validate, encode, persist pipeline as admin forms.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use super::wizard::{FieldError, StepForm};
use crate::helper::file_encoding_helpers::{FileRule, MANUSCRIPT_MAX_BYTES};
use crate::helper::sanitization_helpers::strip_all_html;
use crate::models::content_models::{Inquiry, InquiryKind, ParticipationRole};

fn must_consent(value: &bool) -> Result<(), ValidationError> {
    if *value {
        Ok(())
    } else {
        Err(ValidationError::new("consent")
            .with_message("You must agree to be contacted about this webinar.".into()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WebinarRegistrationForm {
    #[validate(length(min = 1, max = 100, message = "Full name is required."))]
    pub full_name: String,
    #[validate(email(message = "A valid email is required."))]
    pub email: String,
    #[validate(length(max = 30, message = "Phone must be at most 30 characters."))]
    pub phone: String,
    #[validate(length(max = 150, message = "Organization must be at most 150 characters."))]
    pub organization: String,
    #[validate(custom(function = "must_consent"))]
    pub consent: bool,
}

impl StepForm for WebinarRegistrationForm {
    const NAME: &'static str = "webinar_registration";

    fn steps() -> &'static [&'static [&'static str]] {
        &[&["full_name", "email", "phone", "organization", "consent"]]
    }
}

// ====================================================================
// ============================ INQUIRIES =============================
// ====================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ConsultationInquiry {
    #[validate(length(min = 1, max = 100, message = "Name is required."))]
    pub name: String,
    #[validate(email(message = "A valid email is required."))]
    pub email: String,
    #[validate(length(max = 30, message = "Phone must be at most 30 characters."))]
    pub phone: String,
    #[validate(length(min = 1, max = 100, message = "Choose a service area."))]
    pub service_area: String,
    #[validate(length(min = 10, max = 3000, message = "Message must be between 10 and 3000 characters."))]
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PublicationSupportInquiry {
    #[validate(length(min = 1, max = 100, message = "Name is required."))]
    pub name: String,
    #[validate(email(message = "A valid email is required."))]
    pub email: String,
    #[validate(length(min = 1, max = 250, message = "Manuscript title is required."))]
    pub manuscript_title: String,
    #[validate(length(max = 150, message = "Target journal must be at most 150 characters."))]
    pub target_journal: String,
    #[validate(length(min = 10, max = 3000, message = "Message must be between 10 and 3000 characters."))]
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ConferenceParticipationInquiry {
    #[validate(length(min = 1, max = 100, message = "Name is required."))]
    pub name: String,
    #[validate(email(message = "A valid email is required."))]
    pub email: String,
    #[validate(length(min = 1, message = "Choose a conference."))]
    pub conference_id: String,
    #[validate(required(message = "Choose how you would like to take part."))]
    pub participation: Option<ParticipationRole>,
    #[validate(length(max = 3000, message = "Message must be at most 3000 characters."))]
    pub message: String,
}

/// A contact-form submission. The variant is picked by `inquiryType`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "inquiryType", rename_all = "snake_case")]
pub enum InquiryForm {
    Consultation(ConsultationInquiry),
    PublicationSupport(PublicationSupportInquiry),
    ConferenceParticipation(ConferenceParticipationInquiry),
}

impl Default for InquiryForm {
    fn default() -> Self {
        InquiryForm::Consultation(ConsultationInquiry::default())
    }
}

impl Validate for InquiryForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            InquiryForm::Consultation(inquiry) => inquiry.validate(),
            InquiryForm::PublicationSupport(inquiry) => inquiry.validate(),
            InquiryForm::ConferenceParticipation(inquiry) => inquiry.validate(),
        }
    }
}

impl StepForm for InquiryForm {
    const NAME: &'static str = "inquiry";

    fn steps() -> &'static [&'static [&'static str]] {
        &[&[
            "name",
            "email",
            "phone",
            "service_area",
            "manuscript_title",
            "target_journal",
            "conference_id",
            "participation",
            "message",
        ]]
    }
}

impl InquiryForm {
    pub fn into_inquiry(self) -> Result<Inquiry, FieldError> {
        let kind = match self {
            InquiryForm::Consultation(i) => InquiryKind::Consultation {
                name: strip_all_html(&i.name),
                email: i.email.trim().to_string(),
                phone: strip_all_html(&i.phone),
                service_area: strip_all_html(&i.service_area),
                message: strip_all_html(&i.message),
            },
            InquiryForm::PublicationSupport(i) => InquiryKind::PublicationSupport {
                name: strip_all_html(&i.name),
                email: i.email.trim().to_string(),
                manuscript_title: strip_all_html(&i.manuscript_title),
                target_journal: strip_all_html(&i.target_journal),
                message: strip_all_html(&i.message),
            },
            InquiryForm::ConferenceParticipation(i) => InquiryKind::ConferenceParticipation {
                participation: i
                    .participation
                    .ok_or_else(|| FieldError::new("participation", "Choose how you would like to take part."))?,
                name: strip_all_html(&i.name),
                email: i.email.trim().to_string(),
                conference_id: i.conference_id.trim().to_string(),
                message: strip_all_html(&i.message),
            },
        };
        Ok(Inquiry {
            kind,
            submitted_at: Utc::now(),
        })
    }
}

// ====================================================================
// ======================= CONFERENCE SUBMISSION ======================
// ====================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ConferenceSubmissionForm {
    #[validate(length(min = 1, max = 100, message = "Author name is required."))]
    pub author_name: String,
    #[validate(email(message = "A valid email is required."))]
    pub email: String,
    #[validate(length(min = 1, max = 250, message = "Paper title is required."))]
    pub title: String,
    #[validate(length(min = 50, max = 5000, message = "Abstract must be between 50 and 5000 characters."))]
    pub abstract_text: String,
    #[validate(length(min = 1, message = "Choose a paper category."))]
    pub paper_category: String,
}

impl StepForm for ConferenceSubmissionForm {
    const NAME: &'static str = "conference_submission";

    fn steps() -> &'static [&'static [&'static str]] {
        &[&["author_name", "email", "title", "abstract_text", "paper_category"]]
    }
}

impl ConferenceSubmissionForm {
    pub fn file_rules() -> Vec<FileRule> {
        vec![FileRule::document("manuscript", "Manuscript", MANUSCRIPT_MAX_BYTES).required(true)]
    }
}
