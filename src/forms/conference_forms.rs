use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::Validate;

use super::content_forms::{replace_or_keep, timestamps};
use super::wizard::{FieldError, StepForm};
use super::{
    format_optional_date, optional_id, parse_optional_date, require_date, valid_date, valid_optional_date,
    ContentForm, FormMode, DATE_FORMAT,
};
use crate::helper::file_encoding_helpers::{EncodedFiles, FileRule, LOGO_MAX_BYTES, TEMPLATE_MAX_BYTES};
use crate::helper::sanitization_helpers::{sanitize_rich_text, split_list, strip_all_html};
use crate::models::content_models::{Conference, ConferenceMode};
use crate::models::Status;

/// Five-step conference editor. Dates travel as `YYYY-MM-DD` strings the way
/// HTML date inputs post them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ConferenceForm {
    // Step 1: identity and dates.
    #[validate(length(min = 1, max = 200, message = "Title is required (max 200 characters)."))]
    pub title: String,
    #[validate(length(min = 1, max = 30, message = "Short title is required (max 30 characters)."))]
    pub short_title: String,
    #[validate(length(max = 200, message = "Tagline must be at most 200 characters."))]
    pub tagline: String,
    #[validate(custom(function = "valid_date"))]
    pub start_date: String,
    #[validate(custom(function = "valid_date"))]
    pub end_date: String,

    // Step 2: where and how.
    #[validate(length(min = 1, max = 200, message = "Venue is required."))]
    pub venue: String,
    #[validate(length(min = 1, max = 100, message = "Country is required."))]
    pub country: String,
    #[validate(length(min = 1, message = "Select at least one conference mode."))]
    pub modes: Vec<ConferenceMode>,

    // Step 3: about and contact.
    #[validate(length(min = 1, message = "About is required."))]
    pub about: String,
    #[validate(email(message = "A valid contact email is required."))]
    pub contact_email: String,
    #[validate(length(min = 5, max = 30, message = "A contact phone number is required."))]
    pub contact_phone: String,

    // Step 4: people.
    pub committee: String,
    pub speakers: String,
    pub editorial_board: String,

    // Step 5: deadlines and publishing.
    #[validate(custom(function = "valid_optional_date"))]
    pub submission_start: String,
    #[validate(custom(function = "valid_optional_date"))]
    pub submission_end: String,
    #[validate(custom(function = "valid_optional_date"))]
    pub full_paper_deadline: String,
    #[validate(custom(function = "valid_optional_date"))]
    pub registration_deadline: String,
    /// Comma separated.
    pub paper_categories: String,
    pub status: Status,
    pub editor_id: String,
}

impl StepForm for ConferenceForm {
    const NAME: &'static str = "conference";

    fn steps() -> &'static [&'static [&'static str]] {
        &[
            &["title", "short_title", "tagline", "start_date", "end_date"],
            &["venue", "country", "modes"],
            &["about", "contact_email", "contact_phone"],
            &["committee", "speakers", "editorial_board"],
            &[
                "submission_start",
                "submission_end",
                "full_paper_deadline",
                "registration_deadline",
                "paper_categories",
                "status",
                "editor_id",
            ],
        ]
    }

    fn check_consistency(&self) -> Result<(), FieldError> {
        let start = require_date("start_date", &self.start_date)?;
        let end = require_date("end_date", &self.end_date)?;
        if end < start {
            return Err(FieldError::new("end_date", "End date cannot be before the start date."));
        }

        if let (Some(open), Some(close)) = (
            parse_optional_date(&self.submission_start),
            parse_optional_date(&self.submission_end),
        ) {
            if close < open {
                return Err(FieldError::new(
                    "submission_end",
                    "Submissions cannot close before they open.",
                ));
            }
        }
        Ok(())
    }
}

impl ContentForm for ConferenceForm {
    type Record = Conference;
    const LABEL: &'static str = "Conference";

    fn file_rules(_mode: FormMode) -> Vec<FileRule> {
        vec![
            FileRule::image("logo", "Conference logo", LOGO_MAX_BYTES),
            FileRule::document("paper_template", "Paper template", TEMPLATE_MAX_BYTES),
        ]
    }

    fn from_record(record: &Conference) -> Self {
        Self {
            title: record.title.clone(),
            short_title: record.short_title.clone(),
            tagline: record.tagline.clone(),
            start_date: record.start_date.format(DATE_FORMAT).to_string(),
            end_date: record.end_date.format(DATE_FORMAT).to_string(),
            venue: record.venue.clone(),
            country: record.country.clone(),
            modes: record.modes.iter().copied().collect(),
            about: record.about.clone(),
            contact_email: record.contact_email.clone(),
            contact_phone: record.contact_phone.clone(),
            committee: record.committee.clone(),
            speakers: record.speakers.clone(),
            editorial_board: record.editorial_board.clone(),
            submission_start: format_optional_date(record.submission_start),
            submission_end: format_optional_date(record.submission_end),
            full_paper_deadline: format_optional_date(record.full_paper_deadline),
            registration_deadline: format_optional_date(record.registration_deadline),
            paper_categories: record.paper_categories.iter().cloned().collect::<Vec<_>>().join(", "),
            status: record.status,
            editor_id: record.editor_id.clone().unwrap_or_default(),
        }
    }

    fn into_record(self, files: &mut EncodedFiles, existing: Option<&Conference>) -> Result<Conference, FieldError> {
        let start_date = require_date("start_date", &self.start_date)?;
        let end_date = require_date("end_date", &self.end_date)?;
        let logo = replace_or_keep(files, "logo", existing.and_then(|c| c.logo.clone()));
        let paper_template = replace_or_keep(files, "paper_template", existing.and_then(|c| c.paper_template.clone()));
        let (created_at, updated_at) = timestamps(existing.map(|c| c.created_at));

        Ok(Conference {
            title: strip_all_html(&self.title),
            short_title: strip_all_html(&self.short_title),
            tagline: strip_all_html(&self.tagline),
            start_date,
            end_date,
            venue: strip_all_html(&self.venue),
            country: strip_all_html(&self.country),
            modes: self.modes.into_iter().collect(),
            about: sanitize_rich_text(&self.about),
            contact_email: self.contact_email.trim().to_string(),
            contact_phone: strip_all_html(&self.contact_phone),
            committee: sanitize_rich_text(&self.committee),
            speakers: sanitize_rich_text(&self.speakers),
            editorial_board: sanitize_rich_text(&self.editorial_board),
            submission_start: parse_optional_date(&self.submission_start),
            submission_end: parse_optional_date(&self.submission_end),
            full_paper_deadline: parse_optional_date(&self.full_paper_deadline),
            registration_deadline: parse_optional_date(&self.registration_deadline),
            paper_categories: split_list(&self.paper_categories).into_iter().collect::<BTreeSet<_>>(),
            logo,
            paper_template,
            status: self.status,
            editor_id: optional_id(&self.editor_id),
            created_at,
            updated_at,
        })
    }
}
