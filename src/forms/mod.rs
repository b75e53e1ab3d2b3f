//! Back-office and public forms.
//!
//! Every admin form is a flat, validated struct that knows its steps, its
//! file inputs and how to map itself to and from the stored record.

use chrono::{NaiveDate, NaiveDateTime};
use redb::Database;
use std::borrow::Cow;
use validator::ValidationError;

use crate::helper::content_helpers;
use crate::helper::file_encoding_helpers::{EncodedFiles, FileRule};
use crate::helper::submission_helpers::SubmitOutcome;
use crate::models::{ContentSection, Document, Record};
use crate::DbPool;

pub mod conference_forms;
pub mod content_forms;
pub mod public_forms;
pub mod sub_admin_forms;
pub mod wizard;

use wizard::{FieldError, StepForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Add,
    Edit,
}

/// Stores a persistence call may touch.
pub struct PersistContext<'a> {
    pub db: &'a Database,
    pub pool: &'a DbPool,
}

pub trait ContentForm: StepForm + Send + 'static {
    type Record: Record + Clone + Send + 'static;

    /// Used in notifications, e.g. "Banner added successfully."
    const LABEL: &'static str;

    /// `false` for forms that can only edit existing records.
    const ADDABLE: bool = true;

    fn file_rules(mode: FormMode) -> Vec<FileRule>;

    fn from_record(record: &Self::Record) -> Self;

    /// Builds the stored record. `existing` is the record being edited, used
    /// for timestamps and for files that were not replaced.
    fn into_record(self, files: &mut EncodedFiles, existing: Option<&Self::Record>) -> Result<Self::Record, FieldError>;

    fn persist(self, ctx: &PersistContext, files: EncodedFiles, editing: Option<&str>) -> SubmitOutcome<Document<Self::Record>> {
        content_helpers::save_record(ctx.db, self, files, editing)
    }
}

/// The admin forms reachable under `/api/forms/{form}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Banner,
    BlogPost,
    Conference,
    Journal,
    Webinar,
    Internship,
    Faq,
    SubAdmin,
    SubmissionReview,
}

impl FormKind {
    pub const ALL: [FormKind; 9] = [
        FormKind::Banner,
        FormKind::BlogPost,
        FormKind::Conference,
        FormKind::Journal,
        FormKind::Webinar,
        FormKind::Internship,
        FormKind::Faq,
        FormKind::SubAdmin,
        FormKind::SubmissionReview,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FormKind::Banner => "banner",
            FormKind::BlogPost => "blog_post",
            FormKind::Conference => "conference",
            FormKind::Journal => "journal",
            FormKind::Webinar => "webinar",
            FormKind::Internship => "internship",
            FormKind::Faq => "faq",
            FormKind::SubAdmin => "sub_admin",
            FormKind::SubmissionReview => "submission_review",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// `None` means only full admins may use the form.
    pub fn section(self) -> Option<ContentSection> {
        match self {
            FormKind::Banner => Some(ContentSection::Banners),
            FormKind::BlogPost => Some(ContentSection::Blog),
            FormKind::Conference => Some(ContentSection::Conferences),
            FormKind::Journal => Some(ContentSection::Journals),
            FormKind::Webinar => Some(ContentSection::Webinars),
            FormKind::Internship => Some(ContentSection::Internships),
            FormKind::Faq => Some(ContentSection::Faqs),
            FormKind::SubmissionReview => Some(ContentSection::Submissions),
            FormKind::SubAdmin => None,
        }
    }
}

pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// What an HTML `datetime-local` input posts.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Empty means "not set".
pub fn parse_optional_date(value: &str) -> Option<NaiveDate> {
    if value.trim().is_empty() {
        None
    } else {
        parse_date(value)
    }
}

pub fn parse_date_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

pub fn valid_date(value: &str) -> Result<(), ValidationError> {
    match parse_date(value) {
        Some(_) => Ok(()),
        None => Err(invalid("date", "Enter a date as YYYY-MM-DD.")),
    }
}

pub fn valid_optional_date(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Ok(());
    }
    valid_date(value)
}

pub fn valid_date_time(value: &str) -> Result<(), ValidationError> {
    match parse_date_time(value) {
        Some(_) => Ok(()),
        None => Err(invalid("date_time", "Enter a date and time.")),
    }
}

pub fn format_optional_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default()
}

/// Empty strings mean "no reference".
pub fn optional_id(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// A date that passed validation but still fails to parse is reported on
/// its own field instead of panicking.
pub fn require_date(field: &str, value: &str) -> Result<NaiveDate, FieldError> {
    parse_date(value).ok_or_else(|| FieldError::new(field, "Enter a date as YYYY-MM-DD."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_kinds_round_trip() {
        for kind in FormKind::ALL {
            assert_eq!(FormKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(FormKind::SubAdmin.section(), None);
    }

    #[test]
    fn dates_accept_html_input_formats() {
        assert!(valid_date("2026-03-14").is_ok());
        assert!(valid_date("14/03/2026").is_err());
        assert!(valid_optional_date("").is_ok());
        assert!(valid_date_time("2026-03-14T09:30").is_ok());
        assert!(valid_date_time("2026-03-14").is_err());
    }
}
