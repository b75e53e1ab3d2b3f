use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::wizard::{FieldError, StepForm};
use super::{
    format_optional_date, optional_id, parse_date_time, parse_optional_date, valid_date_time,
    valid_optional_date, ContentForm, FormMode, PersistContext,
};
use crate::helper::content_helpers;
use crate::helper::file_encoding_helpers::{
    EncodedFiles, FileRule, BANNER_MAX_BYTES, BLOG_IMAGE_MAX_BYTES, CONTENT_IMAGE_MAX_BYTES,
};
use crate::helper::sanitization_helpers::{sanitize_rich_text, split_list, strip_all_html};
use crate::helper::submission_helpers::SubmitOutcome;
use crate::models::content_models::{
    Banner, BlogPost, ConferenceSubmission, CtaButton, Faq, HistoryEntry, Internship, Journal,
    SubmissionStatus, Webinar,
};
use crate::models::{Document, Status};

/// `(created_at, updated_at)` for a record that is new or being edited.
pub(crate) fn timestamps(existing_created: Option<DateTime<Utc>>) -> (DateTime<Utc>, Option<DateTime<Utc>>) {
    let now = Utc::now();
    match existing_created {
        Some(created) => (created, Some(now)),
        None => (now, None),
    }
}

/// A newly uploaded file wins; otherwise the stored one is kept.
pub(crate) fn replace_or_keep(files: &mut EncodedFiles, field: &str, existing: Option<String>) -> Option<String> {
    files.take(field).or(existing)
}

fn required_file(files: &mut EncodedFiles, field: &str, label: &str, existing: Option<String>) -> Result<String, FieldError> {
    replace_or_keep(files, field, existing).ok_or_else(|| FieldError::new(field, format!("{} is required.", label)))
}

// ====================================================================
// ============================== BANNER ==============================
// ====================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BannerForm {
    #[validate(length(min = 1, max = 80, message = "Title line 1 is required (max 80 characters)."))]
    pub title_line1: String,
    #[validate(length(max = 80, message = "Title line 2 must be at most 80 characters."))]
    pub title_line2: String,
    #[validate(length(min = 1, max = 200, message = "Subtitle is required (max 200 characters)."))]
    pub subtitle: String,
    #[validate(length(min = 1, max = 30, message = "Primary button text is required (max 30 characters)."))]
    pub primary_button_text: String,
    #[validate(length(min = 1, message = "Primary button link is required."))]
    pub primary_button_link: String,
    #[validate(length(max = 30, message = "Secondary button text must be at most 30 characters."))]
    pub secondary_button_text: String,
    pub secondary_button_link: String,
    pub order: u32,
}

impl StepForm for BannerForm {
    const NAME: &'static str = "banner";

    fn steps() -> &'static [&'static [&'static str]] {
        &[
            &["title_line1", "title_line2", "subtitle"],
            &[
                "primary_button_text",
                "primary_button_link",
                "secondary_button_text",
                "secondary_button_link",
                "order",
            ],
        ]
    }

    fn check_consistency(&self) -> Result<(), FieldError> {
        let has_text = !self.secondary_button_text.trim().is_empty();
        let has_link = !self.secondary_button_link.trim().is_empty();
        if has_text != has_link {
            return Err(FieldError::new(
                "secondary_button_link",
                "The secondary button needs both a text and a link.",
            ));
        }
        Ok(())
    }
}

impl ContentForm for BannerForm {
    type Record = Banner;
    const LABEL: &'static str = "Banner";

    fn file_rules(mode: FormMode) -> Vec<FileRule> {
        vec![FileRule::image("image", "Banner image", BANNER_MAX_BYTES)
            .required(mode == FormMode::Add)
            .downscaled()]
    }

    fn from_record(record: &Banner) -> Self {
        Self {
            title_line1: record.title_line1.clone(),
            title_line2: record.title_line2.clone(),
            subtitle: record.subtitle.clone(),
            primary_button_text: record.primary_button.text.clone(),
            primary_button_link: record.primary_button.link.clone(),
            secondary_button_text: record.secondary_button.text.clone(),
            secondary_button_link: record.secondary_button.link.clone(),
            order: record.order,
        }
    }

    fn into_record(self, files: &mut EncodedFiles, existing: Option<&Banner>) -> Result<Banner, FieldError> {
        let image = required_file(files, "image", "Banner image", existing.map(|b| b.image.clone()))?;
        let (created_at, updated_at) = timestamps(existing.map(|b| b.created_at));
        Ok(Banner {
            title_line1: strip_all_html(&self.title_line1),
            title_line2: strip_all_html(&self.title_line2),
            subtitle: strip_all_html(&self.subtitle),
            primary_button: CtaButton {
                text: strip_all_html(&self.primary_button_text),
                link: self.primary_button_link.trim().to_string(),
            },
            secondary_button: CtaButton {
                text: strip_all_html(&self.secondary_button_text),
                link: self.secondary_button_link.trim().to_string(),
            },
            order: self.order,
            image,
            created_at,
            updated_at,
        })
    }
}

// ====================================================================
// ============================ BLOG POST =============================
// ====================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BlogPostForm {
    #[validate(length(min = 1, max = 150, message = "Title is required (max 150 characters)."))]
    pub title: String,
    #[validate(length(min = 1, max = 100, message = "Author is required."))]
    pub author: String,
    #[validate(length(min = 1, message = "Select at least one category."))]
    pub categories: Vec<String>,
    #[validate(length(min = 1, message = "Content is required."))]
    pub content: String,
    #[validate(length(min = 1, max = 300, message = "Excerpt is required (max 300 characters)."))]
    pub excerpt: String,
    #[validate(length(max = 300, message = "Keywords must be at most 300 characters."))]
    pub keywords: String,
    #[validate(length(min = 1, max = 150, message = "Describe the image for screen readers."))]
    pub image_alt: String,
    pub featured: bool,
}

impl StepForm for BlogPostForm {
    const NAME: &'static str = "blog_post";

    fn steps() -> &'static [&'static [&'static str]] {
        &[
            &["title", "author", "categories"],
            &["content", "excerpt", "keywords"],
            &["image_alt", "featured"],
        ]
    }

    fn check_consistency(&self) -> Result<(), FieldError> {
        if self.categories.iter().all(|c| c.trim().is_empty()) {
            return Err(FieldError::new("categories", "Select at least one category."));
        }
        Ok(())
    }
}

impl BlogPostForm {
    fn category_names(&self) -> Vec<String> {
        split_list(&self.categories.join(","))
    }
}

impl ContentForm for BlogPostForm {
    type Record = BlogPost;
    const LABEL: &'static str = "Blog post";

    fn file_rules(mode: FormMode) -> Vec<FileRule> {
        vec![FileRule::image("image", "Blog image", BLOG_IMAGE_MAX_BYTES).required(mode == FormMode::Add)]
    }

    fn from_record(record: &BlogPost) -> Self {
        Self {
            title: record.title.clone(),
            author: record.author.clone(),
            categories: record.categories.clone(),
            content: record.content.clone(),
            excerpt: record.excerpt.clone(),
            keywords: record.keywords.clone(),
            image_alt: record.image_alt.clone(),
            featured: record.featured,
        }
    }

    fn into_record(self, files: &mut EncodedFiles, existing: Option<&BlogPost>) -> Result<BlogPost, FieldError> {
        let image = required_file(files, "image", "Blog image", existing.map(|p| p.image.clone()))?;
        let (created_at, updated_at) = timestamps(existing.map(|p| p.created_at));
        Ok(BlogPost {
            categories: self.category_names(),
            title: strip_all_html(&self.title),
            author: strip_all_html(&self.author),
            content: sanitize_rich_text(&self.content),
            excerpt: strip_all_html(&self.excerpt),
            image,
            image_alt: strip_all_html(&self.image_alt),
            featured: self.featured,
            keywords: strip_all_html(&self.keywords),
            created_at,
            updated_at,
        })
    }

    /// Each category is ensured as its own write before the post is saved.
    /// A failure part way leaves the categories created so far in place.
    fn persist(self, ctx: &PersistContext, files: EncodedFiles, editing: Option<&str>) -> SubmitOutcome<Document<BlogPost>> {
        for name in self.category_names() {
            if let Err(e) = content_helpers::ensure_category_exists(ctx.db, &name) {
                log::error!("Failed to ensure blog category '{}': {}", name, e);
                return SubmitOutcome::failed(format!("Could not save category '{}'.", name));
            }
        }
        content_helpers::save_record(ctx.db, self, files, editing)
    }
}

// ====================================================================
// ============================= JOURNAL ==============================
// ====================================================================

fn valid_issn(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }
    let chars: Vec<char> = value.chars().collect();
    let well_formed = chars.len() == 9
        && chars[4] == '-'
        && chars[..4].iter().all(|c| c.is_ascii_digit())
        && chars[5..8].iter().all(|c| c.is_ascii_digit())
        && (chars[8].is_ascii_digit() || chars[8] == 'X');
    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::new("issn").with_message("ISSN must look like 1234-567X.".into()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct JournalForm {
    #[validate(length(min = 1, max = 150, message = "Journal name is required."))]
    pub name: String,
    #[validate(custom(function = "valid_issn"))]
    pub issn: String,
    pub editor_id: String,
    pub status: Status,
    #[validate(length(min = 1, message = "Description is required."))]
    pub description: String,
}

impl StepForm for JournalForm {
    const NAME: &'static str = "journal";

    fn steps() -> &'static [&'static [&'static str]] {
        &[&["name", "issn", "editor_id", "status"], &["description"]]
    }
}

impl ContentForm for JournalForm {
    type Record = Journal;
    const LABEL: &'static str = "Journal";

    fn file_rules(mode: FormMode) -> Vec<FileRule> {
        vec![FileRule::image("image", "Journal cover", CONTENT_IMAGE_MAX_BYTES).required(mode == FormMode::Add)]
    }

    fn from_record(record: &Journal) -> Self {
        Self {
            name: record.name.clone(),
            issn: record.issn.clone().unwrap_or_default(),
            editor_id: record.editor_id.clone().unwrap_or_default(),
            status: record.status,
            description: record.description.clone(),
        }
    }

    fn into_record(self, files: &mut EncodedFiles, existing: Option<&Journal>) -> Result<Journal, FieldError> {
        let image = required_file(files, "image", "Journal cover", existing.map(|j| j.image.clone()))?;
        let (created_at, updated_at) = timestamps(existing.map(|j| j.created_at));
        Ok(Journal {
            name: strip_all_html(&self.name),
            issn: optional_id(&self.issn),
            description: sanitize_rich_text(&self.description),
            image,
            status: self.status,
            editor_id: optional_id(&self.editor_id),
            created_at,
            updated_at,
        })
    }
}

// ====================================================================
// ============================= WEBINAR ==============================
// ====================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WebinarForm {
    #[validate(length(min = 1, max = 150, message = "Title is required (max 150 characters)."))]
    pub title: String,
    #[validate(length(min = 1, max = 100, message = "Speaker is required."))]
    pub speaker: String,
    #[validate(custom(function = "valid_date_time"))]
    pub scheduled_for: String,
    #[validate(length(min = 1, message = "Description is required."))]
    pub description: String,
    pub assigned_to: String,
    pub status: Status,
}

impl StepForm for WebinarForm {
    const NAME: &'static str = "webinar";

    fn steps() -> &'static [&'static [&'static str]] {
        &[&["title", "speaker", "scheduled_for"], &["description", "assigned_to", "status"]]
    }
}

impl ContentForm for WebinarForm {
    type Record = Webinar;
    const LABEL: &'static str = "Webinar";

    fn file_rules(mode: FormMode) -> Vec<FileRule> {
        vec![FileRule::image("image", "Webinar image", CONTENT_IMAGE_MAX_BYTES).required(mode == FormMode::Add)]
    }

    fn from_record(record: &Webinar) -> Self {
        Self {
            title: record.title.clone(),
            speaker: record.speaker.clone(),
            scheduled_for: record.scheduled_for.format(super::DATE_TIME_FORMAT).to_string(),
            description: record.description.clone(),
            assigned_to: record.assigned_to.clone().unwrap_or_default(),
            status: record.status,
        }
    }

    fn into_record(self, files: &mut EncodedFiles, existing: Option<&Webinar>) -> Result<Webinar, FieldError> {
        let scheduled_for = parse_date_time(&self.scheduled_for)
            .ok_or_else(|| FieldError::new("scheduled_for", "Enter a date and time."))?;
        let image = required_file(files, "image", "Webinar image", existing.map(|w| w.image.clone()))?;
        let (created_at, updated_at) = timestamps(existing.map(|w| w.created_at));
        Ok(Webinar {
            title: strip_all_html(&self.title),
            description: sanitize_rich_text(&self.description),
            speaker: strip_all_html(&self.speaker),
            scheduled_for,
            image,
            status: self.status,
            assigned_to: optional_id(&self.assigned_to),
            created_at,
            updated_at,
        })
    }
}

// ====================================================================
// ============================ INTERNSHIP ============================
// ====================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct InternshipForm {
    #[validate(length(min = 1, max = 150, message = "Title is required (max 150 characters)."))]
    pub title: String,
    #[validate(length(min = 1, max = 100, message = "Location is required."))]
    pub location: String,
    #[validate(length(min = 1, max = 50, message = "Duration is required."))]
    pub duration: String,
    #[validate(custom(function = "valid_optional_date"))]
    pub application_deadline: String,
    #[validate(length(min = 1, message = "Description is required."))]
    pub description: String,
    pub status: Status,
}

impl StepForm for InternshipForm {
    const NAME: &'static str = "internship";

    fn steps() -> &'static [&'static [&'static str]] {
        &[
            &["title", "location", "duration", "application_deadline"],
            &["description", "status"],
        ]
    }
}

impl ContentForm for InternshipForm {
    type Record = Internship;
    const LABEL: &'static str = "Internship";

    fn file_rules(mode: FormMode) -> Vec<FileRule> {
        vec![FileRule::image("image", "Internship image", CONTENT_IMAGE_MAX_BYTES).required(mode == FormMode::Add)]
    }

    fn from_record(record: &Internship) -> Self {
        Self {
            title: record.title.clone(),
            location: record.location.clone(),
            duration: record.duration.clone(),
            application_deadline: format_optional_date(record.application_deadline),
            description: record.description.clone(),
            status: record.status,
        }
    }

    fn into_record(self, files: &mut EncodedFiles, existing: Option<&Internship>) -> Result<Internship, FieldError> {
        let image = required_file(files, "image", "Internship image", existing.map(|i| i.image.clone()))?;
        let (created_at, updated_at) = timestamps(existing.map(|i| i.created_at));
        Ok(Internship {
            title: strip_all_html(&self.title),
            description: sanitize_rich_text(&self.description),
            location: strip_all_html(&self.location),
            duration: strip_all_html(&self.duration),
            application_deadline: parse_optional_date(&self.application_deadline),
            image,
            status: self.status,
            created_at,
            updated_at,
        })
    }
}

// ====================================================================
// =============================== FAQ ================================
// ====================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FaqForm {
    #[validate(length(min = 1, max = 300, message = "Question is required (max 300 characters)."))]
    pub question: String,
    #[validate(length(min = 1, message = "Answer is required."))]
    pub answer: String,
    pub order: u32,
    pub status: Status,
}

impl StepForm for FaqForm {
    const NAME: &'static str = "faq";

    fn steps() -> &'static [&'static [&'static str]] {
        &[&["question", "answer", "order", "status"]]
    }
}

impl ContentForm for FaqForm {
    type Record = Faq;
    const LABEL: &'static str = "FAQ";

    fn file_rules(_mode: FormMode) -> Vec<FileRule> {
        Vec::new()
    }

    fn from_record(record: &Faq) -> Self {
        Self {
            question: record.question.clone(),
            answer: record.answer.clone(),
            order: record.order,
            status: record.status,
        }
    }

    fn into_record(self, _files: &mut EncodedFiles, existing: Option<&Faq>) -> Result<Faq, FieldError> {
        let (created_at, updated_at) = timestamps(existing.map(|f| f.created_at));
        Ok(Faq {
            question: strip_all_html(&self.question),
            answer: sanitize_rich_text(&self.answer),
            order: self.order,
            status: self.status,
            created_at,
            updated_at,
        })
    }
}

// ====================================================================
// ======================== SUBMISSION REVIEW =========================
// ====================================================================

/// Review of a conference submission. Every save records the previous
/// title and status in the submission's history.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SubmissionReviewForm {
    #[validate(length(min = 1, max = 250, message = "Title is required."))]
    pub title: String,
    pub status: SubmissionStatus,
}

impl StepForm for SubmissionReviewForm {
    const NAME: &'static str = "submission_review";

    fn steps() -> &'static [&'static [&'static str]] {
        &[&["title", "status"]]
    }
}

impl ContentForm for SubmissionReviewForm {
    type Record = ConferenceSubmission;
    const LABEL: &'static str = "Submission";
    const ADDABLE: bool = false;

    fn file_rules(_mode: FormMode) -> Vec<FileRule> {
        Vec::new()
    }

    fn from_record(record: &ConferenceSubmission) -> Self {
        Self {
            title: record.title.clone(),
            status: record.status,
        }
    }

    fn into_record(
        self,
        _files: &mut EncodedFiles,
        existing: Option<&ConferenceSubmission>,
    ) -> Result<ConferenceSubmission, FieldError> {
        let existing = existing.ok_or_else(|| {
            FieldError::new("title", "Submissions are created by authors and can only be reviewed here.")
        })?;

        let mut updated = existing.clone();
        updated.history.push(HistoryEntry {
            title: existing.title.clone(),
            status: existing.status,
            recorded_at: Utc::now(),
        });
        updated.title = strip_all_html(&self.title);
        updated.status = self.status;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::wizard::Wizard;
    use serde_json::json;

    fn stored_banner() -> Banner {
        Banner {
            title_line1: "Welcome".to_string(),
            title_line2: String::new(),
            subtitle: "Research support".to_string(),
            primary_button: CtaButton {
                text: "Start".to_string(),
                link: "/start".to_string(),
            },
            secondary_button: CtaButton::default(),
            order: 2,
            image: "data:image/jpeg;base64,AAAA".to_string(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn banner_edit_keeps_image_when_none_uploaded() {
        let existing = stored_banner();
        let mut form = BannerForm::from_record(&existing);
        form.title_line1 = "Welcome back".to_string();

        let record = form.into_record(&mut EncodedFiles::default(), Some(&existing)).unwrap();
        assert_eq!(record.image, existing.image);
        assert_eq!(record.title_line1, "Welcome back");
        assert_eq!(record.created_at, existing.created_at);
        assert!(record.updated_at.is_some());
    }

    #[test]
    fn banner_image_rule_is_required_only_on_add() {
        assert!(BannerForm::file_rules(FormMode::Add)[0].required);
        assert!(!BannerForm::file_rules(FormMode::Edit)[0].required);
    }

    #[test]
    fn half_filled_secondary_button_is_rejected_at_submission() {
        let mut wizard = Wizard::<BannerForm>::new();
        wizard
            .merge(
                json!({
                    "title_line1": "Welcome",
                    "subtitle": "Research support",
                    "primary_button_text": "Start",
                    "primary_button_link": "/start",
                    "secondary_button_text": "Learn more"
                })
                .as_object()
                .cloned()
                .unwrap(),
            )
            .unwrap();
        let err = wizard.validate_all().unwrap_err();
        assert_eq!(err.field_error().unwrap().field, "secondary_button_link");
        assert_eq!(wizard.step(), 1);
    }

    #[test]
    fn any_non_negative_order_is_accepted() {
        let mut wizard = Wizard::with_values(BannerForm {
            title_line1: "Welcome".to_string(),
            subtitle: "Research support".to_string(),
            primary_button_text: "Start".to_string(),
            primary_button_link: "/start".to_string(),
            order: 25_000,
            ..Default::default()
        });
        assert!(wizard.validate_all().is_ok());

        let mut faq = Wizard::with_values(FaqForm {
            question: "Do you edit theses?".to_string(),
            answer: "Yes.".to_string(),
            order: 4_000,
            status: Status::Active,
        });
        assert!(faq.validate_all().is_ok());
    }

    #[test]
    fn blog_post_advance_requires_a_category() {
        let mut wizard = Wizard::<BlogPostForm>::new();
        wizard
            .merge(json!({"title": "Peer review 101", "author": "Ada"}).as_object().cloned().unwrap())
            .unwrap();
        let err = wizard.advance().unwrap_err();
        assert_eq!(err.field_error().unwrap().field, "categories");
        assert_eq!(wizard.step(), 0);
    }

    #[test]
    fn blog_content_is_sanitized() {
        let form = BlogPostForm {
            title: "<b>Peer review</b>".to_string(),
            author: "Ada".to_string(),
            categories: vec!["Research".to_string(), "research".to_string()],
            content: "<p>Hello</p><script>x()</script>".to_string(),
            excerpt: "Intro".to_string(),
            image_alt: "Desk".to_string(),
            ..Default::default()
        };
        let mut files = EncodedFiles::default();
        files.insert("image", "data:image/png;base64,AAAA".to_string());
        let record = form.into_record(&mut files, None).unwrap();
        assert_eq!(record.title, "Peer review");
        assert_eq!(record.content, "<p>Hello</p>");
        assert_eq!(record.categories, vec!["Research".to_string()]);
    }

    #[test]
    fn issn_format_is_checked() {
        assert!(valid_issn("").is_ok());
        assert!(valid_issn("2049-3630").is_ok());
        assert!(valid_issn("0317-847X").is_ok());
        assert!(valid_issn("2049/3630").is_err());
    }

    #[test]
    fn review_appends_history() {
        let submission = ConferenceSubmission {
            conference_id: "c1".to_string(),
            author_name: "Ada".to_string(),
            email: "ada@example.org".to_string(),
            title: "Draft title".to_string(),
            abstract_text: "Abstract".to_string(),
            paper_category: "AI".to_string(),
            manuscript: "data:application/pdf;base64,AAAA".to_string(),
            status: SubmissionStatus::Submitted,
            submitted_at: Utc::now(),
            history: Vec::new(),
        };
        let form = SubmissionReviewForm {
            title: "Final title".to_string(),
            status: SubmissionStatus::Accepted,
        };
        let updated = form.into_record(&mut EncodedFiles::default(), Some(&submission)).unwrap();
        assert_eq!(updated.history.len(), 1);
        assert_eq!(updated.history[0].title, "Draft title");
        assert_eq!(updated.history[0].status, SubmissionStatus::Submitted);
        assert_eq!(updated.status, SubmissionStatus::Accepted);

        let err = SubmissionReviewForm::default()
            .into_record(&mut EncodedFiles::default(), None)
            .unwrap_err();
        assert_eq!(err.field, "title");
    }
}
