use chrono::{NaiveDate, Utc};
use redb::Database;
use serde::Serialize;

use crate::forms::public_forms::{ConferenceSubmissionForm, InquiryForm, WebinarRegistrationForm};
use crate::helper::content_helpers;
use crate::helper::file_encoding_helpers::EncodedFiles;
use crate::helper::sanitization_helpers::strip_all_html;
use crate::helper::submission_helpers::SubmitOutcome;
use crate::models::content_models::{
    Banner, BlogCategory, BlogPost, Conference, ConferenceSubmission, Faq, Inquiry, InquiryKind, Internship,
    Journal, SubAdmin, SubmissionStatus, Webinar, WebinarRegistration,
};
use crate::models::db_operations::documents_db_operations::{self as documents, DbError, Query, SortDirection};
use crate::models::{Document, Record, Status};

/// A listed record plus the display name of the sub-admin it points at.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listed<T> {
    #[serde(flatten)]
    pub item: Document<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_name: Option<String>,
}

/// A malformed id cannot name a stored document, so it reads as absent.
fn lookup<R: Record>(db: &Database, id: &str) -> Result<Option<Document<R>>, DbError> {
    match documents::get_document::<R>(db, id) {
        Err(DbError::Uuid(_)) => Ok(None),
        other => other,
    }
}

fn active<R: Record>(db: &Database) -> Result<Vec<Document<R>>, DbError> {
    documents::query_documents::<R>(db, &Query::new().where_eq("status", Status::Active.as_str()))
}

pub fn list_banners(db: &Database) -> Result<Vec<Document<Banner>>, DbError> {
    let mut banners = documents::get_all_documents::<Banner>(db)?;
    content_helpers::sort_banners(&mut banners);
    Ok(banners)
}

pub fn list_posts(
    db: &Database,
    category: Option<&str>,
    limit: usize,
    offset: usize,
) -> Result<Vec<Document<BlogPost>>, DbError> {
    let mut posts = documents::get_all_documents::<BlogPost>(db)?;
    if let Some(category) = category.filter(|c| !c.trim().is_empty()) {
        posts.retain(|p| content_helpers::post_in_category(&p.data, category));
    }
    content_helpers::sort_posts_newest_first(&mut posts);
    Ok(posts.into_iter().skip(offset).take(limit).collect())
}

pub fn featured_post(db: &Database) -> Result<Option<Document<BlogPost>>, DbError> {
    let posts = documents::get_all_documents::<BlogPost>(db)?;
    Ok(content_helpers::select_primary_post(&posts).cloned())
}

pub fn fetch_post_by_id(db: &Database, id: &str) -> Result<Option<Document<BlogPost>>, DbError> {
    lookup::<BlogPost>(db, id)
}

pub fn list_categories(db: &Database) -> Result<Vec<Document<BlogCategory>>, DbError> {
    let mut categories = documents::get_all_documents::<BlogCategory>(db)?;
    categories.sort_by_key(|c| c.data.name.to_lowercase());
    Ok(categories)
}

pub fn list_conferences(db: &Database, include_past: bool, today: NaiveDate) -> Result<Vec<Listed<Conference>>, DbError> {
    let sub_admins = documents::get_all_documents::<SubAdmin>(db)?;
    let conferences = content_helpers::visible_conferences(documents::get_all_documents(db)?, today, include_past);
    Ok(conferences
        .into_iter()
        .map(|item| Listed {
            editor_name: content_helpers::resolve_sub_admin_name(&sub_admins, item.data.editor_id.as_deref()),
            assignee_name: None,
            item,
        })
        .collect())
}

/// Inactive conferences are invisible here, past ones are not.
pub fn fetch_conference(db: &Database, id: &str) -> Result<Option<Document<Conference>>, DbError> {
    Ok(lookup::<Conference>(db, id)?.filter(|c| c.data.status == Status::Active))
}

pub fn list_journals(db: &Database) -> Result<Vec<Listed<Journal>>, DbError> {
    let sub_admins = documents::get_all_documents::<SubAdmin>(db)?;
    let mut journals = active::<Journal>(db)?;
    journals.sort_by_key(|j| j.data.name.to_lowercase());
    Ok(journals
        .into_iter()
        .map(|item| Listed {
            editor_name: content_helpers::resolve_sub_admin_name(&sub_admins, item.data.editor_id.as_deref()),
            assignee_name: None,
            item,
        })
        .collect())
}

pub fn list_webinars(db: &Database) -> Result<Vec<Listed<Webinar>>, DbError> {
    let sub_admins = documents::get_all_documents::<SubAdmin>(db)?;
    let mut webinars = active::<Webinar>(db)?;
    webinars.sort_by_key(|w| w.data.scheduled_for);
    Ok(webinars
        .into_iter()
        .map(|item| Listed {
            assignee_name: content_helpers::resolve_sub_admin_name(&sub_admins, item.data.assigned_to.as_deref()),
            editor_name: None,
            item,
        })
        .collect())
}

pub fn list_internships(db: &Database) -> Result<Vec<Document<Internship>>, DbError> {
    let mut internships = active::<Internship>(db)?;
    internships.sort_by(|a, b| b.data.created_at.cmp(&a.data.created_at));
    Ok(internships)
}

pub fn list_faqs(db: &Database) -> Result<Vec<Document<Faq>>, DbError> {
    documents::query_documents::<Faq>(
        db,
        &Query::new()
            .where_eq("status", Status::Active.as_str())
            .order_by("order", SortDirection::Asc),
    )
}

// ====================================================================
// ======================= VISITOR SUBMISSIONS ========================
// ====================================================================

pub fn register_for_webinar(
    db: &Database,
    webinar_id: &str,
    form: WebinarRegistrationForm,
) -> SubmitOutcome<Document<WebinarRegistration>> {
    match lookup::<Webinar>(db, webinar_id) {
        Ok(Some(webinar)) if webinar.data.status == Status::Active => {}
        Ok(_) => return SubmitOutcome::failed("This webinar is not open for registration."),
        Err(e) => {
            log::error!("Failed to load webinar {}: {}", webinar_id, e);
            return SubmitOutcome::failed("Registration failed. Please try again later.");
        }
    }

    let registration = WebinarRegistration {
        webinar_id: webinar_id.to_string(),
        full_name: strip_all_html(&form.full_name),
        email: form.email.trim().to_string(),
        phone: strip_all_html(&form.phone),
        organization: strip_all_html(&form.organization),
        consent: form.consent,
        registered_at: Utc::now(),
    };
    match documents::add_document(db, &registration) {
        Ok(id) => SubmitOutcome::ok(
            "You are registered. We will email you the joining details.",
            Document { id, data: registration },
        ),
        Err(e) => {
            log::error!("Failed to store webinar registration: {}", e);
            SubmitOutcome::failed("Registration failed. Please try again later.")
        }
    }
}

pub fn record_inquiry(db: &Database, form: InquiryForm) -> SubmitOutcome<Document<Inquiry>> {
    let inquiry = match form.into_inquiry() {
        Ok(inquiry) => inquiry,
        Err(e) => return SubmitOutcome::failed(e.message),
    };

    if let InquiryKind::ConferenceParticipation { conference_id, .. } = &inquiry.kind {
        match fetch_conference(db, conference_id) {
            Ok(Some(_)) => {}
            Ok(None) => return SubmitOutcome::failed("The selected conference is not available."),
            Err(e) => {
                log::error!("Failed to load conference {}: {}", conference_id, e);
                return SubmitOutcome::failed("Your inquiry could not be sent. Please try again later.");
            }
        }
    }

    match documents::add_document(db, &inquiry) {
        Ok(id) => SubmitOutcome::ok(
            "Thank you. Our team will get back to you shortly.",
            Document { id, data: inquiry },
        ),
        Err(e) => {
            log::error!("Failed to store inquiry: {}", e);
            SubmitOutcome::failed("Your inquiry could not be sent. Please try again later.")
        }
    }
}

/// Accepts a paper for an active conference whose submission window is open
/// on `today`, in one of its paper categories when it declares any.
pub fn submit_paper(
    db: &Database,
    conference_id: &str,
    form: ConferenceSubmissionForm,
    mut files: EncodedFiles,
    today: NaiveDate,
) -> SubmitOutcome<Document<ConferenceSubmission>> {
    let conference = match fetch_conference(db, conference_id) {
        Ok(Some(conference)) => conference.data,
        Ok(None) => return SubmitOutcome::failed("This conference is not accepting submissions."),
        Err(e) => {
            log::error!("Failed to load conference {}: {}", conference_id, e);
            return SubmitOutcome::failed("Submission failed. Please try again later.");
        }
    };

    if conference.submission_start.is_some_and(|open| today < open) {
        return SubmitOutcome::failed("Submissions for this conference are not open yet.");
    }
    if conference.submission_end.is_some_and(|close| today > close) {
        return SubmitOutcome::failed("Submissions for this conference are closed.");
    }

    let category = form.paper_category.trim();
    let paper_category = if conference.paper_categories.is_empty() {
        strip_all_html(category)
    } else {
        match conference.paper_categories.iter().find(|c| c.eq_ignore_ascii_case(category)) {
            Some(known) => known.clone(),
            None => return SubmitOutcome::failed("Choose one of the conference's paper categories."),
        }
    };

    let Some(manuscript) = files.take("manuscript") else {
        return SubmitOutcome::failed("Manuscript is required.");
    };

    let submission = ConferenceSubmission {
        conference_id: conference_id.to_string(),
        author_name: strip_all_html(&form.author_name),
        email: form.email.trim().to_string(),
        title: strip_all_html(&form.title),
        abstract_text: strip_all_html(&form.abstract_text),
        paper_category,
        manuscript,
        status: SubmissionStatus::Submitted,
        submitted_at: Utc::now(),
        history: Vec::new(),
    };
    match documents::add_document(db, &submission) {
        Ok(id) => SubmitOutcome::ok(
            "Your paper has been submitted. A confirmation will follow by email.",
            Document { id, data: submission },
        ),
        Err(e) => {
            log::error!("Failed to store conference submission: {}", e);
            SubmitOutcome::failed("Submission failed. Please try again later.")
        }
    }
}
