use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{Collection, ContentSection, Record, Status};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct CtaButton {
    pub text: String,
    pub link: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub title_line1: String,
    pub title_line2: String,
    pub subtitle: String,
    pub primary_button: CtaButton,
    pub secondary_button: CtaButton,
    pub order: u32,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub title: String,
    pub categories: Vec<String>,
    pub author: String,
    pub content: String,
    pub excerpt: String,
    pub image: String,
    pub image_alt: String,
    pub featured: bool,
    pub keywords: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlogCategory {
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConferenceMode {
    Physical,
    Virtual,
    Hybrid,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conference {
    pub title: String,
    pub short_title: String,
    pub tagline: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub venue: String,
    pub country: String,
    pub modes: BTreeSet<ConferenceMode>,
    pub about: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub committee: String,
    pub speakers: String,
    pub editorial_board: String,
    pub submission_start: Option<NaiveDate>,
    pub submission_end: Option<NaiveDate>,
    pub full_paper_deadline: Option<NaiveDate>,
    pub registration_deadline: Option<NaiveDate>,
    pub paper_categories: BTreeSet<String>,
    pub logo: Option<String>,
    pub paper_template: Option<String>,
    pub status: Status,
    pub editor_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    Submitted,
    UnderReview,
    Accepted,
    Rejected,
}

/// Snapshot of a submission taken right before a review edit.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub title: String,
    pub status: SubmissionStatus,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceSubmission {
    pub conference_id: String,
    pub author_name: String,
    pub email: String,
    pub title: String,
    pub abstract_text: String,
    pub paper_category: String,
    pub manuscript: String,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Journal {
    pub name: String,
    pub issn: Option<String>,
    pub description: String,
    pub image: String,
    pub status: Status,
    pub editor_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Webinar {
    pub title: String,
    pub description: String,
    pub speaker: String,
    pub scheduled_for: NaiveDateTime,
    pub image: String,
    pub status: Status,
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebinarRegistration {
    pub webinar_id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub organization: String,
    pub consent: bool,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Internship {
    pub title: String,
    pub description: String,
    pub location: String,
    pub duration: String,
    pub application_deadline: Option<NaiveDate>,
    pub image: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Faq {
    pub question: String,
    pub answer: String,
    pub order: u32,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubAdmin {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub designation: String,
    pub permissions: BTreeSet<ContentSection>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationRole {
    Presenter,
    Attendee,
    Reviewer,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "inquiryType", rename_all = "snake_case")]
pub enum InquiryKind {
    #[serde(rename_all = "camelCase")]
    Consultation {
        name: String,
        email: String,
        phone: String,
        service_area: String,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    PublicationSupport {
        name: String,
        email: String,
        manuscript_title: String,
        target_journal: String,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    ConferenceParticipation {
        name: String,
        email: String,
        conference_id: String,
        participation: ParticipationRole,
        message: String,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    #[serde(flatten)]
    pub kind: InquiryKind,
    pub submitted_at: DateTime<Utc>,
}

impl Record for Banner {
    const COLLECTION: Collection = Collection::HeroBanners;
}

impl Record for BlogPost {
    const COLLECTION: Collection = Collection::BlogPosts;
}

impl Record for BlogCategory {
    const COLLECTION: Collection = Collection::BlogCategories;
}

impl Record for Conference {
    const COLLECTION: Collection = Collection::Conferences;
}

impl Record for ConferenceSubmission {
    const COLLECTION: Collection = Collection::ConferenceSubmissions;
}

impl Record for Journal {
    const COLLECTION: Collection = Collection::Journals;
}

impl Record for Webinar {
    const COLLECTION: Collection = Collection::Webinars;
}

impl Record for WebinarRegistration {
    const COLLECTION: Collection = Collection::WebinarRegistrations;
}

impl Record for Internship {
    const COLLECTION: Collection = Collection::Internships;
}

impl Record for Faq {
    const COLLECTION: Collection = Collection::Faqs;
}

impl Record for SubAdmin {
    const COLLECTION: Collection = Collection::SubAdmins;
}

impl Record for Inquiry {
    const COLLECTION: Collection = Collection::Inquiries;
}
