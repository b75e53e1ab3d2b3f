mod common;

use chrono::NaiveDate;
use image::{DynamicImage, ImageFormat, RgbImage};
use researchdesk_backend::forms::content_forms::BannerForm;
use researchdesk_backend::forms::public_forms::{
    ConferenceParticipationInquiry, ConferenceSubmissionForm, InquiryForm, WebinarRegistrationForm,
};
use researchdesk_backend::forms::sub_admin_forms::SubAdminForm;
use researchdesk_backend::forms::wizard::Wizard;
use researchdesk_backend::forms::{ContentForm, FormMode};
use researchdesk_backend::helper::content_helpers::{self, DUPLICATE_EMAIL_MESSAGE};
use researchdesk_backend::helper::file_encoding_helpers::{self, EncodedFiles, UploadedFile, HERO_MAX_WIDTH};
use researchdesk_backend::helper::notification_helpers::NotificationQueue;
use researchdesk_backend::helper::public_helpers;
use researchdesk_backend::helper::submission_helpers::{submit_wizard, SubmissionError, SubmitOutcome};
use researchdesk_backend::models::content_models::{Banner, ParticipationRole, SubAdmin, WebinarRegistration};
use researchdesk_backend::models::db_operations::accounts_db_operations;
use researchdesk_backend::models::db_operations::documents_db_operations as documents;
use researchdesk_backend::models::{ContentSection, NotificationKind, Status};
use std::collections::HashMap;
use std::io::Cursor;

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
        .expect("encode test jpeg");
    bytes
}

fn upload(field: &str, file_name: &str, content_type: &str, bytes: Vec<u8>) -> HashMap<String, UploadedFile> {
    HashMap::from([(
        field.to_string(),
        UploadedFile {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            bytes,
        },
    )])
}

#[test]
fn banner_with_image_is_stored_and_announced() {
    let stores = common::TestStores::new();
    let mut wizard = Wizard::with_values(BannerForm {
        title_line1: "Welcome".to_string(),
        title_line2: "to ResearchDesk".to_string(),
        subtitle: "Research support from proposal to publication".to_string(),
        primary_button_text: "Get started".to_string(),
        primary_button_link: "/contact".to_string(),
        order: 0,
        ..Default::default()
    });
    let files = upload("image", "hero.jpg", "image/jpeg", jpeg(800, 600));
    let mut queue = NotificationQueue::default();
    let ctx = stores.ctx();

    let outcome = submit_wizard(
        &mut wizard,
        &files,
        &BannerForm::file_rules(FormMode::Add),
        &mut queue,
        |form, encoded, editing| form.persist(&ctx, encoded, editing),
        |_| {},
    )
    .expect("banner should be saved");

    assert_eq!(outcome.message, "Banner added successfully.");
    let last = queue.last().expect("a notification");
    assert_eq!(last.message, "Banner added successfully.");
    assert_eq!(last.r#type, NotificationKind::Success);
    assert_eq!(wizard.step(), 0);

    let banners = documents::get_all_documents::<Banner>(&stores.db).unwrap();
    assert_eq!(banners.len(), 1);
    let (content_type, bytes) = file_encoding_helpers::decode_data_uri(&banners[0].data.image).expect("data uri");
    assert_eq!(content_type, "image/jpeg");
    let stored = image::load_from_memory(&bytes).unwrap();
    assert!(stored.width() <= HERO_MAX_WIDTH);
    assert_eq!((stored.width(), stored.height()), (800, 600));
}

fn sub_admin(email: &str) -> SubAdminForm {
    SubAdminForm {
        name: "Priya Nair".to_string(),
        email: email.to_string(),
        designation: "Editor".to_string(),
        permissions: vec![ContentSection::Blog, ContentSection::Journals],
        status: Status::Active,
        password: "correct horse".to_string(),
        ..Default::default()
    }
}

#[test]
fn duplicate_sub_admin_email_is_rejected() {
    let stores = common::TestStores::new();

    let first = sub_admin("editor@example.org").persist(&stores.ctx(), EncodedFiles::default(), None);
    assert!(first.success, "{}", first.message);
    assert_eq!(first.message, "Sub-admin added successfully.");

    let second = sub_admin("Editor@Example.org").persist(&stores.ctx(), EncodedFiles::default(), None);
    assert!(!second.success);
    assert_eq!(second.message, DUPLICATE_EMAIL_MESSAGE);
    assert_eq!(second.message, "A user with this email already exists.");

    assert_eq!(documents::get_all_documents::<SubAdmin>(&stores.db).unwrap().len(), 1);
    let conn = stores.pool.get().unwrap();
    let account = accounts_db_operations::read_account_by_email(&conn, "editor@example.org")
        .unwrap()
        .expect("account");
    assert_eq!(account.sub_admin_id, first.record.map(|doc| doc.id));
}

#[test]
fn sub_admin_without_password_is_not_created() {
    let stores = common::TestStores::new();
    let mut form = sub_admin("nopass@example.org");
    form.password.clear();

    let outcome = form.persist(&stores.ctx(), EncodedFiles::default(), None);
    assert!(!outcome.success);
    assert!(documents::get_all_documents::<SubAdmin>(&stores.db).unwrap().is_empty());
}

#[test]
fn webinar_registration_without_consent_never_reaches_the_store() {
    let stores = common::TestStores::new();
    let mut wizard = Wizard::with_values(WebinarRegistrationForm {
        full_name: "Sam Okafor".to_string(),
        email: "sam@example.org".to_string(),
        consent: false,
        ..Default::default()
    });
    let mut queue = NotificationQueue::default();
    let mut store_called = false;

    let err = submit_wizard(
        &mut wizard,
        &HashMap::new(),
        &[],
        &mut queue,
        |form, _, _| {
            store_called = true;
            public_helpers::register_for_webinar(&stores.db, "any", form)
        },
        |_| {},
    )
    .unwrap_err();

    assert!(matches!(err, SubmissionError::Validation(_)));
    assert_eq!(err.field(), Some("consent"));
    assert!(!store_called);
    assert!(documents::get_all_documents::<WebinarRegistration>(&stores.db).unwrap().is_empty());
    assert_eq!(queue.last().map(|n| n.r#type), Some(NotificationKind::Error));
}

#[test]
fn persistence_failure_keeps_the_values_for_correction() {
    let mut wizard = Wizard::with_values(WebinarRegistrationForm {
        full_name: "Sam Okafor".to_string(),
        email: "sam@example.org".to_string(),
        consent: true,
        ..Default::default()
    });
    let mut queue = NotificationQueue::default();

    let err = submit_wizard(
        &mut wizard,
        &HashMap::new(),
        &[],
        &mut queue,
        |_, _, _| SubmitOutcome::<()>::failed("This webinar is not open for registration."),
        |_| {},
    )
    .unwrap_err();

    assert_eq!(err.to_string(), "This webinar is not open for registration.");
    assert_eq!(wizard.values().full_name, "Sam Okafor");
}

#[test]
fn paper_outside_the_submission_window_is_refused() {
    let stores = common::TestStores::new();
    let conference = documents::add_raw(
        &stores.db,
        researchdesk_backend::models::Collection::Conferences,
        &serde_json::json!({
            "title": "Health Data Forum",
            "shortTitle": "HDF",
            "tagline": "",
            "startDate": "2030-09-01",
            "endDate": "2030-09-02",
            "venue": "Online",
            "country": "India",
            "modes": ["virtual"],
            "about": "",
            "contactEmail": "hdf@example.org",
            "contactPhone": "+91 555 0100",
            "committee": "",
            "speakers": "",
            "editorialBoard": "",
            "submissionStart": "2030-03-01",
            "submissionEnd": "2030-06-30",
            "fullPaperDeadline": null,
            "registrationDeadline": null,
            "paperCategories": [],
            "logo": null,
            "paperTemplate": null,
            "status": "active",
            "editorId": null,
            "createdAt": "2030-01-01T00:00:00Z",
            "updatedAt": null
        }),
    )
    .unwrap();

    let form = ConferenceSubmissionForm {
        author_name: "Ana Lima".to_string(),
        email: "ana@example.org".to_string(),
        title: "Federated cohorts".to_string(),
        abstract_text: "We study federated cohorts.".to_string(),
        paper_category: "Methods".to_string(),
    };
    let mut files = EncodedFiles::default();
    files.insert("manuscript", "data:application/pdf;base64,JVBERi0=".to_string());

    let too_late = NaiveDate::from_ymd_opt(2030, 7, 1).unwrap();
    let outcome = public_helpers::submit_paper(&stores.db, &conference, form.clone(), files.clone(), too_late);
    assert!(!outcome.success);
    assert_eq!(outcome.message, "Submissions for this conference are closed.");

    let in_window = NaiveDate::from_ymd_opt(2030, 4, 1).unwrap();
    let outcome = public_helpers::submit_paper(&stores.db, &conference, form, files, in_window);
    assert!(outcome.success, "{}", outcome.message);
}

#[test]
fn malformed_ids_read_as_unavailable_not_as_store_failures() {
    let stores = common::TestStores::new();

    let registration = public_helpers::register_for_webinar(
        &stores.db,
        "not-a-uuid",
        WebinarRegistrationForm {
            full_name: "Sam Okafor".to_string(),
            email: "sam@example.org".to_string(),
            consent: true,
            ..Default::default()
        },
    );
    assert!(!registration.success);
    assert_eq!(registration.message, "This webinar is not open for registration.");

    let inquiry = InquiryForm::ConferenceParticipation(ConferenceParticipationInquiry {
        name: "Ana Lima".to_string(),
        email: "ana@example.org".to_string(),
        conference_id: "abc".to_string(),
        participation: Some(ParticipationRole::Attendee),
        ..Default::default()
    });
    let outcome = public_helpers::record_inquiry(&stores.db, inquiry);
    assert!(!outcome.success);
    assert_eq!(outcome.message, "The selected conference is not available.");

    let mut files = EncodedFiles::default();
    files.insert("manuscript", "data:application/pdf;base64,JVBERi0=".to_string());
    let paper = public_helpers::submit_paper(
        &stores.db,
        "xyz",
        ConferenceSubmissionForm::default(),
        files,
        NaiveDate::from_ymd_opt(2030, 4, 1).unwrap(),
    );
    assert_eq!(paper.message, "This conference is not accepting submissions.");

    let deleted = content_helpers::delete_record(
        &stores.ctx(),
        researchdesk_backend::models::Collection::Webinars,
        "not-a-uuid",
    );
    assert!(!deleted.success);
    assert_eq!(deleted.message, "Item not found.");

    assert!(public_helpers::fetch_post_by_id(&stores.db, "nope").unwrap().is_none());
}
