use crate::forms::public_forms::{ConferenceSubmissionForm, InquiryForm, WebinarRegistrationForm};
use crate::forms::wizard::{StepForm, Wizard};
use crate::helper::file_encoding_helpers::{EncodedFiles, FileRule, UploadedFile};
use crate::helper::notification_helpers::NotificationQueue;
use crate::helper::submission_helpers::{self, SubmissionError, SubmitOutcome};
use crate::helper::{form_helpers, public_helpers};
use crate::models::db_operations::documents_db_operations::DbError;
use actix_multipart::Multipart;
use actix_web::error::BlockingError;
use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use redb::Database;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 50;

#[derive(Deserialize)]
pub struct PostsQuery {
    category: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

#[derive(Deserialize)]
pub struct ConferencesQuery {
    #[serde(default)]
    include_past: bool,
}

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/is_server_active", web::get().to(is_server_active))
            .route("/banners", web::get().to(get_banners))
            .route("/blog/posts", web::get().to(get_posts))
            .route("/blog/posts/featured", web::get().to(get_featured_post))
            .route("/blog/posts/{id}", web::get().to(get_post_by_id))
            .route("/blog/categories", web::get().to(get_categories))
            .route("/conferences", web::get().to(get_conferences))
            .route("/conferences/{id}", web::get().to(get_conference))
            .route("/conferences/{id}/submissions", web::post().to(submit_paper))
            .route("/journals", web::get().to(get_journals))
            .route("/webinars", web::get().to(get_webinars))
            .route("/webinars/{id}/register", web::post().to(register_for_webinar))
            .route("/internships", web::get().to(get_internships))
            .route("/faqs", web::get().to(get_faqs))
            .route("/inquiries", web::post().to(send_inquiry)),
    );
}

async fn is_server_active() -> impl Responder {
    HttpResponse::Ok().body("active")
}

fn list_response<T: Serialize>(what: &str, result: Result<T, DbError>) -> HttpResponse {
    match result {
        Ok(items) => HttpResponse::Ok().json(items),
        Err(e) => {
            log::error!("Failed to fetch {}: {}", what, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

fn item_response<T: Serialize>(what: &str, result: Result<Option<T>, DbError>) -> HttpResponse {
    match result {
        Ok(Some(item)) => HttpResponse::Ok().json(item),
        Ok(None) => HttpResponse::NotFound().body(format!("{} not found", what)),
        // Malformed ids land here too.
        Err(DbError::Uuid(_)) => HttpResponse::NotFound().body(format!("{} not found", what)),
        Err(e) => {
            log::error!("Failed to fetch {}: {}", what, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn get_banners(db: web::Data<Database>) -> impl Responder {
    list_response("banners", public_helpers::list_banners(&db))
}

async fn get_posts(db: web::Data<Database>, query: web::Query<PostsQuery>) -> impl Responder {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);
    list_response(
        "blog posts",
        public_helpers::list_posts(&db, query.category.as_deref(), limit, offset),
    )
}

async fn get_featured_post(db: web::Data<Database>) -> impl Responder {
    item_response("Post", public_helpers::featured_post(&db))
}

async fn get_post_by_id(id: web::Path<String>, db: web::Data<Database>) -> impl Responder {
    item_response("Post", public_helpers::fetch_post_by_id(&db, &id))
}

async fn get_categories(db: web::Data<Database>) -> impl Responder {
    list_response("blog categories", public_helpers::list_categories(&db))
}

async fn get_conferences(db: web::Data<Database>, query: web::Query<ConferencesQuery>) -> impl Responder {
    let today = Utc::now().date_naive();
    list_response(
        "conferences",
        public_helpers::list_conferences(&db, query.include_past, today),
    )
}

async fn get_conference(id: web::Path<String>, db: web::Data<Database>) -> impl Responder {
    item_response("Conference", public_helpers::fetch_conference(&db, &id))
}

async fn get_journals(db: web::Data<Database>) -> impl Responder {
    list_response("journals", public_helpers::list_journals(&db))
}

async fn get_webinars(db: web::Data<Database>) -> impl Responder {
    list_response("webinars", public_helpers::list_webinars(&db))
}

async fn get_internships(db: web::Data<Database>) -> impl Responder {
    list_response("internships", public_helpers::list_internships(&db))
}

async fn get_faqs(db: web::Data<Database>) -> impl Responder {
    list_response("FAQs", public_helpers::list_faqs(&db))
}

// ====================================================================
// ======================= VISITOR SUBMISSIONS ========================
// ====================================================================

/// Visitor forms go through the same validate, encode, persist pipeline as
/// the back office. The queue only exists for the length of the request.
fn run_submission<F, T>(
    mut wizard: Wizard<F>,
    files: HashMap<String, UploadedFile>,
    rules: Vec<FileRule>,
    persist: impl FnOnce(F, EncodedFiles) -> SubmitOutcome<T>,
) -> Result<SubmitOutcome<T>, SubmissionError>
where
    F: StepForm,
{
    let mut scratch = NotificationQueue::default();
    submission_helpers::submit_wizard(
        &mut wizard,
        &files,
        &rules,
        &mut scratch,
        |form, encoded, _| persist(form, encoded),
        |_| {},
    )
}

fn submission_response<T: Serialize>(
    what: &str,
    result: Result<Result<SubmitOutcome<T>, SubmissionError>, BlockingError>,
) -> HttpResponse {
    match result {
        Ok(Ok(outcome)) => HttpResponse::Created().json(json!({
            "success": true,
            "message": outcome.message,
        })),
        Ok(Err(SubmissionError::Persistence(message))) => {
            HttpResponse::UnprocessableEntity().json(json!({"success": false, "message": message}))
        }
        Ok(Err(e)) => HttpResponse::BadRequest().json(json!({
            "success": false,
            "message": e.to_string(),
            "field": e.field(),
        })),
        Err(e) => {
            log::error!("{} did not complete: {}", what, e);
            HttpResponse::InternalServerError().json(json!({
                "success": false,
                "message": "Something went wrong. Please try again later.",
            }))
        }
    }
}

async fn register_for_webinar(
    id: web::Path<String>,
    form: web::Json<WebinarRegistrationForm>,
    db: web::Data<Database>,
) -> impl Responder {
    let webinar_id = id.into_inner();
    let wizard = Wizard::with_values(form.into_inner());
    let result = web::block(move || {
        run_submission(wizard, HashMap::new(), Vec::new(), |form, _| {
            public_helpers::register_for_webinar(&db, &webinar_id, form)
        })
    })
    .await;
    submission_response("Webinar registration", result)
}

async fn send_inquiry(form: web::Json<InquiryForm>, db: web::Data<Database>) -> impl Responder {
    let wizard = Wizard::with_values(form.into_inner());
    let result = web::block(move || {
        run_submission(wizard, HashMap::new(), Vec::new(), |form, _| {
            public_helpers::record_inquiry(&db, form)
        })
    })
    .await;
    submission_response("Inquiry", result)
}

async fn submit_paper(id: web::Path<String>, payload: Multipart, db: web::Data<Database>) -> impl Responder {
    let conference_id = id.into_inner();
    let upload = match form_helpers::read_multipart(payload).await {
        Ok(upload) => upload,
        Err(e) => {
            log::warn!("Rejected paper upload for conference {}: {}", conference_id, e);
            return HttpResponse::BadRequest().json(json!({"success": false, "message": e.to_string()}));
        }
    };

    let mut wizard = Wizard::<ConferenceSubmissionForm>::new();
    if let Err(e) = wizard.merge(upload.data) {
        return HttpResponse::BadRequest().json(json!({"success": false, "message": e.to_string()}));
    }

    let today = Utc::now().date_naive();
    let files = upload.files;
    let result = web::block(move || {
        run_submission(wizard, files, ConferenceSubmissionForm::file_rules(), |form, encoded| {
            public_helpers::submit_paper(&db, &conference_id, form, encoded, today)
        })
    })
    .await;
    submission_response("Paper submission", result)
}
