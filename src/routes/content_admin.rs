use crate::forms::conference_forms::ConferenceForm;
use crate::forms::content_forms::{
    BannerForm, BlogPostForm, FaqForm, InternshipForm, JournalForm, SubmissionReviewForm, WebinarForm,
};
use crate::forms::sub_admin_forms::SubAdminForm;
use crate::forms::wizard::{Wizard, WizardError};
use crate::forms::{ContentForm, FormKind, FormMode, PersistContext};
use crate::helper::content_helpers;
use crate::helper::file_encoding_helpers::FileRule;
use crate::helper::form_helpers;
use crate::helper::submission_helpers::{self, SubmissionError};
use crate::middleware::AuthenticatedStaff;
use crate::models::db_operations::documents_db_operations::{self as documents, DbError, Query, SortDirection};
use crate::models::{Collection, NotificationKind, Record};
use crate::{AppState, DbPool};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use redb::Database;
use serde::Deserialize;
use serde_json::{json, Map, Value};

pub fn config_content(cfg: &mut web::ServiceConfig) {
    // Form routes first: `/api/forms/{form}` would otherwise match `/api/{collection}/{id}`.
    cfg.route("/api/forms/{form}/start", web::post().to(start_form))
        .route("/api/forms/{form}", web::get().to(show_form))
        .route("/api/forms/{form}/advance", web::post().to(advance_form))
        .route("/api/forms/{form}/retreat", web::post().to(retreat_form))
        .route("/api/forms/{form}/submit", web::post().to(submit_form))
        .route("/api/{collection}", web::get().to(list_collection))
        .route("/api/{collection}/{id}", web::get().to(get_item))
        .route("/api/{collection}/{id}/delete", web::post().to(delete_item));
}

/// Runs a generic form handler for the concrete form type behind `$kind`.
macro_rules! with_form {
    ($kind:expr, $handler:ident($($arg:expr),* $(,)?)) => {
        match $kind {
            FormKind::Banner => $handler::<BannerForm>($($arg),*).await,
            FormKind::BlogPost => $handler::<BlogPostForm>($($arg),*).await,
            FormKind::Conference => $handler::<ConferenceForm>($($arg),*).await,
            FormKind::Journal => $handler::<JournalForm>($($arg),*).await,
            FormKind::Webinar => $handler::<WebinarForm>($($arg),*).await,
            FormKind::Internship => $handler::<InternshipForm>($($arg),*).await,
            FormKind::Faq => $handler::<FaqForm>($($arg),*).await,
            FormKind::SubAdmin => $handler::<SubAdminForm>($($arg),*).await,
            FormKind::SubmissionReview => $handler::<SubmissionReviewForm>($($arg),*).await,
        }
    };
}

fn failure(message: &str) -> Value {
    json!({"success": false, "message": message})
}

fn authorize_form(staff: &AuthenticatedStaff, name: &str) -> Result<FormKind, HttpResponse> {
    let kind = FormKind::from_name(name).ok_or_else(|| HttpResponse::NotFound().json(failure("Unknown form.")))?;
    if !staff.can_use(kind.section()) {
        return Err(HttpResponse::Forbidden().json(failure("You do not have access to this form.")));
    }
    Ok(kind)
}

fn authorize_collection(staff: &AuthenticatedStaff, name: &str) -> Result<Collection, HttpResponse> {
    let collection =
        Collection::from_name(name).ok_or_else(|| HttpResponse::NotFound().json(failure("Unknown collection.")))?;
    if !staff.can_use(collection.section()) {
        return Err(HttpResponse::Forbidden().json(failure("You do not have access to this collection.")));
    }
    Ok(collection)
}

fn with_id(id: String, value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            map.insert("id".to_string(), Value::String(id));
            Value::Object(map)
        }
        other => json!({"id": id, "value": other}),
    }
}

fn rules_view(rules: &[FileRule]) -> Vec<Value> {
    rules
        .iter()
        .map(|rule| {
            json!({
                "field": rule.field,
                "label": rule.label,
                "required": rule.required,
                "maxBytes": rule.max_bytes,
            })
        })
        .collect()
}

fn mode_of<F: ContentForm>(wizard: &Wizard<F>) -> FormMode {
    if wizard.editing_id().is_some() {
        FormMode::Edit
    } else {
        FormMode::Add
    }
}

fn form_view<F: ContentForm>(wizard: &Wizard<F>) -> Value {
    json!({
        "success": true,
        "form": F::NAME,
        "step": wizard.step(),
        "stepCount": wizard.step_count(),
        "stepFields": wizard.step_fields(),
        "isFinalStep": wizard.is_final_step(),
        "editing": wizard.editing_id(),
        "values": wizard.values(),
        "files": rules_view(&F::file_rules(mode_of(wizard))),
    })
}

fn wizard_failure(error: &WizardError) -> HttpResponse {
    match error {
        WizardError::Invalid { step, error: field } => HttpResponse::UnprocessableEntity().json(json!({
            "success": false,
            "message": field.message,
            "field": field.field,
            "step": step,
        })),
        other => HttpResponse::BadRequest().json(failure(&other.to_string())),
    }
}

// ====================================================================
// ============================ WIZARD ================================
// ====================================================================

#[derive(Deserialize)]
struct StartQuery {
    edit: Option<String>,
}

async fn start_form(
    staff: AuthenticatedStaff,
    path: web::Path<String>,
    query: web::Query<StartQuery>,
    db: web::Data<Database>,
    app_state: web::Data<AppState>,
) -> HttpResponse {
    let kind = match authorize_form(&staff, &path) {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    let edit = query.into_inner().edit;
    with_form!(kind, start(&staff, &db, &app_state, edit))
}

async fn start<F: ContentForm>(
    staff: &AuthenticatedStaff,
    db: &Database,
    app_state: &AppState,
    edit: Option<String>,
) -> HttpResponse {
    let wizard = match edit {
        Some(id) => match documents::get_document::<F::Record>(db, &id) {
            Ok(Some(doc)) => Wizard::<F>::editing(id, F::from_record(&doc.data)),
            Ok(None) | Err(DbError::Uuid(_)) => {
                return HttpResponse::NotFound().json(failure(&format!("{} not found.", F::LABEL)));
            }
            Err(e) => {
                log::error!("Failed to load {} {} for editing: {}", F::LABEL, id, e);
                return HttpResponse::BadRequest().json(failure(&format!("Could not load {}: {}", F::LABEL, e)));
            }
        },
        None if !F::ADDABLE => {
            return HttpResponse::BadRequest().json(failure("This form can only edit existing records."));
        }
        None => Wizard::<F>::new(),
    };
    app_state.drafts.save(&staff.email, &wizard);
    HttpResponse::Ok().json(form_view(&wizard))
}

async fn show_form(staff: AuthenticatedStaff, path: web::Path<String>, app_state: web::Data<AppState>) -> HttpResponse {
    let kind = match authorize_form(&staff, &path) {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    with_form!(kind, show(&staff, &app_state))
}

async fn show<F: ContentForm>(staff: &AuthenticatedStaff, app_state: &AppState) -> HttpResponse {
    match app_state.drafts.load::<F>(&staff.email) {
        Some(wizard) => HttpResponse::Ok().json(form_view(&wizard)),
        None => HttpResponse::NotFound().json(failure("No form in progress. Start one first.")),
    }
}

async fn advance_form(
    staff: AuthenticatedStaff,
    path: web::Path<String>,
    patch: web::Json<Map<String, Value>>,
    app_state: web::Data<AppState>,
) -> HttpResponse {
    let kind = match authorize_form(&staff, &path) {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    with_form!(kind, advance(&staff, &app_state, patch.into_inner()))
}

async fn advance<F: ContentForm>(
    staff: &AuthenticatedStaff,
    app_state: &AppState,
    patch: Map<String, Value>,
) -> HttpResponse {
    let Some(mut wizard) = app_state.drafts.load::<F>(&staff.email) else {
        return HttpResponse::NotFound().json(failure("No form in progress. Start one first."));
    };
    if let Err(e) = wizard.merge(patch) {
        return wizard_failure(&e);
    }

    let result = wizard.advance();
    // Values typed so far are kept even when the step is invalid.
    app_state.drafts.save(&staff.email, &wizard);
    match result {
        Ok(_) => HttpResponse::Ok().json(form_view(&wizard)),
        Err(e) => {
            app_state.notifications.notify(&staff.email, NotificationKind::Error, &e.to_string());
            wizard_failure(&e)
        }
    }
}

async fn retreat_form(staff: AuthenticatedStaff, path: web::Path<String>, app_state: web::Data<AppState>) -> HttpResponse {
    let kind = match authorize_form(&staff, &path) {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    with_form!(kind, retreat(&staff, &app_state))
}

async fn retreat<F: ContentForm>(staff: &AuthenticatedStaff, app_state: &AppState) -> HttpResponse {
    let Some(mut wizard) = app_state.drafts.load::<F>(&staff.email) else {
        return HttpResponse::NotFound().json(failure("No form in progress. Start one first."));
    };
    wizard.retreat();
    app_state.drafts.save(&staff.email, &wizard);
    HttpResponse::Ok().json(form_view(&wizard))
}

async fn submit_form(
    staff: AuthenticatedStaff,
    path: web::Path<String>,
    payload: Multipart,
    db: web::Data<Database>,
    pool: web::Data<DbPool>,
    app_state: web::Data<AppState>,
) -> HttpResponse {
    let kind = match authorize_form(&staff, &path) {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    let upload = match form_helpers::read_multipart(payload).await {
        Ok(upload) => upload,
        Err(e) => {
            log::warn!("Rejected multipart submission for '{}': {}", kind.name(), e);
            return HttpResponse::BadRequest().json(failure(&e.to_string()));
        }
    };
    with_form!(kind, submit(&staff, &app_state, db.clone(), pool.clone(), upload))
}

/// Validation, file encoding and the store write all run on the blocking
/// pool; image recompression is CPU bound.
async fn submit<F: ContentForm>(
    staff: &AuthenticatedStaff,
    app_state: &AppState,
    db: web::Data<Database>,
    pool: web::Data<DbPool>,
    upload: form_helpers::MultipartForm,
) -> HttpResponse {
    let Some(mut wizard) = app_state.drafts.load::<F>(&staff.email) else {
        return HttpResponse::NotFound().json(failure("No form in progress. Start one first."));
    };
    if let Err(e) = wizard.merge(upload.data) {
        return wizard_failure(&e);
    }
    if !wizard.is_final_step() {
        app_state.drafts.save(&staff.email, &wizard);
        return HttpResponse::BadRequest().json(failure("Finish the remaining steps before submitting."));
    }

    let mut queue = app_state.notifications.load(&staff.email);
    let files = upload.files;
    let blocking = web::block(move || {
        let ctx = PersistContext {
            db: db.get_ref(),
            pool: pool.get_ref(),
        };
        let rules = F::file_rules(mode_of(&wizard));
        let mut refreshed = None;
        let result = submission_helpers::submit_wizard(
            &mut wizard,
            &files,
            &rules,
            &mut queue,
            |form, encoded, editing| form.persist(&ctx, encoded, editing),
            |_| match documents::get_all_raw(ctx.db, <F::Record as Record>::COLLECTION) {
                Ok(items) => refreshed = Some(items),
                Err(e) => log::error!("Saved {} but could not reload the list: {}", F::LABEL, e),
            },
        );
        (wizard, queue, result, refreshed)
    })
    .await;

    let (wizard, queue, result, refreshed) = match blocking {
        Ok(parts) => parts,
        Err(e) => {
            log::error!("Submission of '{}' did not complete: {}", F::NAME, e);
            return HttpResponse::InternalServerError().json(failure("Submission failed unexpectedly."));
        }
    };
    app_state.notifications.save(&staff.email, queue);

    match result {
        Ok(outcome) => {
            app_state.drafts.discard(&staff.email, F::NAME);
            let items: Vec<Value> = refreshed
                .unwrap_or_default()
                .into_iter()
                .map(|(id, value)| with_id(id, value))
                .collect();
            HttpResponse::Ok().json(json!({
                "success": true,
                "message": outcome.message,
                "record": outcome.record,
                "items": items,
            }))
        }
        Err(e) => {
            app_state.drafts.save(&staff.email, &wizard);
            let step = match &e {
                SubmissionError::Validation(WizardError::Invalid { step, .. }) => Some(*step),
                _ => None,
            };
            HttpResponse::UnprocessableEntity().json(json!({
                "success": false,
                "message": e.to_string(),
                "field": e.field(),
                "step": step.unwrap_or(wizard.step()),
            }))
        }
    }
}

// ====================================================================
// ========================== COLLECTIONS =============================
// ====================================================================

#[derive(Deserialize)]
struct ListQuery {
    status: Option<String>,
    order_by: Option<String>,
    direction: Option<SortDirection>,
}

async fn list_collection(
    staff: AuthenticatedStaff,
    path: web::Path<String>,
    query: web::Query<ListQuery>,
    db: web::Data<Database>,
) -> HttpResponse {
    let collection = match authorize_collection(&staff, &path) {
        Ok(collection) => collection,
        Err(response) => return response,
    };

    let ListQuery {
        status,
        order_by,
        direction,
    } = query.into_inner();
    let mut store_query = Query::new();
    if let Some(status) = status.filter(|s| !s.is_empty()) {
        store_query = store_query.where_eq("status", status);
    }
    if let Some(field) = order_by.filter(|f| !f.is_empty()) {
        store_query = store_query.order_by(&field, direction.unwrap_or_default());
    }

    match documents::query_raw(&db, collection, &store_query) {
        Ok(items) => {
            let items: Vec<Value> = items.into_iter().map(|(id, value)| with_id(id, value)).collect();
            HttpResponse::Ok().json(items)
        }
        Err(e) => {
            log::error!("Failed to list '{}': {}", collection.name(), e);
            HttpResponse::InternalServerError().json(failure("Could not load the list."))
        }
    }
}

async fn get_item(staff: AuthenticatedStaff, path: web::Path<(String, String)>, db: web::Data<Database>) -> HttpResponse {
    let (collection_name, id) = path.into_inner();
    let collection = match authorize_collection(&staff, &collection_name) {
        Ok(collection) => collection,
        Err(response) => return response,
    };

    match documents::get_raw(&db, collection, &id) {
        Ok(Some(value)) => HttpResponse::Ok().json(with_id(id, value)),
        Ok(None) | Err(DbError::Uuid(_)) => HttpResponse::NotFound().json(failure("Item not found.")),
        Err(e) => {
            log::warn!("Failed to read {}/{}: {}", collection.name(), id, e);
            HttpResponse::BadRequest().json(failure(&e.to_string()))
        }
    }
}

#[derive(Deserialize, Default)]
struct DeleteRequest {
    #[serde(default)]
    confirm: bool,
}

async fn delete_item(
    staff: AuthenticatedStaff,
    path: web::Path<(String, String)>,
    body: Option<web::Json<DeleteRequest>>,
    db: web::Data<Database>,
    pool: web::Data<DbPool>,
    app_state: web::Data<AppState>,
) -> HttpResponse {
    let (collection_name, id) = path.into_inner();
    let collection = match authorize_collection(&staff, &collection_name) {
        Ok(collection) => collection,
        Err(response) => return response,
    };
    let confirmed = body.map(|b| b.into_inner()).unwrap_or_default().confirm;
    if !confirmed {
        return HttpResponse::BadRequest().json(failure("Please confirm the deletion."));
    }

    let ctx = PersistContext {
        db: db.get_ref(),
        pool: pool.get_ref(),
    };
    let outcome = content_helpers::delete_record(&ctx, collection, &id);
    if !outcome.success {
        app_state.notifications.notify(&staff.email, NotificationKind::Error, &outcome.message);
        return HttpResponse::UnprocessableEntity().json(failure(&outcome.message));
    }
    app_state.notifications.notify(&staff.email, NotificationKind::Success, &outcome.message);
    log::info!("'{}' deleted {}/{}", staff.email, collection.name(), id);

    let items: Vec<Value> = documents::get_all_raw(&db, collection)
        .unwrap_or_else(|e| {
            log::error!("Deleted {}/{} but could not reload the list: {}", collection.name(), id, e);
            Vec::new()
        })
        .into_iter()
        .map(|(id, value)| with_id(id, value))
        .collect();
    HttpResponse::Ok().json(json!({"success": true, "message": outcome.message, "items": items}))
}
