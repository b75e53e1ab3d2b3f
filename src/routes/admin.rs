use crate::config::Config;
use crate::helper::admin_helpers::{self, MAX_VISIBLE_NOTIFICATIONS_KEY};
use crate::middleware::AuthenticatedStaff;
use crate::models::NotificationKind;
use crate::AppState;
use actix_csrf::extractor::{Csrf, CsrfGuarded, CsrfToken};
use actix_session::Session;
use actix_web::{web, HttpResponse, Responder};
use redb::Database;
use serde::Deserialize;
use serde_json::json;
use tera::{Context, Tera};

#[derive(Deserialize)]
struct LoginForm {
    csrf_token: CsrfToken,
    email: String,
    password: String,
}

impl CsrfGuarded for LoginForm {
    fn csrf_token(&self) -> &CsrfToken {
        &self.csrf_token
    }
}

pub fn config_login(cfg: &mut web::ServiceConfig) {
    cfg.route("/login", web::get().to(show_login_form))
        .route("/login", web::post().to(handle_login))
        .route("/logout", web::post().to(handle_logout));
}

pub fn config_dashboard(cfg: &mut web::ServiceConfig) {
    cfg.route("/dashboard", web::get().to(show_dashboard))
        .route("/update_settings", web::post().to(update_settings_action))
        .route("/api/notifications", web::get().to(list_notifications))
        .route("/api/notifications/{id}/dismiss", web::post().to(dismiss_notification));
}

async fn show_login_form(
    session: Session,
    tera: web::Data<Tera>,
    token: CsrfToken,
    config: web::Data<Config>,
) -> impl Responder {
    let admin_url_prefix = &config.admin_url_prefix;
    if AuthenticatedStaff::from_session(&session).is_some() {
        let dashboard_url = format!("/management/{}/dashboard", admin_url_prefix);
        return HttpResponse::Found().append_header(("location", dashboard_url)).finish();
    }

    let mut ctx = Context::new();
    ctx.insert("admin_url_prefix", admin_url_prefix);
    ctx.insert("csrf_token", token.get());

    if let Ok(Some(error)) = session.get::<String>("error") {
        ctx.insert("error", &error);
        session.remove("error");
    }

    match tera.render("admin/login.html", &ctx) {
        Ok(rendered) => HttpResponse::Ok().content_type("text/html; charset=utf-8").body(rendered),
        Err(err) => {
            log::error!("Template rendering error: {}", err);
            HttpResponse::InternalServerError().body("Template error")
        }
    }
}

async fn handle_login(
    session: Session,
    pool: web::Data<crate::DbPool>,
    db: web::Data<Database>,
    form: Csrf<web::Form<LoginForm>>,
    config: web::Data<Config>,
) -> impl Responder {
    let admin_url_prefix = &config.admin_url_prefix;
    let login_url = format!("/management/{}/login", admin_url_prefix);
    let dashboard_url = format!("/management/{}/dashboard", admin_url_prefix);

    let login_data = form.into_inner().into_inner();
    let (pool, db) = (pool.into_inner(), db.into_inner());
    let email = login_data.email.clone();
    let verified = web::block(move || {
        admin_helpers::verify_staff_login(&pool, &db, &login_data.email, &login_data.password)
    })
    .await;

    match verified {
        Ok(Some(login)) => {
            session.renew();
            let staff = AuthenticatedStaff {
                email: login.account.email,
                role: login.account.role,
                permissions: login.permissions,
            };
            if let Err(e) = staff.store(&session) {
                log::error!("Failed to store login for '{}' in session: {}", email, e);
                return HttpResponse::InternalServerError().body("Could not start a session.");
            }
            log::info!("'{}' logged in as {}", staff.email, staff.role);
            HttpResponse::Found().append_header(("location", dashboard_url)).finish()
        }
        Ok(None) => {
            if let Err(e) = session.insert("error", "Invalid credentials or account suspended.") {
                log::error!("Failed to store login error in session: {}", e);
            }
            HttpResponse::Found().append_header(("location", login_url)).finish()
        }
        Err(e) => {
            log::error!("Login check for '{}' failed to run: {}", email, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn handle_logout(session: Session, config: web::Data<Config>) -> impl Responder {
    let login_url = format!("/management/{}/login", &config.admin_url_prefix);
    session.purge();
    HttpResponse::Found().append_header(("location", login_url)).finish()
}

async fn show_dashboard(
    staff: AuthenticatedStaff,
    tera: web::Data<Tera>,
    pool: web::Data<crate::DbPool>,
    db: web::Data<Database>,
    app_state: web::Data<AppState>,
    token: CsrfToken,
    config: web::Data<Config>,
) -> impl Responder {
    let mut ctx = Context::new();
    ctx.insert("admin_url_prefix", &config.admin_url_prefix);
    ctx.insert("user", &staff);
    ctx.insert("is_admin", &staff.is_admin());
    ctx.insert("csrf_token", token.get());

    let max_visible = app_state.max_visible();
    let queue = app_state.notifications.load(&staff.email);
    ctx.insert("notifications", &queue.visible(max_visible));
    ctx.insert("max_visible_notifications", &max_visible);

    match admin_helpers::collection_counts(&db, |c| staff.can_use(c.section())) {
        Ok(counts) => ctx.insert("collections", &counts),
        Err(e) => {
            log::error!("Failed to count collections for dashboard: {}", e);
            ctx.insert("collections", &Vec::<admin_helpers::CollectionCount>::new());
        }
    }

    if staff.is_admin() {
        match admin_helpers::fetch_all_accounts(&pool) {
            Ok(accounts) => ctx.insert("accounts", &accounts),
            Err(e) => {
                log::error!("Failed to fetch accounts for dashboard: {}", e);
                ctx.insert("accounts", &Vec::<crate::models::Account>::new());
            }
        }
    }

    match tera.render("admin/dashboard.html", &ctx) {
        Ok(rendered) => HttpResponse::Ok().content_type("text/html; charset=utf-8").body(rendered),
        Err(err) => {
            log::error!("Template rendering error: {}", err);
            HttpResponse::InternalServerError().body("Error rendering dashboard.")
        }
    }
}

async fn update_settings_action(
    staff: AuthenticatedStaff,
    pool: web::Data<crate::DbPool>,
    form: web::Bytes,
    app_state: web::Data<AppState>,
    config: web::Data<Config>,
) -> impl Responder {
    let dashboard_url = format!("/management/{}/dashboard", &config.admin_url_prefix);
    if !staff.is_admin() {
        return HttpResponse::Forbidden().body("Only administrators can change settings.");
    }

    let parsed = match crate::helper::form_helpers::parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };

    let raw = parsed.get(MAX_VISIBLE_NOTIFICATIONS_KEY).map(|s| s.as_str()).unwrap_or("");
    match admin_helpers::parse_max_visible(raw) {
        Some(max_visible) => match admin_helpers::update_setting(&pool, MAX_VISIBLE_NOTIFICATIONS_KEY, &max_visible.to_string()) {
            Ok(()) => {
                let mut state_max = app_state.max_visible_notifications.write().unwrap_or_else(|poisoned| {
                    log::error!("RwLock for max_visible_notifications was poisoned during settings update! Recovering lock.");
                    poisoned.into_inner()
                });
                *state_max = max_visible;
                app_state
                    .notifications
                    .notify(&staff.email, NotificationKind::Success, "Settings updated successfully.");
            }
            Err(e) => {
                log::error!("Failed to update settings: {}", e);
                app_state
                    .notifications
                    .notify(&staff.email, NotificationKind::Error, "Failed to update settings in database.");
            }
        },
        None => {
            app_state.notifications.notify(
                &staff.email,
                NotificationKind::Error,
                "Visible notifications must be a whole number from 1 to 10.",
            );
        }
    }
    HttpResponse::Found().append_header(("location", dashboard_url)).finish()
}

async fn list_notifications(staff: AuthenticatedStaff, app_state: web::Data<AppState>) -> impl Responder {
    let queue = app_state.notifications.load(&staff.email);
    let max_visible = app_state.max_visible();
    HttpResponse::Ok().json(json!({
        "visible": queue.visible(max_visible),
        "waiting": queue.len().saturating_sub(max_visible),
        "maxVisible": max_visible,
    }))
}

async fn dismiss_notification(
    staff: AuthenticatedStaff,
    path: web::Path<u64>,
    app_state: web::Data<AppState>,
) -> impl Responder {
    if !app_state.notifications.dismiss(&staff.email, path.into_inner()) {
        return HttpResponse::NotFound().json(json!({"success": false, "message": "Notification not found."}));
    }
    let queue = app_state.notifications.load(&staff.email);
    let max_visible = app_state.max_visible();
    HttpResponse::Ok().json(json!({
        "success": true,
        "visible": queue.visible(max_visible),
        "waiting": queue.len().saturating_sub(max_visible),
    }))
}
