use chrono::{NaiveDate, Utc};
use redb::Database;
use serde_json::Value;

use crate::forms::sub_admin_forms::SubAdminForm;
use crate::forms::{ContentForm, PersistContext};
use crate::helper::file_encoding_helpers::EncodedFiles;
use crate::helper::sanitization_helpers::{slugify, strip_all_html};
use crate::helper::submission_helpers::SubmitOutcome;
use crate::models::content_models::{Banner, BlogCategory, BlogPost, Conference, SubAdmin};
use crate::models::db_operations::accounts_db_operations;
use crate::models::db_operations::documents_db_operations::{self as documents, DbError};
use crate::models::{Collection, Document, Role, Status};
use crate::DbPool;

pub const DUPLICATE_EMAIL_MESSAGE: &str = "A user with this email already exists.";

fn lowercase_first(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Adds a new record or replaces the one being edited.
pub fn save_record<F: ContentForm>(
    db: &Database,
    form: F,
    mut files: EncodedFiles,
    editing: Option<&str>,
) -> SubmitOutcome<Document<F::Record>> {
    let existing = match editing {
        Some(id) => match documents::get_document::<F::Record>(db, id) {
            Ok(Some(doc)) => Some(doc),
            Ok(None) => return SubmitOutcome::failed(format!("{} not found.", F::LABEL)),
            Err(e) => {
                log::error!("Failed to load {} {} for editing: {}", F::LABEL, id, e);
                return SubmitOutcome::failed(format!("Could not load the {}.", lowercase_first(F::LABEL)));
            }
        },
        None => None,
    };

    let record = match form.into_record(&mut files, existing.as_ref().map(|doc| &doc.data)) {
        Ok(record) => record,
        Err(e) => return SubmitOutcome::failed(e.message),
    };

    match existing {
        Some(doc) => match documents::update_document(db, &doc.id, &record) {
            Ok(()) => SubmitOutcome::ok(
                format!("{} updated successfully.", F::LABEL),
                Document { id: doc.id, data: record },
            ),
            Err(e) => {
                log::error!("Failed to update {} {}: {}", F::LABEL, doc.id, e);
                SubmitOutcome::failed(format!("Failed to update {}: {}", lowercase_first(F::LABEL), e))
            }
        },
        None => match documents::add_document(db, &record) {
            Ok(id) => SubmitOutcome::ok(format!("{} added successfully.", F::LABEL), Document { id, data: record }),
            Err(e) => {
                log::error!("Failed to add {}: {}", F::LABEL, e);
                SubmitOutcome::failed(format!("Failed to add {}: {}", lowercase_first(F::LABEL), e))
            }
        },
    }
}

/// Deletes one document. Removing a sub-admin also removes its login.
pub fn delete_record(ctx: &PersistContext, collection: Collection, id: &str) -> SubmitOutcome<String> {
    match documents::delete_document(ctx.db, collection, id) {
        Ok(false) | Err(DbError::Uuid(_)) => return SubmitOutcome::failed("Item not found."),
        Ok(true) => {}
        Err(e) => {
            log::error!("Failed to delete {}/{}: {}", collection.name(), id, e);
            return SubmitOutcome::failed(format!("Failed to delete item: {}", e));
        }
    }

    if collection == Collection::SubAdmins {
        let removed = ctx
            .pool
            .get()
            .map_err(|e| e.to_string())
            .and_then(|conn| accounts_db_operations::delete_account_for_sub_admin(&conn, id).map_err(|e| e.to_string()));
        if let Err(e) = removed {
            log::error!("Sub-admin {} deleted but its account could not be removed: {}", id, e);
            return SubmitOutcome::failed("Sub-admin deleted, but the login account could not be removed.");
        }
    }
    SubmitOutcome::ok("Deleted successfully.", id.to_string())
}

// ====================================================================
// ============================ BLOG ==================================
// ====================================================================

/// Returns the category named `name` (compared case-insensitively),
/// creating it first if needed.
pub fn ensure_category_exists(db: &Database, name: &str) -> Result<Document<BlogCategory>, DbError> {
    let name = strip_all_html(name);
    let wanted = name.to_lowercase();
    let existing = documents::get_all_documents::<BlogCategory>(db)?
        .into_iter()
        .find(|doc| doc.data.name.trim().to_lowercase() == wanted);
    if let Some(category) = existing {
        return Ok(category);
    }

    let category = BlogCategory {
        slug: slugify(&name),
        name,
        created_at: Utc::now(),
    };
    let id = documents::add_document(db, &category)?;
    log::info!("Created blog category '{}'", category.name);
    Ok(Document { id, data: category })
}

/// Newest first.
pub fn sort_posts_newest_first(posts: &mut [Document<BlogPost>]) {
    posts.sort_by(|a, b| b.data.created_at.cmp(&a.data.created_at));
}

/// The post to feature: the newest one marked featured, otherwise the newest post.
pub fn select_primary_post(posts: &[Document<BlogPost>]) -> Option<&Document<BlogPost>> {
    posts
        .iter()
        .filter(|p| p.data.featured)
        .max_by_key(|p| p.data.created_at)
        .or_else(|| posts.iter().max_by_key(|p| p.data.created_at))
}

pub fn post_in_category(post: &BlogPost, category: &str) -> bool {
    let wanted = category.trim().to_lowercase();
    post.categories
        .iter()
        .any(|c| c.to_lowercase() == wanted || slugify(c) == wanted)
}

// ====================================================================
// ========================= LISTING RULES ============================
// ====================================================================

/// Banners in display order. Equal `order` values keep store order.
pub fn sort_banners(banners: &mut [Document<Banner>]) {
    banners.sort_by_key(|b| b.data.order);
}

/// Keeps documents whose `status` is active. Records without a status pass.
pub fn retain_active(documents: &mut Vec<(String, Value)>) {
    documents.retain(|(_, doc)| match doc.get("status") {
        Some(status) => status == Status::Active.as_str(),
        None => true,
    });
}

/// Active conferences sorted by start date. Past ones (already ended
/// before `today`) are dropped unless `include_past`.
pub fn visible_conferences(
    mut conferences: Vec<Document<Conference>>,
    today: NaiveDate,
    include_past: bool,
) -> Vec<Document<Conference>> {
    conferences.retain(|c| c.data.status == Status::Active && (include_past || c.data.end_date >= today));
    conferences.sort_by_key(|c| c.data.start_date);
    conferences
}

/// Display name for an `editorId` / `assignedTo` reference. Linear scan of
/// the full sub-admin list; dangling ids resolve to `None`.
pub fn resolve_sub_admin_name(sub_admins: &[Document<SubAdmin>], id: Option<&str>) -> Option<String> {
    let id = id?;
    sub_admins.iter().find(|s| s.id == id).map(|s| s.data.name.clone())
}

// ====================================================================
// =========================== SUB-ADMINS =============================
// ====================================================================

fn email_taken_by_document(db: &Database, email: &str, except_id: Option<&str>) -> Result<bool, DbError> {
    Ok(documents::get_all_documents::<SubAdmin>(db)?
        .iter()
        .any(|doc| doc.data.email.eq_ignore_ascii_case(email) && Some(doc.id.as_str()) != except_id))
}

/// Writes the profile document, then the login account. If the account
/// cannot be created the profile is deleted again.
pub fn create_sub_admin(
    db: &Database,
    pool: &DbPool,
    profile: SubAdmin,
    password: &str,
) -> SubmitOutcome<Document<SubAdmin>> {
    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Could not get DB connection from pool: {}", e);
            return SubmitOutcome::failed("Could not reach the accounts database.");
        }
    };

    match accounts_db_operations::email_exists(&conn, &profile.email) {
        Ok(true) => return SubmitOutcome::failed(DUPLICATE_EMAIL_MESSAGE),
        Ok(false) => {}
        Err(e) => {
            log::error!("Failed to check email '{}': {}", profile.email, e);
            return SubmitOutcome::failed("Could not check whether the email is in use.");
        }
    }
    match email_taken_by_document(db, &profile.email, None) {
        Ok(true) => return SubmitOutcome::failed(DUPLICATE_EMAIL_MESSAGE),
        Ok(false) => {}
        Err(e) => {
            log::error!("Failed to scan sub-admins: {}", e);
            return SubmitOutcome::failed(format!("Failed to add sub-admin: {}", e));
        }
    }

    let id = match documents::add_document(db, &profile) {
        Ok(id) => id,
        Err(e) => {
            log::error!("Failed to add sub-admin profile: {}", e);
            return SubmitOutcome::failed(format!("Failed to add sub-admin: {}", e));
        }
    };

    if let Err(e) = accounts_db_operations::create_account(&conn, &profile.email, password, Role::SubAdmin, Some(&id)) {
        if let Err(cleanup) = documents::delete_document(db, Collection::SubAdmins, &id) {
            log::error!("Could not remove orphaned sub-admin profile {}: {}", id, cleanup);
        }
        if accounts_db_operations::is_unique_violation(&e) {
            return SubmitOutcome::failed(DUPLICATE_EMAIL_MESSAGE);
        }
        log::error!("Failed to create account for sub-admin '{}': {}", profile.email, e);
        return SubmitOutcome::failed("Failed to create the sub-admin's login account.");
    }

    log::info!("Sub-admin '{}' created", profile.email);
    SubmitOutcome::ok("Sub-admin added successfully.", Document { id, data: profile })
}

/// Updates the profile and keeps the login (email, active flag, optional
/// new password) in step with it.
pub fn update_sub_admin(
    db: &Database,
    pool: &DbPool,
    id: &str,
    form: SubAdminForm,
    new_password: Option<&str>,
) -> SubmitOutcome<Document<SubAdmin>> {
    let existing = match documents::get_document::<SubAdmin>(db, id) {
        Ok(Some(doc)) => doc,
        Ok(None) => return SubmitOutcome::failed("Sub-admin not found."),
        Err(e) => {
            log::error!("Failed to load sub-admin {}: {}", id, e);
            return SubmitOutcome::failed(format!("Failed to update sub-admin: {}", e));
        }
    };
    let profile = match form.into_record(&mut EncodedFiles::default(), Some(&existing.data)) {
        Ok(profile) => profile,
        Err(e) => return SubmitOutcome::failed(e.message),
    };

    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Could not get DB connection from pool: {}", e);
            return SubmitOutcome::failed("Could not reach the accounts database.");
        }
    };

    if !profile.email.eq_ignore_ascii_case(&existing.data.email) {
        let taken = accounts_db_operations::email_exists(&conn, &profile.email)
            .map_err(|e| e.to_string())
            .and_then(|in_accounts| {
                email_taken_by_document(db, &profile.email, Some(id))
                    .map(|in_documents| in_accounts || in_documents)
                    .map_err(|e| e.to_string())
            });
        match taken {
            Ok(true) => return SubmitOutcome::failed(DUPLICATE_EMAIL_MESSAGE),
            Ok(false) => {}
            Err(e) => {
                log::error!("Failed to check email '{}': {}", profile.email, e);
                return SubmitOutcome::failed("Could not check whether the email is in use.");
            }
        }
    }

    if let Err(e) = documents::update_document(db, id, &profile) {
        log::error!("Failed to update sub-admin {}: {}", id, e);
        return SubmitOutcome::failed(format!("Failed to update sub-admin: {}", e));
    }

    let is_active = profile.status == Status::Active;
    match accounts_db_operations::update_sub_admin_account(&conn, id, &profile.email, is_active, new_password) {
        Ok(0) => log::warn!("Sub-admin {} has no login account to update", id),
        Ok(_) => {}
        Err(e) => {
            log::error!("Failed to update account for sub-admin {}: {}", id, e);
            return SubmitOutcome::failed("Profile saved, but the login account could not be updated.");
        }
    }

    SubmitOutcome::ok(
        "Sub-admin updated successfully.",
        Document {
            id: id.to_string(),
            data: profile,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::BTreeSet;
    use tempfile::NamedTempFile;

    fn temp_db() -> (NamedTempFile, Database) {
        let file = NamedTempFile::new().expect("temp file");
        let db = Database::create(file.path()).expect("redb database");
        documents::ensure_collections(&db).expect("collections");
        (file, db)
    }

    fn post(title: &str, featured: bool, age_days: i64) -> Document<BlogPost> {
        Document {
            id: title.to_string(),
            data: BlogPost {
                title: title.to_string(),
                categories: vec!["Research".to_string()],
                author: "Ada".to_string(),
                content: String::new(),
                excerpt: String::new(),
                image: String::new(),
                image_alt: String::new(),
                featured,
                keywords: String::new(),
                created_at: Utc::now() - Duration::days(age_days),
                updated_at: None,
            },
        }
    }

    #[test]
    fn category_creation_is_idempotent_and_case_insensitive() {
        let (_file, db) = temp_db();
        let first = ensure_category_exists(&db, "Data Science").unwrap();
        let again = ensure_category_exists(&db, "data science").unwrap();
        let third = ensure_category_exists(&db, " DATA SCIENCE ").unwrap();

        assert_eq!(first.id, again.id);
        assert_eq!(first.id, third.id);
        assert_eq!(first.data.slug, "data-science");
        assert_eq!(documents::get_all_documents::<BlogCategory>(&db).unwrap().len(), 1);
    }

    #[test]
    fn newest_featured_post_is_primary() {
        let posts = vec![post("old featured", true, 10), post("newest", false, 0), post("new featured", true, 2)];
        assert_eq!(select_primary_post(&posts).unwrap().id, "new featured");
    }

    #[test]
    fn newest_post_is_primary_when_none_featured() {
        let posts = vec![post("older", false, 3), post("newest", false, 1)];
        assert_eq!(select_primary_post(&posts).unwrap().id, "newest");
        assert!(select_primary_post(&[]).is_none());
    }

    #[test]
    fn category_filter_matches_name_or_slug() {
        let mut p = post("x", false, 0).data;
        p.categories = vec!["Machine Learning".to_string()];
        assert!(post_in_category(&p, "machine learning"));
        assert!(post_in_category(&p, "machine-learning"));
        assert!(!post_in_category(&p, "ethics"));
    }

    #[test]
    fn dangling_references_resolve_to_none() {
        let sub_admins = vec![Document {
            id: "s1".to_string(),
            data: SubAdmin {
                name: "Grace".to_string(),
                email: "grace@example.org".to_string(),
                phone: String::new(),
                designation: "Editor".to_string(),
                permissions: BTreeSet::new(),
                status: Status::Active,
                created_at: Utc::now(),
                updated_at: None,
            },
        }];
        assert_eq!(resolve_sub_admin_name(&sub_admins, Some("s1")).as_deref(), Some("Grace"));
        assert_eq!(resolve_sub_admin_name(&sub_admins, Some("gone")), None);
        assert_eq!(resolve_sub_admin_name(&sub_admins, None), None);
    }
}
