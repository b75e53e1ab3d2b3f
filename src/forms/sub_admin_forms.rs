use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::content_forms::timestamps;
use super::wizard::{FieldError, StepForm};
use super::{ContentForm, FormMode, PersistContext};
use crate::helper::content_helpers;
use crate::helper::file_encoding_helpers::{EncodedFiles, FileRule};
use crate::helper::sanitization_helpers::strip_all_html;
use crate::helper::submission_helpers::SubmitOutcome;
use crate::models::content_models::SubAdmin;
use crate::models::{ContentSection, Document, Status};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Blank is allowed here; whether a password is needed depends on add vs edit.
fn valid_optional_password(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.chars().count() >= MIN_PASSWORD_LENGTH {
        Ok(())
    } else {
        Err(ValidationError::new("password").with_message("Password must be at least 8 characters.".into()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SubAdminForm {
    #[validate(length(min = 1, max = 100, message = "Name is required."))]
    pub name: String,
    #[validate(email(message = "A valid email is required."))]
    pub email: String,
    #[validate(length(max = 30, message = "Phone must be at most 30 characters."))]
    pub phone: String,
    #[validate(length(max = 100, message = "Designation must be at most 100 characters."))]
    pub designation: String,
    #[validate(length(min = 1, message = "Grant at least one permission."))]
    pub permissions: Vec<ContentSection>,
    pub status: Status,
    /// Never filled from a stored record.
    #[serde(skip_serializing)]
    #[validate(custom(function = "valid_optional_password"))]
    pub password: String,
}

impl StepForm for SubAdminForm {
    const NAME: &'static str = "sub_admin";

    fn steps() -> &'static [&'static [&'static str]] {
        &[&["name", "email", "phone", "designation"], &["permissions", "status", "password"]]
    }
}

impl ContentForm for SubAdminForm {
    type Record = SubAdmin;
    const LABEL: &'static str = "Sub-admin";

    fn file_rules(_mode: FormMode) -> Vec<FileRule> {
        Vec::new()
    }

    fn from_record(record: &SubAdmin) -> Self {
        Self {
            name: record.name.clone(),
            email: record.email.clone(),
            phone: record.phone.clone(),
            designation: record.designation.clone(),
            permissions: record.permissions.iter().copied().collect(),
            status: record.status,
            password: String::new(),
        }
    }

    fn into_record(self, _files: &mut EncodedFiles, existing: Option<&SubAdmin>) -> Result<SubAdmin, FieldError> {
        let (created_at, updated_at) = timestamps(existing.map(|s| s.created_at));
        Ok(SubAdmin {
            name: strip_all_html(&self.name),
            email: self.email.trim().to_lowercase(),
            phone: strip_all_html(&self.phone),
            designation: strip_all_html(&self.designation),
            permissions: self.permissions.into_iter().collect(),
            status: self.status,
            created_at,
            updated_at,
        })
    }

    /// The profile document and the login account are written together; see
    /// [`content_helpers::create_sub_admin`] for how a failed account insert is undone.
    fn persist(self, ctx: &PersistContext, mut files: EncodedFiles, editing: Option<&str>) -> SubmitOutcome<Document<SubAdmin>> {
        let password = self.password.clone();
        match editing {
            None => {
                if password.is_empty() {
                    return SubmitOutcome::failed("A password is required for a new sub-admin.");
                }
                match self.into_record(&mut files, None) {
                    Ok(profile) => content_helpers::create_sub_admin(ctx.db, ctx.pool, profile, &password),
                    Err(e) => SubmitOutcome::failed(e.message),
                }
            }
            Some(id) => {
                let new_password = Some(password.as_str()).filter(|p| !p.is_empty());
                content_helpers::update_sub_admin(ctx.db, ctx.pool, id, self, new_password)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::wizard::Wizard;
    use serde_json::json;

    #[test]
    fn short_password_blocks_the_second_step() {
        let mut wizard = Wizard::<SubAdminForm>::new();
        wizard
            .merge(
                json!({
                    "name": "Grace",
                    "email": "grace@example.org",
                    "permissions": ["blog", "faqs"],
                    "password": "short"
                })
                .as_object()
                .cloned()
                .unwrap(),
            )
            .unwrap();
        assert_eq!(wizard.advance().unwrap(), 1);
        let err = wizard.validate_all().unwrap_err();
        assert_eq!(err.field_error().unwrap().field, "password");
        assert_eq!(wizard.step(), 1);
    }

    #[test]
    fn password_is_not_echoed_back() {
        let form = SubAdminForm {
            name: "Grace".to_string(),
            password: "correct horse".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&form).unwrap();
        assert!(json.get("password").is_none());
    }
}
