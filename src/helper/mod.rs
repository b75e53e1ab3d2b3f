pub mod admin_helpers;
pub mod content_helpers;
pub mod draft_helpers;
pub mod file_encoding_helpers;
pub mod form_helpers;
pub mod notification_helpers;
pub mod public_helpers;
pub mod sanitization_helpers;
pub mod submission_helpers;
