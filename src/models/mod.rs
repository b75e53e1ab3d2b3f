use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub r#type: NotificationKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    SubAdmin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::SubAdmin => "subadmin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "subadmin" => Ok(Role::SubAdmin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// A back-office login. Sub-admin accounts point at their `subAdmins` profile document.
#[derive(Debug, Serialize, Clone)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub sub_admin_id: Option<String>,
    pub last_login_time: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Active,
    Inactive,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Inactive => "inactive",
        }
    }
}

/// Back-office areas a sub-admin can be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSection {
    Banners,
    Blog,
    Conferences,
    Submissions,
    Journals,
    Webinars,
    Internships,
    Faqs,
    Inquiries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    HeroBanners,
    BlogPosts,
    BlogCategories,
    Conferences,
    ConferenceSubmissions,
    Journals,
    Webinars,
    WebinarRegistrations,
    Internships,
    Faqs,
    SubAdmins,
    Inquiries,
}

impl Collection {
    pub const ALL: [Collection; 12] = [
        Collection::HeroBanners,
        Collection::BlogPosts,
        Collection::BlogCategories,
        Collection::Conferences,
        Collection::ConferenceSubmissions,
        Collection::Journals,
        Collection::Webinars,
        Collection::WebinarRegistrations,
        Collection::Internships,
        Collection::Faqs,
        Collection::SubAdmins,
        Collection::Inquiries,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::HeroBanners => "heroBanners",
            Collection::BlogPosts => "blogPosts",
            Collection::BlogCategories => "blogCategories",
            Collection::Conferences => "conferences",
            Collection::ConferenceSubmissions => "conferenceSubmissions",
            Collection::Journals => "journals",
            Collection::Webinars => "webinars",
            Collection::WebinarRegistrations => "webinarRegistrations",
            Collection::Internships => "internships",
            Collection::Faqs => "faqs",
            Collection::SubAdmins => "subAdmins",
            Collection::Inquiries => "inquiries",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// The permission that unlocks this collection. `None` means admin only.
    pub fn section(self) -> Option<ContentSection> {
        match self {
            Collection::HeroBanners => Some(ContentSection::Banners),
            Collection::BlogPosts | Collection::BlogCategories => Some(ContentSection::Blog),
            Collection::Conferences => Some(ContentSection::Conferences),
            Collection::ConferenceSubmissions => Some(ContentSection::Submissions),
            Collection::Journals => Some(ContentSection::Journals),
            Collection::Webinars | Collection::WebinarRegistrations => Some(ContentSection::Webinars),
            Collection::Internships => Some(ContentSection::Internships),
            Collection::Faqs => Some(ContentSection::Faqs),
            Collection::Inquiries => Some(ContentSection::Inquiries),
            Collection::SubAdmins => None,
        }
    }
}

/// A typed record that lives in exactly one collection.
pub trait Record: Serialize + DeserializeOwned {
    const COLLECTION: Collection;
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Document<T> {
    pub id: String,
    #[serde(flatten)]
    pub data: T,
}

pub mod content_models;
pub mod db_operations;
