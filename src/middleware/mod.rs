use actix_session::{Session, SessionExt, SessionInsertError};
use actix_web::{dev, guard, FromRequest, HttpRequest};
use serde::Serialize;
use std::env;
use std::future::{ready, Ready};

use crate::models::{ContentSection, Role};

const EMAIL_KEY: &str = "email";
const ROLE_KEY: &str = "role";
const PERMISSIONS_KEY: &str = "permissions";

/// The logged-in back-office user, rebuilt from the session on each request.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedStaff {
    pub email: String,
    pub role: Role,
    /// Empty for admins, who can use everything.
    pub permissions: Vec<ContentSection>,
}

impl AuthenticatedStaff {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// `None` marks an admin-only area.
    pub fn can_use(&self, section: Option<ContentSection>) -> bool {
        match (self.role, section) {
            (Role::Admin, _) => true,
            (Role::SubAdmin, Some(section)) => self.permissions.contains(&section),
            (Role::SubAdmin, None) => false,
        }
    }

    pub fn store(&self, session: &Session) -> Result<(), SessionInsertError> {
        session.insert(EMAIL_KEY, &self.email)?;
        session.insert(ROLE_KEY, self.role)?;
        session.insert(PERMISSIONS_KEY, &self.permissions)?;
        Ok(())
    }

    pub fn from_session(session: &Session) -> Option<Self> {
        let email = session.get::<String>(EMAIL_KEY).ok().flatten()?;
        let role = session.get::<Role>(ROLE_KEY).ok().flatten()?;
        let permissions = session
            .get::<Vec<ContentSection>>(PERMISSIONS_KEY)
            .ok()
            .flatten()
            .unwrap_or_default();
        Some(Self { email, role, permissions })
    }
}

impl FromRequest for AuthenticatedStaff {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        match AuthenticatedStaff::from_session(&req.get_session()) {
            Some(staff) => ready(Ok(staff)),
            None => ready(Err(actix_web::error::ErrorUnauthorized("Not logged in."))),
        }
    }
}

fn session_role(session: &Session) -> Option<Role> {
    session.get::<Role>(ROLE_KEY).unwrap_or(None)
}

/// Admins and sub-admins alike.
pub fn staff_guard(session: &Session) -> bool {
    session_role(session).is_some()
}

pub fn ip_guard(ctx: &guard::GuardContext) -> bool {
    let allowed_ips_str = match env::var("ADMIN_LOGIN_ACCEPT_IP") {
        Ok(val) => val,
        Err(_) => {
            log::warn!("ADMIN_LOGIN_ACCEPT_IP is not set. Denying all back-office requests.");
            return false;
        }
    };

    if allowed_ips_str.trim() == "*" {
        return true;
    }

    // Behind a reverse proxy the first X-Forwarded-For entry is the client.
    let request_ip = ctx
        .head()
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| ctx.head().peer_addr.map(|addr| addr.ip().to_string()));

    let peer_addr = match request_ip {
        Some(ip) => ip,
        None => {
            log::warn!("Could not determine peer IP address for back-office request.");
            return false;
        }
    };

    let is_allowed = allowed_ips_str.split(',').any(|ip| ip.trim() == peer_addr);
    if !is_allowed {
        log::warn!("Blocked back-office request from unauthorized IP: {}", peer_addr);
    }
    is_allowed
}
