//! Caller identity.
//!
//! Sign-in happens at the authentication gateway in front of this service,
//! which forwards the verified user as `x-user-id`, `x-user-email` and
//! `x-user-admin` headers.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::domain::aggregates::Order;
use crate::StorefrontError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_ADMIN_HEADER: &str = "x-user-admin";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub is_admin: bool,
}

impl Identity {
    pub fn can_view(&self, order: &Order) -> bool {
        self.is_admin || order.customer_id() == self.uid
    }
}

/// An [`Identity`] with the admin role.
#[derive(Clone, Debug)]
pub struct Admin(pub Identity);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = StorefrontError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let uid = header(parts, USER_ID_HEADER).ok_or(StorefrontError::Unauthenticated)?;
        Ok(Identity {
            uid: uid.to_string(),
            email: header(parts, USER_EMAIL_HEADER).map(str::to_string),
            is_admin: header(parts, USER_ADMIN_HEADER).is_some_and(|v| v.eq_ignore_ascii_case("true")),
        })
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Admin {
    type Rejection = StorefrontError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = Identity::from_request_parts(parts, state).await?;
        if !identity.is_admin {
            tracing::warn!(uid = %identity.uid, "non-admin reached an admin route");
            return Err(StorefrontError::Forbidden);
        }
        Ok(Admin(identity))
    }
}
