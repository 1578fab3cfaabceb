//! Caller identity extraction.
//!
//! Authentication itself lives at the gateway; by the time a request
//! reaches this service the caller's identity and role arrive as
//! trusted headers. The extractor only parses and enforces them.

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use common::CustomerId;
use uuid::Uuid;

use crate::error::ApiError;

const USER_ID_HEADER: &str = "x-user-id";
const USER_ROLE_HEADER: &str = "x-user-role";

/// Caller role. Administrators manage the catalog and the order desk;
/// customers place and follow their own orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Customer,
}

/// The authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub id: CustomerId,
    pub role: Role,
}

impl Principal {
    /// Fails with `Forbidden` unless the caller is an administrator.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }

    /// Whether the caller may inspect the given order.
    pub fn may_view(&self, order_customer: Option<CustomerId>) -> bool {
        self.role == Role::Admin || order_customer == Some(self.id)
    }
}

fn parse_principal(headers: &HeaderMap) -> Result<Principal, ApiError> {
    let id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .map(CustomerId::from_uuid)
        .ok_or(ApiError::Unauthorized)?;

    let role = match headers.get(USER_ROLE_HEADER).map(|v| v.to_str()) {
        Some(Ok("admin")) => Role::Admin,
        Some(Ok("customer")) | None => Role::Customer,
        _ => return Err(ApiError::Unauthorized),
    };

    Ok(Principal { id, role })
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse_principal(&parts.headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(id: Option<&str>, role: Option<&str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(id) = id {
            map.insert(USER_ID_HEADER, HeaderValue::from_str(id).unwrap());
        }
        if let Some(role) = role {
            map.insert(USER_ROLE_HEADER, HeaderValue::from_str(role).unwrap());
        }
        map
    }

    #[test]
    fn missing_id_is_unauthorized() {
        assert!(matches!(
            parse_principal(&headers(None, None)),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn role_defaults_to_customer() {
        let id = Uuid::new_v4().to_string();
        let principal = parse_principal(&headers(Some(&id), None)).unwrap();
        assert_eq!(principal.role, Role::Customer);
    }

    #[test]
    fn unknown_role_is_rejected() {
        let id = Uuid::new_v4().to_string();
        assert!(matches!(
            parse_principal(&headers(Some(&id), Some("root"))),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn admin_passes_the_admin_gate() {
        let id = Uuid::new_v4().to_string();
        let principal = parse_principal(&headers(Some(&id), Some("admin"))).unwrap();
        assert!(principal.require_admin().is_ok());

        let customer = parse_principal(&headers(Some(&id), Some("customer"))).unwrap();
        assert!(matches!(
            customer.require_admin(),
            Err(ApiError::Forbidden)
        ));
    }

    #[test]
    fn customers_may_view_only_their_orders() {
        let id = Uuid::new_v4();
        let principal = parse_principal(&headers(Some(&id.to_string()), None)).unwrap();
        assert!(principal.may_view(Some(CustomerId::from_uuid(id))));
        assert!(!principal.may_view(Some(CustomerId::new())));
        assert!(!principal.may_view(None));
    }
}
