//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::OrderError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or malformed identity headers.
    Unauthorized,
    /// The caller's role does not allow the operation.
    Forbidden,
    /// Store or domain error.
    Store(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "forbidden".to_string()),
            ApiError::Store(err) => store_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn store_error_to_response(err: StoreError) -> (StatusCode, String) {
    match &err {
        StoreError::ProductNotFound(_) | StoreError::OrderNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        // Conflicts with the current state of the world: retrying the
        // identical request will not help until something else changes.
        StoreError::Inventory(_)
        | StoreError::NameConflict { .. }
        | StoreError::Order(OrderError::NotConfirmed) => (StatusCode::CONFLICT, err.to_string()),
        StoreError::Order(_) | StoreError::Catalog(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        StoreError::Storage(_) => {
            tracing::error!(error = %err, "storage failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            )
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProductId;
    use domain::InventoryError;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError::Store(StoreError::ProductNotFound(ProductId::new()));
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn insufficient_stock_maps_to_conflict() {
        let err = ApiError::Store(StoreError::Inventory(InventoryError::InsufficientStock {
            product_id: ProductId::new(),
            requested: 3,
            available: 2,
        }));
        assert_eq!(status_of(err), StatusCode::CONFLICT);
    }

    #[test]
    fn premature_registration_maps_to_conflict() {
        let err = ApiError::Store(StoreError::Order(OrderError::NotConfirmed));
        assert_eq!(status_of(err), StatusCode::CONFLICT);
    }

    #[test]
    fn validation_maps_to_bad_request() {
        let err = ApiError::Store(StoreError::Order(OrderError::EmptyOrder));
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }
}
