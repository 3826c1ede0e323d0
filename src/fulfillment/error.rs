use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::fulfillment::models::ProductUpdateFailure;

/// Error types for order fulfillment operations
#[derive(Debug, thiserror::Error)]
pub enum FulfillmentError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Order not found: {0}")]
    OrderNotFound(i32),

    #[error("Product not found: {0}")]
    ProductNotFound(i32),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Stock update failed for {} product(s) in order {order_id}", .failures.len())]
    StockUpdateFailed {
        order_id: i32,
        failures: Vec<ProductUpdateFailure>,
    },
}

impl From<sqlx::Error> for FulfillmentError {
    fn from(err: sqlx::Error) -> Self {
        FulfillmentError::DatabaseError(err.to_string())
    }
}

impl IntoResponse for FulfillmentError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            FulfillmentError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "A database error occurred" }),
                )
            }
            FulfillmentError::OrderNotFound(id) => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("Order with id {} not found", id) }),
            ),
            FulfillmentError::ProductNotFound(id) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": format!("Product with id {} not found", id) }),
            ),
            FulfillmentError::ValidationError(msg) => {
                (StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            FulfillmentError::StockUpdateFailed { order_id, failures } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": format!("Stock update failed while processing order {}", order_id),
                    "failures": failures,
                }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
