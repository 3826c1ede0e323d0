use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Domain model representing a customer order in the database
///
/// The order itself carries no state beyond its identity; the linked
/// products (line items) drive all fulfillment decisions.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Order {
    #[schema(example = 7)]
    pub id: i32,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for creating a new order
///
/// Each referenced product becomes one line item, fulfilled independently
/// of the others. Quantity is not modeled: processing an order decrements
/// each listed product by exactly one unit.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "Order must reference at least one product"))]
    pub product_ids: Vec<i32>,
}

/// Response DTO for an order with its line items
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: i32,
    pub product_ids: Vec<i32>,
    pub created_at: DateTime<Utc>,
}

/// Acknowledgment returned once an order has been processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProcessedOrder {
    #[schema(example = 7)]
    pub order_id: i32,
}

/// A stock write that failed while processing an order
///
/// Processing is best-effort per line item: a failed write never stops
/// the remaining items, but every failure is reported back.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductUpdateFailure {
    pub product_id: i32,
    pub reason: String,
}
