// HTTP handlers for order endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::fulfillment::error::FulfillmentError;
use crate::fulfillment::models::{CreateOrderRequest, OrderResponse, ProcessedOrder};

/// Handler for POST /api/orders
/// Creates a new order referencing existing products
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created successfully", body = OrderResponse),
        (status = 400, description = "Invalid or unknown product reference", body = String, example = json!({"error": "Product with id 99 not found"})),
        (status = 500, description = "Internal server error", body = String, example = json!({"error": "A database error occurred"}))
    ),
    tag = "orders"
)]
pub async fn create_order_handler(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), FulfillmentError> {
    request
        .validate()
        .map_err(|e| FulfillmentError::ValidationError(e.to_string()))?;

    let product_ids = request.product_ids.clone();
    let order = state.fulfillment.create_order(request).await?;

    tracing::info!("Created order {} with {} line item(s)", order.id, product_ids.len());

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            id: order.id,
            product_ids,
            created_at: order.created_at,
        }),
    ))
}

/// Handler for GET /api/orders/:order_id
/// Retrieves an order with its line items
#[utoipa::path(
    get,
    path = "/api/orders/{order_id}",
    params(
        ("order_id" = i32, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found", body = String, example = json!({"error": "Order with id 7 not found"}))
    ),
    tag = "orders"
)]
pub async fn get_order_handler(
    State(state): State<crate::AppState>,
    Path(order_id): Path<i32>,
) -> Result<Json<OrderResponse>, FulfillmentError> {
    let order = state.fulfillment.get_order(order_id).await?;
    Ok(Json(order))
}

/// Handler for POST /api/orders/:order_id/process
/// Runs the fulfillment decision over every line item of the order
#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/process",
    params(
        ("order_id" = i32, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order processed", body = ProcessedOrder),
        (status = 404, description = "Order not found", body = String, example = json!({"error": "Order with id 7 not found"})),
        (status = 500, description = "One or more stock updates failed", body = String, example = json!({"error": "Stock update failed while processing order 7"}))
    ),
    tag = "orders"
)]
pub async fn process_order_handler(
    State(state): State<crate::AppState>,
    Path(order_id): Path<i32>,
) -> Result<Json<ProcessedOrder>, FulfillmentError> {
    tracing::debug!("Processing order {}", order_id);

    let processed = state.fulfillment.process_order(order_id).await?;

    tracing::info!("Successfully processed order {}", processed.order_id);
    Ok(Json(processed))
}
