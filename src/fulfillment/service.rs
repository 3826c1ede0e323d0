use std::sync::Arc;

use chrono::Utc;

use crate::fulfillment::availability::{AvailabilityPolicy, StockNotification};
use crate::fulfillment::error::FulfillmentError;
use crate::fulfillment::models::{
    CreateOrderRequest, Order, OrderResponse, ProcessedOrder, ProductUpdateFailure,
};
use crate::fulfillment::notifications::{NotificationError, NotificationService};
use crate::fulfillment::repository::FulfillmentRepository;
use crate::models::Product;

/// Service coordinating order fulfillment
///
/// Stateless between calls; each `process_order` invocation is an
/// independent pass over one order's line items.
#[derive(Clone)]
pub struct FulfillmentService {
    repository: Arc<dyn FulfillmentRepository>,
    notifications: Arc<dyn NotificationService>,
}

impl FulfillmentService {
    /// Create a new FulfillmentService
    pub fn new(
        repository: Arc<dyn FulfillmentRepository>,
        notifications: Arc<dyn NotificationService>,
    ) -> Self {
        Self {
            repository,
            notifications,
        }
    }

    /// Create a new order referencing existing products
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<Order, FulfillmentError> {
        if request.product_ids.is_empty() {
            return Err(FulfillmentError::ValidationError(
                "Order must reference at least one product".to_string(),
            ));
        }

        self.repository.create_order(&request.product_ids).await
    }

    /// Get an order with its line items
    pub async fn get_order(&self, order_id: i32) -> Result<OrderResponse, FulfillmentError> {
        let (order, products) = self
            .repository
            .find_order_with_products(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))?;

        Ok(OrderResponse {
            id: order.id,
            product_ids: products.iter().map(|p| p.id).collect(),
            created_at: order.created_at,
        })
    }

    /// Process every line item of an order
    ///
    /// One reference timestamp is captured at the start and shared by all
    /// line-item decisions, so a single call sees one consistent point in
    /// time. Per product, exactly one of two things happens:
    /// - a unit is on the shelf and fulfillable: stock is decremented by
    ///   one and persisted;
    /// - otherwise the owed customer notification (if any) is dispatched.
    ///
    /// A SEASONAL product whose availability rests purely on a restock
    /// promise has no unit to ship; it is treated as a backorder and the
    /// customer gets the delay notification. Stock is never driven below
    /// zero. An EXPIRABLE product past its expiry additionally has its
    /// remaining stock written off.
    ///
    /// Processing is best-effort per line item: failed stock writes are
    /// collected and reported after every item has been handled, and
    /// failed notification deliveries are logged without affecting the
    /// outcome.
    pub async fn process_order(&self, order_id: i32) -> Result<ProcessedOrder, FulfillmentError> {
        let (order, products) = self
            .repository
            .find_order_with_products(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))?;

        // Single reference timestamp for every decision in this call
        let now = Utc::now();
        let mut failures: Vec<ProductUpdateFailure> = Vec::new();

        tracing::debug!("Processing order {} with {} line item(s)", order.id, products.len());

        for product in products {
            let shippable =
                AvailabilityPolicy::is_available(&product, now) && product.available > 0;

            if shippable {
                let remaining = product.available - 1;
                match self.repository.update_availability(product.id, remaining).await {
                    Ok(()) => {
                        tracing::debug!(
                            "Shipped one unit of product {} ({} remaining)",
                            product.id,
                            remaining
                        );
                    }
                    Err(err) => {
                        tracing::error!(
                            "Failed to persist stock decrement for product {}: {}",
                            product.id,
                            err
                        );
                        failures.push(ProductUpdateFailure {
                            product_id: product.id,
                            reason: err.to_string(),
                        });
                    }
                }
                continue;
            }

            match AvailabilityPolicy::notification_for(&product, now) {
                Some(notification) => {
                    if let StockNotification::Expired { .. } = notification {
                        self.write_off_expired_stock(&product, &mut failures).await;
                    }

                    if let Err(err) = self.dispatch(&notification).await {
                        tracing::warn!(
                            "Notification delivery failed for product {}: {}",
                            product.id,
                            err
                        );
                    }
                }
                None => {
                    tracing::debug!(
                        "Product {} is not fulfillable and owes no notification",
                        product.id
                    );
                }
            }
        }

        if !failures.is_empty() {
            return Err(FulfillmentError::StockUpdateFailed {
                order_id: order.id,
                failures,
            });
        }

        Ok(ProcessedOrder { order_id: order.id })
    }

    /// Zero out the remaining stock of an expired product
    ///
    /// Expired units are unsellable; the count is written off so the
    /// catalog reflects reality. Skipped when the shelf is already empty.
    async fn write_off_expired_stock(
        &self,
        product: &Product,
        failures: &mut Vec<ProductUpdateFailure>,
    ) {
        if product.available == 0 {
            return;
        }

        if let Err(err) = self.repository.update_availability(product.id, 0).await {
            tracing::error!(
                "Failed to write off expired stock for product {}: {}",
                product.id,
                err
            );
            failures.push(ProductUpdateFailure {
                product_id: product.id,
                reason: err.to_string(),
            });
        }
    }

    async fn dispatch(&self, notification: &StockNotification) -> Result<(), NotificationError> {
        match notification {
            StockNotification::Delay {
                lead_time_days,
                product_name,
            } => {
                self.notifications
                    .send_delay_notification(*lead_time_days, product_name)
                    .await
            }
            StockNotification::SeasonalOutOfStock { product_name } => {
                self.notifications
                    .send_out_of_stock_notification(product_name)
                    .await
            }
            StockNotification::SeasonalUnavailable => {
                self.notifications.send_unavailability_notification().await
            }
            StockNotification::Expired {
                product_name,
                expiry_date,
            } => {
                self.notifications
                    .send_expiration_notification(product_name, *expiry_date)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fulfillment::notifications::RecordingNotificationService;
    use crate::fulfillment::repository::InMemoryFulfillmentRepository;
    use crate::models::{Product, ProductKind};
    use chrono::{DateTime, Duration, Utc};

    struct Fixture {
        service: FulfillmentService,
        repository: Arc<InMemoryFulfillmentRepository>,
        notifications: Arc<RecordingNotificationService>,
    }

    fn fixture() -> Fixture {
        let repository = Arc::new(InMemoryFulfillmentRepository::new());
        let notifications = Arc::new(RecordingNotificationService::new());
        let service = FulfillmentService::new(repository.clone(), notifications.clone());
        Fixture {
            service,
            repository,
            notifications,
        }
    }

    fn days(n: i64) -> Duration {
        Duration::days(n)
    }

    fn base_product(id: i32, name: &str, kind: ProductKind) -> Product {
        Product {
            id,
            name: name.to_string(),
            product_type: kind,
            available: 0,
            lead_time_days: 0,
            expiry_date: None,
            season_start_date: None,
            season_end_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn normal(id: i32, name: &str, available: i32, lead_time_days: i32) -> Product {
        Product {
            available,
            lead_time_days,
            ..base_product(id, name, ProductKind::Normal)
        }
    }

    fn seasonal(
        id: i32,
        name: &str,
        available: i32,
        lead_time_days: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Product {
        Product {
            available,
            lead_time_days,
            season_start_date: Some(start),
            season_end_date: Some(end),
            ..base_product(id, name, ProductKind::Seasonal)
        }
    }

    fn expirable(id: i32, name: &str, available: i32, expiry: DateTime<Utc>) -> Product {
        Product {
            available,
            expiry_date: Some(expiry),
            ..base_product(id, name, ProductKind::Expirable)
        }
    }

    #[tokio::test]
    async fn test_normal_product_with_stock_is_decremented() {
        let f = fixture();
        f.repository.insert_product(normal(1, "USB Cable", 30, 10));
        let order = f.repository.create_order(&[1]).await.unwrap();

        let result = f.service.process_order(order.id).await.unwrap();

        assert_eq!(result, ProcessedOrder { order_id: order.id });
        assert_eq!(f.repository.product(1).unwrap().available, 29);
        assert_eq!(f.notifications.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_normal_product_out_of_stock_sends_delay() {
        let f = fixture();
        f.repository.insert_product(normal(1, "USB Cable", 0, 10));
        let order = f.repository.create_order(&[1]).await.unwrap();

        f.service.process_order(order.id).await.unwrap();

        assert_eq!(f.repository.product(1).unwrap().available, 0);
        assert_eq!(
            f.notifications.sent(),
            vec![StockNotification::Delay {
                lead_time_days: 10,
                product_name: "USB Cable".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_expired_product_sends_notice_and_writes_off_stock() {
        let f = fixture();
        let expiry = Utc::now() - days(2);
        f.repository.insert_product(expirable(1, "Old Yogurt", 6, expiry));
        let order = f.repository.create_order(&[1]).await.unwrap();

        f.service.process_order(order.id).await.unwrap();

        assert_eq!(f.repository.product(1).unwrap().available, 0);
        assert_eq!(
            f.notifications.sent(),
            vec![StockNotification::Expired {
                product_name: "Old Yogurt".to_string(),
                expiry_date: expiry,
            }]
        );
    }

    #[tokio::test]
    async fn test_fresh_expirable_product_is_decremented() {
        let f = fixture();
        f.repository
            .insert_product(expirable(1, "Fresh Milk", 2, Utc::now() + days(1)));
        let order = f.repository.create_order(&[1]).await.unwrap();

        f.service.process_order(order.id).await.unwrap();

        assert_eq!(f.repository.product(1).unwrap().available, 1);
        assert_eq!(f.notifications.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_seasonal_product_in_season_with_stock_is_decremented() {
        let f = fixture();
        let now = Utc::now();
        f.repository.insert_product(seasonal(
            1,
            "Watermelon",
            30,
            10,
            now - days(2),
            now + days(58),
        ));
        let order = f.repository.create_order(&[1]).await.unwrap();

        f.service.process_order(order.id).await.unwrap();

        assert_eq!(f.repository.product(1).unwrap().available, 29);
        assert_eq!(f.notifications.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_seasonal_restock_after_season_sends_unavailable() {
        let f = fixture();
        let now = Utc::now();
        f.repository.insert_product(seasonal(
            1,
            "Late Watermelon",
            0,
            10,
            now - days(1),
            now + days(5),
        ));
        let order = f.repository.create_order(&[1]).await.unwrap();

        f.service.process_order(order.id).await.unwrap();

        assert_eq!(f.repository.product(1).unwrap().available, 0);
        assert_eq!(
            f.notifications.sent(),
            vec![StockNotification::SeasonalUnavailable]
        );
    }

    #[tokio::test]
    async fn test_seasonal_restock_within_season_is_backordered_with_delay() {
        // Zero stock but the restock lands in season: no unit is shipped,
        // no negative decrement, the customer gets the delay notice.
        let f = fixture();
        let now = Utc::now();
        f.repository.insert_product(seasonal(
            1,
            "Valid Grapes",
            0,
            2,
            now - days(1),
            now + days(10),
        ));
        let order = f.repository.create_order(&[1]).await.unwrap();

        f.service.process_order(order.id).await.unwrap();

        assert_eq!(f.repository.product(1).unwrap().available, 0);
        assert_eq!(
            f.notifications.sent(),
            vec![StockNotification::Delay {
                lead_time_days: 2,
                product_name: "Valid Grapes".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_seasonal_before_season_start_sends_out_of_stock() {
        let f = fixture();
        let now = Utc::now();
        f.repository.insert_product(seasonal(
            1,
            "Early Mango",
            0,
            5,
            now + days(2),
            now + days(10),
        ));
        let order = f.repository.create_order(&[1]).await.unwrap();

        f.service.process_order(order.id).await.unwrap();

        assert_eq!(f.repository.product(1).unwrap().available, 0);
        assert_eq!(
            f.notifications.sent(),
            vec![StockNotification::SeasonalOutOfStock {
                product_name: "Early Mango".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_order_is_rejected() {
        let f = fixture();
        let result = f.service.process_order(404).await;
        assert!(matches!(result, Err(FulfillmentError::OrderNotFound(404))));
    }

    #[tokio::test]
    async fn test_empty_order_is_a_noop_success() {
        let f = fixture();
        let order = f.repository.create_order(&[]).await.unwrap();

        let result = f.service.process_order(order.id).await.unwrap();

        assert_eq!(result.order_id, order.id);
        assert_eq!(f.notifications.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_mixed_order_handles_every_line_item() {
        let f = fixture();
        let now = Utc::now();
        f.repository.insert_product(normal(1, "USB Cable", 30, 10));
        f.repository.insert_product(normal(2, "HDMI Cable", 0, 7));
        f.repository
            .insert_product(expirable(3, "Old Yogurt", 6, now - days(2)));
        let order = f.repository.create_order(&[1, 2, 3]).await.unwrap();

        f.service.process_order(order.id).await.unwrap();

        assert_eq!(f.repository.product(1).unwrap().available, 29);
        assert_eq!(f.repository.product(2).unwrap().available, 0);
        assert_eq!(f.repository.product(3).unwrap().available, 0);
        assert_eq!(f.notifications.sent_count(), 2);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_block_remaining_items() {
        let f = fixture();
        f.repository.insert_product(normal(1, "HDMI Cable", 0, 7));
        f.repository.insert_product(normal(2, "USB Cable", 5, 10));
        f.notifications.set_fail_deliveries(true);
        let order = f.repository.create_order(&[1, 2]).await.unwrap();

        let result = f.service.process_order(order.id).await.unwrap();

        // Delivery failure is swallowed; the in-stock item still ships
        assert_eq!(result.order_id, order.id);
        assert_eq!(f.repository.product(2).unwrap().available, 4);
    }

    #[tokio::test]
    async fn test_stock_write_failure_is_aggregated_and_does_not_block() {
        let f = fixture();
        f.repository.insert_product(normal(1, "USB Cable", 5, 10));
        f.repository.insert_product(normal(2, "HDMI Cable", 5, 7));
        f.repository.set_fail_update(1);
        let order = f.repository.create_order(&[1, 2]).await.unwrap();

        let result = f.service.process_order(order.id).await;

        match result {
            Err(FulfillmentError::StockUpdateFailed { order_id, failures }) => {
                assert_eq!(order_id, order.id);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].product_id, 1);
            }
            other => panic!("expected StockUpdateFailed, got {:?}", other.map(|r| r.order_id)),
        }

        // The second product was still processed
        assert_eq!(f.repository.product(2).unwrap().available, 4);
    }

    #[tokio::test]
    async fn test_create_order_rejects_empty_request() {
        let f = fixture();
        let result = f
            .service
            .create_order(CreateOrderRequest { product_ids: vec![] })
            .await;
        assert!(matches!(result, Err(FulfillmentError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_get_order_returns_line_items() {
        let f = fixture();
        f.repository.insert_product(normal(1, "USB Cable", 5, 10));
        f.repository.insert_product(normal(2, "HDMI Cable", 5, 7));
        let order = f.repository.create_order(&[2, 1]).await.unwrap();

        let response = f.service.get_order(order.id).await.unwrap();

        assert_eq!(response.id, order.id);
        assert_eq!(response.product_ids, vec![2, 1]);
    }
}
