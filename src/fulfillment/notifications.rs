use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::fulfillment::availability::StockNotification;

/// Error raised when a notification cannot be delivered
///
/// Delivery failures are reported to the caller but never abort order
/// processing; the orchestrator logs them and moves on.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Outbound port for customer notifications
///
/// One operation per notification variant, each taking exactly the
/// parameters that variant carries.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Product out of stock; a restock lands in `lead_time_days` days
    async fn send_delay_notification(
        &self,
        lead_time_days: i32,
        product_name: &str,
    ) -> Result<(), NotificationError>;

    /// Seasonal product out of stock before its season opens
    async fn send_out_of_stock_notification(
        &self,
        product_name: &str,
    ) -> Result<(), NotificationError>;

    /// Seasonal product unavailable for the remainder of the season
    async fn send_unavailability_notification(&self) -> Result<(), NotificationError>;

    /// Perishable product past its expiry date
    async fn send_expiration_notification(
        &self,
        product_name: &str,
        expiry_date: DateTime<Utc>,
    ) -> Result<(), NotificationError>;
}

/// Notification service that writes structured log events
///
/// Stands in for a real delivery channel (mail, SMS, push); the message
/// content mirrors what the customer would receive.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotificationService;

impl LoggingNotificationService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationService for LoggingNotificationService {
    async fn send_delay_notification(
        &self,
        lead_time_days: i32,
        product_name: &str,
    ) -> Result<(), NotificationError> {
        tracing::info!(
            product_name,
            lead_time_days,
            "Product out of stock, restock expected in {} days",
            lead_time_days
        );
        Ok(())
    }

    async fn send_out_of_stock_notification(
        &self,
        product_name: &str,
    ) -> Result<(), NotificationError> {
        tracing::info!(product_name, "Seasonal product out of stock");
        Ok(())
    }

    async fn send_unavailability_notification(&self) -> Result<(), NotificationError> {
        tracing::info!("Seasonal product unavailable for the remainder of the season");
        Ok(())
    }

    async fn send_expiration_notification(
        &self,
        product_name: &str,
        expiry_date: DateTime<Utc>,
    ) -> Result<(), NotificationError> {
        tracing::info!(
            product_name,
            expiry_date = %expiry_date,
            "Product expired"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RecordingState {
    sent: Vec<StockNotification>,
    fail_deliveries: bool,
}

/// In-memory notification service for testing
///
/// Records every dispatched notification and can be switched to fail
/// deliveries to exercise the orchestrator's error handling.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotificationService {
    state: Arc<RwLock<RecordingState>>,
}

impl RecordingNotificationService {
    /// Creates a new recording notification service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail every delivery.
    pub fn set_fail_deliveries(&self, fail: bool) {
        self.state.write().unwrap().fail_deliveries = fail;
    }

    /// Returns all notifications recorded so far, in dispatch order.
    pub fn sent(&self) -> Vec<StockNotification> {
        self.state.read().unwrap().sent.clone()
    }

    /// Returns the number of recorded notifications.
    pub fn sent_count(&self) -> usize {
        self.state.read().unwrap().sent.len()
    }

    fn record(&self, notification: StockNotification) -> Result<(), NotificationError> {
        let mut state = self.state.write().unwrap();
        if state.fail_deliveries {
            return Err(NotificationError::DeliveryFailed(
                "delivery channel unavailable".to_string(),
            ));
        }
        state.sent.push(notification);
        Ok(())
    }
}

#[async_trait]
impl NotificationService for RecordingNotificationService {
    async fn send_delay_notification(
        &self,
        lead_time_days: i32,
        product_name: &str,
    ) -> Result<(), NotificationError> {
        self.record(StockNotification::Delay {
            lead_time_days,
            product_name: product_name.to_string(),
        })
    }

    async fn send_out_of_stock_notification(
        &self,
        product_name: &str,
    ) -> Result<(), NotificationError> {
        self.record(StockNotification::SeasonalOutOfStock {
            product_name: product_name.to_string(),
        })
    }

    async fn send_unavailability_notification(&self) -> Result<(), NotificationError> {
        self.record(StockNotification::SeasonalUnavailable)
    }

    async fn send_expiration_notification(
        &self,
        product_name: &str,
        expiry_date: DateTime<Utc>,
    ) -> Result<(), NotificationError> {
        self.record(StockNotification::Expired {
            product_name: product_name.to_string(),
            expiry_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_recording_service_records_in_order() {
        let service = RecordingNotificationService::new();

        service.send_delay_notification(10, "RJ45 Cable").await.unwrap();
        service.send_unavailability_notification().await.unwrap();

        let sent = service.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[0],
            StockNotification::Delay {
                lead_time_days: 10,
                product_name: "RJ45 Cable".to_string(),
            }
        );
        assert_eq!(sent[1], StockNotification::SeasonalUnavailable);
    }

    #[tokio::test]
    async fn test_recording_service_fail_switch() {
        let service = RecordingNotificationService::new();
        service.set_fail_deliveries(true);

        let expiry = Utc.with_ymd_and_hms(2024, 6, 13, 12, 0, 0).unwrap();
        let result = service.send_expiration_notification("Old Yogurt", expiry).await;

        assert!(result.is_err());
        assert_eq!(service.sent_count(), 0);
    }
}
