use chrono::{DateTime, Duration, Utc};

use crate::models::{Product, ProductKind};

/// Customer notification selected when a line item cannot be shipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockNotification {
    /// Out of stock; a restock lands in `lead_time_days` days
    Delay {
        lead_time_days: i32,
        product_name: String,
    },
    /// Seasonal product whose season has not opened yet
    SeasonalOutOfStock { product_name: String },
    /// Seasonal product permanently unavailable for the rest of the season
    SeasonalUnavailable,
    /// Perishable product past its expiry date
    Expired {
        product_name: String,
        expiry_date: DateTime<Utc>,
    },
}

/// Pure availability and notification rules, dispatched on product kind
///
/// Both functions are deterministic for a given `(product, now)` pair and
/// have no side effects. Date comparisons are inclusive at the boundary:
/// a product expiring exactly at `now`, or whose restock lands exactly on
/// the season end, still counts as available.
pub struct AvailabilityPolicy;

impl AvailabilityPolicy {
    /// Check whether one unit of the product may be fulfilled at `now`
    ///
    /// # Rules
    /// - NORMAL: available while units remain in stock
    /// - SEASONAL: available while units remain, or when a restock
    ///   (`now + lead_time_days`) would still land within the season
    /// - EXPIRABLE: available while units remain and `now` is not past
    ///   the expiry date
    ///
    /// A SEASONAL product reported available with zero stock is a restock
    /// promise, not a unit on the shelf; the orchestrator treats it as a
    /// backorder (see `FulfillmentService::process_order`).
    pub fn is_available(product: &Product, now: DateTime<Utc>) -> bool {
        match product.product_type {
            ProductKind::Normal => product.available > 0,
            ProductKind::Seasonal => {
                product.available > 0
                    || product
                        .season_end_date
                        .map_or(false, |end| Self::restock_date(product, now) <= end)
            }
            ProductKind::Expirable => {
                product.available > 0
                    && product.expiry_date.map_or(false, |expiry| now <= expiry)
            }
        }
    }

    /// Select the notification owed to the customer for a product that is
    /// not being shipped at `now`
    ///
    /// # Rules
    /// - NORMAL: out of stock → Delay
    /// - SEASONAL, out of stock:
    ///   - restock would land after the season ends → SeasonalUnavailable
    ///   - the season has not started yet → SeasonalOutOfStock
    ///   - otherwise → Delay
    /// - EXPIRABLE: past expiry → Expired
    /// - anything else → None
    pub fn notification_for(product: &Product, now: DateTime<Utc>) -> Option<StockNotification> {
        match product.product_type {
            ProductKind::Normal => {
                if product.available == 0 {
                    Some(StockNotification::Delay {
                        lead_time_days: product.lead_time_days,
                        product_name: product.name.clone(),
                    })
                } else {
                    None
                }
            }
            ProductKind::Seasonal => {
                if product.available > 0 {
                    return None;
                }
                let restock = Self::restock_date(product, now);
                // A missing season end is treated as an already-closed season
                let past_season = product.season_end_date.map_or(true, |end| restock > end);
                if past_season {
                    Some(StockNotification::SeasonalUnavailable)
                } else if product.season_start_date.map_or(false, |start| start > now) {
                    Some(StockNotification::SeasonalOutOfStock {
                        product_name: product.name.clone(),
                    })
                } else {
                    Some(StockNotification::Delay {
                        lead_time_days: product.lead_time_days,
                        product_name: product.name.clone(),
                    })
                }
            }
            ProductKind::Expirable => match product.expiry_date {
                Some(expiry) if now > expiry => Some(StockNotification::Expired {
                    product_name: product.name.clone(),
                    expiry_date: expiry,
                }),
                _ => None,
            },
        }
    }

    /// Date the next restock lands, given the product's lead time
    fn restock_date(product: &Product, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(product.lead_time_days as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn days(n: i64) -> Duration {
        Duration::days(n)
    }

    fn normal(available: i32, lead_time_days: i32) -> Product {
        Product {
            id: 1,
            name: "RJ45 Cable".to_string(),
            product_type: ProductKind::Normal,
            available,
            lead_time_days,
            expiry_date: None,
            season_start_date: None,
            season_end_date: None,
            created_at: reference_now(),
            updated_at: reference_now(),
        }
    }

    fn seasonal(
        available: i32,
        lead_time_days: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Product {
        Product {
            id: 2,
            name: "Watermelon".to_string(),
            product_type: ProductKind::Seasonal,
            available,
            lead_time_days,
            expiry_date: None,
            season_start_date: Some(start),
            season_end_date: Some(end),
            created_at: reference_now(),
            updated_at: reference_now(),
        }
    }

    fn expirable(available: i32, expiry: DateTime<Utc>) -> Product {
        Product {
            id: 3,
            name: "Fresh Milk".to_string(),
            product_type: ProductKind::Expirable,
            available,
            lead_time_days: 2,
            expiry_date: Some(expiry),
            season_start_date: None,
            season_end_date: None,
            created_at: reference_now(),
            updated_at: reference_now(),
        }
    }

    // Availability: NORMAL

    #[test]
    fn test_normal_with_stock_is_available() {
        assert!(AvailabilityPolicy::is_available(&normal(30, 10), reference_now()));
    }

    #[test]
    fn test_normal_without_stock_is_unavailable() {
        assert!(!AvailabilityPolicy::is_available(&normal(0, 10), reference_now()));
    }

    #[test]
    fn test_normal_ignores_now() {
        let product = normal(1, 10);
        assert!(AvailabilityPolicy::is_available(&product, reference_now() - days(500)));
        assert!(AvailabilityPolicy::is_available(&product, reference_now() + days(500)));
    }

    // Availability: SEASONAL

    #[test]
    fn test_seasonal_in_season_with_stock_is_available() {
        let now = reference_now();
        let product = seasonal(30, 10, now - days(2), now + days(58));
        assert!(AvailabilityPolicy::is_available(&product, now));
    }

    #[test]
    fn test_seasonal_restock_within_season_is_available_without_stock() {
        let now = reference_now();
        let product = seasonal(0, 2, now - days(1), now + days(10));
        assert!(AvailabilityPolicy::is_available(&product, now));
    }

    #[test]
    fn test_seasonal_restock_after_season_is_unavailable() {
        let now = reference_now();
        let product = seasonal(0, 10, now - days(1), now + days(5));
        assert!(!AvailabilityPolicy::is_available(&product, now));
    }

    #[test]
    fn test_seasonal_restock_on_season_end_is_available() {
        // Boundary: restock landing exactly on the season end still counts
        let now = reference_now();
        let product = seasonal(0, 5, now - days(1), now + days(5));
        assert!(AvailabilityPolicy::is_available(&product, now));
    }

    // Availability: EXPIRABLE

    #[test]
    fn test_expirable_fresh_with_stock_is_available() {
        let now = reference_now();
        assert!(AvailabilityPolicy::is_available(&expirable(6, now + days(1)), now));
    }

    #[test]
    fn test_expirable_on_expiry_date_is_available() {
        // Boundary: expiring exactly now still counts
        let now = reference_now();
        assert!(AvailabilityPolicy::is_available(&expirable(6, now), now));
    }

    #[test]
    fn test_expirable_past_expiry_is_unavailable() {
        let now = reference_now();
        assert!(!AvailabilityPolicy::is_available(&expirable(6, now - days(2)), now));
    }

    #[test]
    fn test_expirable_fresh_without_stock_is_unavailable() {
        let now = reference_now();
        assert!(!AvailabilityPolicy::is_available(&expirable(0, now + days(1)), now));
    }

    // Notification selection

    #[test]
    fn test_normal_out_of_stock_selects_delay() {
        let notification = AvailabilityPolicy::notification_for(&normal(0, 10), reference_now());
        assert_eq!(
            notification,
            Some(StockNotification::Delay {
                lead_time_days: 10,
                product_name: "RJ45 Cable".to_string(),
            })
        );
    }

    #[test]
    fn test_normal_with_stock_selects_nothing() {
        assert_eq!(
            AvailabilityPolicy::notification_for(&normal(3, 10), reference_now()),
            None
        );
    }

    #[test]
    fn test_seasonal_restock_after_season_selects_unavailable() {
        let now = reference_now();
        let product = seasonal(0, 10, now - days(1), now + days(5));
        assert_eq!(
            AvailabilityPolicy::notification_for(&product, now),
            Some(StockNotification::SeasonalUnavailable)
        );
    }

    #[test]
    fn test_seasonal_in_season_out_of_stock_selects_delay() {
        let now = reference_now();
        let product = seasonal(0, 2, now - days(1), now + days(10));
        assert_eq!(
            AvailabilityPolicy::notification_for(&product, now),
            Some(StockNotification::Delay {
                lead_time_days: 2,
                product_name: "Watermelon".to_string(),
            })
        );
    }

    #[test]
    fn test_seasonal_before_season_start_selects_out_of_stock() {
        let now = reference_now();
        let product = seasonal(0, 5, now + days(2), now + days(10));
        assert_eq!(
            AvailabilityPolicy::notification_for(&product, now),
            Some(StockNotification::SeasonalOutOfStock {
                product_name: "Watermelon".to_string(),
            })
        );
    }

    #[test]
    fn test_seasonal_with_stock_selects_nothing() {
        let now = reference_now();
        let product = seasonal(4, 5, now - days(1), now + days(10));
        assert_eq!(AvailabilityPolicy::notification_for(&product, now), None);
    }

    #[test]
    fn test_expired_selects_expiration_notice() {
        let now = reference_now();
        let expiry = now - days(2);
        assert_eq!(
            AvailabilityPolicy::notification_for(&expirable(6, expiry), now),
            Some(StockNotification::Expired {
                product_name: "Fresh Milk".to_string(),
                expiry_date: expiry,
            })
        );
    }

    #[test]
    fn test_fresh_expirable_selects_nothing() {
        let now = reference_now();
        assert_eq!(
            AvailabilityPolicy::notification_for(&expirable(0, now + days(1)), now),
            None
        );
    }

    #[test]
    fn test_policy_is_deterministic() {
        let now = reference_now();
        let product = seasonal(0, 10, now - days(1), now + days(5));
        assert_eq!(
            AvailabilityPolicy::is_available(&product, now),
            AvailabilityPolicy::is_available(&product, now)
        );
        assert_eq!(
            AvailabilityPolicy::notification_for(&product, now),
            AvailabilityPolicy::notification_for(&product, now)
        );
    }
}
