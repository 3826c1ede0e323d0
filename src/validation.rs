// Validation utilities module
// Provides custom validation functions for domain-specific rules

use chrono::{DateTime, Utc};
use validator::ValidationError;

use crate::models::{CreateProduct, ProductKind};

/// Validates that the optional date fields match the product type:
/// EXPIRABLE products carry an expiry date and no season window, SEASONAL
/// products carry a full season window and no expiry date, NORMAL products
/// carry neither.
pub fn validate_kind_dates(
    product_type: ProductKind,
    expiry_date: Option<DateTime<Utc>>,
    season_start_date: Option<DateTime<Utc>>,
    season_end_date: Option<DateTime<Utc>>,
) -> Result<(), ValidationError> {
    match product_type {
        ProductKind::Normal => {
            if expiry_date.is_some() || season_start_date.is_some() || season_end_date.is_some() {
                return Err(ValidationError::new("normal_product_has_date_fields"));
            }
        }
        ProductKind::Seasonal => {
            if expiry_date.is_some() {
                return Err(ValidationError::new("seasonal_product_has_expiry_date"));
            }
            let (start, end) = match (season_start_date, season_end_date) {
                (Some(start), Some(end)) => (start, end),
                _ => return Err(ValidationError::new("seasonal_product_missing_season_window")),
            };
            if end < start {
                return Err(ValidationError::new("season_window_end_before_start"));
            }
        }
        ProductKind::Expirable => {
            if season_start_date.is_some() || season_end_date.is_some() {
                return Err(ValidationError::new("expirable_product_has_season_window"));
            }
            if expiry_date.is_none() {
                return Err(ValidationError::new("expirable_product_missing_expiry_date"));
            }
        }
    }
    Ok(())
}

/// Schema-level validator for CreateProduct requests
pub fn validate_create_product_dates(product: &CreateProduct) -> Result<(), ValidationError> {
    validate_kind_dates(
        product.product_type,
        product.expiry_date,
        product.season_start_date,
        product.season_end_date,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_normal_product_rejects_dates() {
        assert!(validate_kind_dates(ProductKind::Normal, None, None, None).is_ok());
        assert!(
            validate_kind_dates(ProductKind::Normal, Some(date(2024, 1, 1)), None, None).is_err()
        );
        assert!(
            validate_kind_dates(ProductKind::Normal, None, Some(date(2024, 1, 1)), None).is_err()
        );
    }

    #[test]
    fn test_seasonal_product_requires_full_window() {
        assert!(validate_kind_dates(
            ProductKind::Seasonal,
            None,
            Some(date(2024, 6, 1)),
            Some(date(2024, 9, 1)),
        )
        .is_ok());
        assert!(
            validate_kind_dates(ProductKind::Seasonal, None, Some(date(2024, 6, 1)), None).is_err()
        );
        assert!(validate_kind_dates(ProductKind::Seasonal, None, None, None).is_err());
    }

    #[test]
    fn test_seasonal_product_rejects_inverted_window() {
        assert!(validate_kind_dates(
            ProductKind::Seasonal,
            None,
            Some(date(2024, 9, 1)),
            Some(date(2024, 6, 1)),
        )
        .is_err());
    }

    #[test]
    fn test_expirable_product_requires_expiry() {
        assert!(
            validate_kind_dates(ProductKind::Expirable, Some(date(2024, 1, 1)), None, None).is_ok()
        );
        assert!(validate_kind_dates(ProductKind::Expirable, None, None, None).is_err());
        assert!(validate_kind_dates(
            ProductKind::Expirable,
            Some(date(2024, 1, 1)),
            Some(date(2024, 6, 1)),
            Some(date(2024, 9, 1)),
        )
        .is_err());
    }
}
