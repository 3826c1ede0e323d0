use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Product kind, controlling which availability rule applies
///
/// The set is closed: a row whose `product_type` column holds any other
/// value fails to decode, so it can never reach the fulfillment logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ProductKind {
    /// Perpetually stocked; fulfillable while units remain
    Normal,
    /// Sold within a season window; a restock promise inside the window counts
    Seasonal,
    /// Perishable; unfulfillable past its expiry date
    Expirable,
}

impl ProductKind {
    /// Convert kind to its stored string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductKind::Normal => "NORMAL",
            ProductKind::Seasonal => "SEASONAL",
            ProductKind::Expirable => "EXPIRABLE",
        }
    }

    /// Parse kind from string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_uppercase().as_str() {
            "NORMAL" => Ok(ProductKind::Normal),
            "SEASONAL" => Ok(ProductKind::Seasonal),
            "EXPIRABLE" => Ok(ProductKind::Expirable),
            _ => Err(format!("Invalid product type: {}", s)),
        }
    }
}

impl std::fmt::Display for ProductKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents a catalog product in the database
///
/// `expiry_date` is populated exactly for EXPIRABLE products, and
/// `season_start_date`/`season_end_date` exactly for SEASONAL ones; a
/// NORMAL product carries none of the date fields. The invariant is
/// enforced at the request boundary (see `validation`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Product {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "RJ45 Cable")]
    pub name: String,
    #[schema(example = "NORMAL")]
    pub product_type: ProductKind,
    /// Units currently in stock
    #[schema(example = 30, minimum = 0)]
    pub available: i32,
    /// Days until the next restock, used for delay messaging
    #[schema(example = 10, minimum = 0)]
    pub lead_time_days: i32,
    pub expiry_date: Option<DateTime<Utc>>,
    pub season_start_date: Option<DateTime<Utc>>,
    pub season_end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents the data needed to create a new product
///
/// Used for POST /api/products requests. The id and timestamps are
/// auto-generated; date fields must be consistent with `product_type`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "crate::validation::validate_create_product_dates"))]
pub struct CreateProduct {
    #[schema(example = "Fresh Milk")]
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,
    #[schema(example = "EXPIRABLE")]
    pub product_type: ProductKind,
    #[schema(example = 6, minimum = 0)]
    #[validate(range(min = 0, message = "Available count must be non-negative"))]
    pub available: i32,
    #[schema(example = 2, minimum = 0)]
    #[validate(range(min = 0, message = "Lead time must be non-negative"))]
    pub lead_time_days: i32,
    pub expiry_date: Option<DateTime<Utc>>,
    pub season_start_date: Option<DateTime<Utc>>,
    pub season_end_date: Option<DateTime<Utc>>,
}

/// Represents the data for updating an existing product
///
/// Used for PUT /api/products/{id} requests. All fields are optional to
/// support partial updates; date consistency is checked against the merged
/// record in the handler.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProduct {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,
    pub product_type: Option<ProductKind>,
    #[validate(range(min = 0, message = "Available count must be non-negative"))]
    pub available: Option<i32>,
    #[validate(range(min = 0, message = "Lead time must be non-negative"))]
    pub lead_time_days: Option<i32>,
    /// Double-optional: omitted = keep current, null = clear
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_end_date: Option<Option<DateTime<Utc>>>,
}
