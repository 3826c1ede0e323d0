use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use sqlx::PgPool;

use crate::fulfillment::error::FulfillmentError;
use crate::fulfillment::models::Order;
use crate::models::Product;

/// Outbound port for order and stock persistence
///
/// Line items are returned in association insertion order. The stock
/// write targets a single product row by primary key; serializing it
/// against concurrent writers is this layer's responsibility.
#[async_trait]
pub trait FulfillmentRepository: Send + Sync {
    /// Create an order referencing the given products, in the given order
    async fn create_order(&self, product_ids: &[i32]) -> Result<Order, FulfillmentError>;

    /// Load an order together with its linked products
    async fn find_order_with_products(
        &self,
        order_id: i32,
    ) -> Result<Option<(Order, Vec<Product>)>, FulfillmentError>;

    /// Persist a product's new availability count
    async fn update_availability(
        &self,
        product_id: i32,
        available: i32,
    ) -> Result<(), FulfillmentError>;
}

/// PostgreSQL-backed fulfillment repository
#[derive(Clone)]
pub struct PgFulfillmentRepository {
    pool: PgPool,
}

impl PgFulfillmentRepository {
    /// Create a new PgFulfillmentRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FulfillmentRepository for PgFulfillmentRepository {
    /// Create a new order with its line items in a transaction
    ///
    /// Every referenced product must exist; the first missing one aborts
    /// the transaction.
    async fn create_order(&self, product_ids: &[i32]) -> Result<Order, FulfillmentError> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders DEFAULT VALUES
            RETURNING id, created_at
            "#,
        )
        .fetch_one(&mut *tx)
        .await?;

        for product_id in product_ids {
            let exists: Option<bool> =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                    .bind(product_id)
                    .fetch_one(&mut *tx)
                    .await?;

            if !exists.unwrap_or(false) {
                // Transaction rolls back when tx is dropped
                return Err(FulfillmentError::ProductNotFound(*product_id));
            }

            sqlx::query(
                r#"
                INSERT INTO order_products (order_id, product_id)
                VALUES ($1, $2)
                "#,
            )
            .bind(order.id)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(order)
    }

    async fn find_order_with_products(
        &self,
        order_id: i32,
    ) -> Result<Option<(Order, Vec<Product>)>, FulfillmentError> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        let order = match order {
            Some(order) => order,
            None => return Ok(None),
        };

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT p.id, p.name, p.product_type, p.available, p.lead_time_days,
                   p.expiry_date, p.season_start_date, p.season_end_date,
                   p.created_at, p.updated_at
            FROM products p
            JOIN order_products op ON op.product_id = p.id
            WHERE op.order_id = $1
            ORDER BY op.id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some((order, products)))
    }

    async fn update_availability(
        &self,
        product_id: i32,
        available: i32,
    ) -> Result<(), FulfillmentError> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET available = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(available)
        .bind(product_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(FulfillmentError::ProductNotFound(product_id));
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryState {
    products: HashMap<i32, Product>,
    orders: HashMap<i32, Vec<i32>>,
    order_created_at: HashMap<i32, chrono::DateTime<chrono::Utc>>,
    next_order_id: i32,
    fail_updates_for: Vec<i32>,
}

/// In-memory fulfillment repository for testing
///
/// Orders keep their product ids in insertion order; individual stock
/// writes can be made to fail to exercise best-effort processing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFulfillmentRepository {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryFulfillmentRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a product into the catalog.
    pub fn insert_product(&self, product: Product) {
        self.state.write().unwrap().products.insert(product.id, product);
    }

    /// Returns a snapshot of a product, if present.
    pub fn product(&self, product_id: i32) -> Option<Product> {
        self.state.read().unwrap().products.get(&product_id).cloned()
    }

    /// Configures stock writes for the given product to fail.
    pub fn set_fail_update(&self, product_id: i32) {
        self.state.write().unwrap().fail_updates_for.push(product_id);
    }
}

#[async_trait]
impl FulfillmentRepository for InMemoryFulfillmentRepository {
    async fn create_order(&self, product_ids: &[i32]) -> Result<Order, FulfillmentError> {
        let mut state = self.state.write().unwrap();

        for product_id in product_ids {
            if !state.products.contains_key(product_id) {
                return Err(FulfillmentError::ProductNotFound(*product_id));
            }
        }

        state.next_order_id += 1;
        let id = state.next_order_id;
        let created_at = chrono::Utc::now();
        state.orders.insert(id, product_ids.to_vec());
        state.order_created_at.insert(id, created_at);

        Ok(Order { id, created_at })
    }

    async fn find_order_with_products(
        &self,
        order_id: i32,
    ) -> Result<Option<(Order, Vec<Product>)>, FulfillmentError> {
        let state = self.state.read().unwrap();

        let product_ids = match state.orders.get(&order_id) {
            Some(ids) => ids,
            None => return Ok(None),
        };

        let products = product_ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect();
        let order = Order {
            id: order_id,
            created_at: state.order_created_at[&order_id],
        };

        Ok(Some((order, products)))
    }

    async fn update_availability(
        &self,
        product_id: i32,
        available: i32,
    ) -> Result<(), FulfillmentError> {
        let mut state = self.state.write().unwrap();

        if state.fail_updates_for.contains(&product_id) {
            return Err(FulfillmentError::DatabaseError(
                "simulated write failure".to_string(),
            ));
        }

        match state.products.get_mut(&product_id) {
            Some(product) => {
                product.available = available;
                product.updated_at = chrono::Utc::now();
                Ok(())
            }
            None => Err(FulfillmentError::ProductNotFound(product_id)),
        }
    }
}
