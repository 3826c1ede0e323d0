mod db;
mod error;
mod fulfillment;
mod models;
mod validation;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use error::ApiError;
use fulfillment::{
    FulfillmentService, LoggingNotificationService, PgFulfillmentRepository,
};
use models::{CreateProduct, Product, ProductKind, UpdateProduct};
use validator::Validate;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        create_product,
        get_all_products,
        get_product_by_id,
        update_product,
        delete_product,
        fulfillment::handlers::create_order_handler,
        fulfillment::handlers::get_order_handler,
        fulfillment::handlers::process_order_handler,
    ),
    components(
        schemas(
            Product,
            ProductKind,
            CreateProduct,
            UpdateProduct,
            fulfillment::CreateOrderRequest,
            fulfillment::OrderResponse,
            fulfillment::ProcessedOrder,
        )
    ),
    tags(
        (name = "products", description = "Product catalog management endpoints"),
        (name = "orders", description = "Order creation and fulfillment endpoints")
    ),
    info(
        title = "Fulfillment API",
        version = "1.0.0",
        description = "RESTful API for processing customer orders against a product catalog"
    )
)]
struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub fulfillment: FulfillmentService,
}

/// Handler for POST /api/products
/// Creates a new catalog product
#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProduct,
    responses(
        (status = 201, description = "Product created successfully", body = Product),
        (status = 400, description = "Invalid input data", body = String, example = json!({"error": "Request validation failed"})),
        (status = 409, description = "Duplicate product name", body = String, example = json!({"error": "Product with name 'Fresh Milk' already exists"})),
        (status = 500, description = "Internal server error", body = String, example = json!({"error": "Database error"}))
    ),
    tag = "products"
)]
async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    tracing::debug!("Creating new product: {}", payload.name);

    // Validate the request, including type/date-field consistency
    payload.validate()?;

    // Check for duplicate product name
    if db::check_duplicate_product(&state.db, &payload.name).await? {
        tracing::warn!("Attempt to create duplicate product: {}", payload.name);
        return Err(ApiError::Conflict {
            message: format!("Product with name '{}' already exists", payload.name),
        });
    }

    let product = sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (name, product_type, available, lead_time_days,
                              expiry_date, season_start_date, season_end_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, name, product_type, available, lead_time_days,
                  expiry_date, season_start_date, season_end_date,
                  created_at, updated_at
        "#,
    )
    .bind(&payload.name)
    .bind(payload.product_type)
    .bind(payload.available)
    .bind(payload.lead_time_days)
    .bind(payload.expiry_date)
    .bind(payload.season_start_date)
    .bind(payload.season_end_date)
    .fetch_one(&state.db)
    .await?;

    tracing::info!("Successfully created product with id: {}", product.id);
    Ok((StatusCode::CREATED, Json(product)))
}

/// Handler for GET /api/products
/// Retrieves all catalog products
#[utoipa::path(
    get,
    path = "/api/products",
    responses(
        (status = 200, description = "List of all products", body = Vec<Product>),
        (status = 500, description = "Internal server error", body = String, example = json!({"error": "Database error"}))
    ),
    tag = "products"
)]
async fn get_all_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    tracing::debug!("Fetching all products");

    let products = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, product_type, available, lead_time_days,
               expiry_date, season_start_date, season_end_date,
               created_at, updated_at
        FROM products
        ORDER BY id
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    tracing::debug!("Retrieved {} products", products.len());
    Ok(Json(products))
}

/// Handler for GET /api/products/:id
/// Retrieves a specific catalog product by ID
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 404, description = "Product not found", body = String, example = json!({"error": "Product with id 1 not found"})),
        (status = 500, description = "Internal server error", body = String, example = json!({"error": "Database error"}))
    ),
    tag = "products"
)]
async fn get_product_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Product>, ApiError> {
    tracing::debug!("Fetching product with id: {}", id);

    let product = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, product_type, available, lead_time_days,
               expiry_date, season_start_date, season_end_date,
               created_at, updated_at
        FROM products
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| {
        tracing::debug!("Product with id {} not found", id);
        ApiError::NotFound {
            resource: "Product".to_string(),
            id: id.to_string(),
        }
    })?;

    tracing::debug!("Successfully retrieved product: {}", product.name);
    Ok(Json(product))
}

/// Handler for PUT /api/products/:id
/// Updates an existing catalog product
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    request_body = UpdateProduct,
    responses(
        (status = 200, description = "Product updated successfully", body = Product),
        (status = 400, description = "Invalid input data", body = String, example = json!({"error": "Request validation failed"})),
        (status = 404, description = "Product not found", body = String, example = json!({"error": "Product with id 1 not found"})),
        (status = 500, description = "Internal server error", body = String, example = json!({"error": "Database error"}))
    ),
    tag = "products"
)]
async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProduct>,
) -> Result<Json<Product>, ApiError> {
    tracing::debug!("Updating product with id: {}", id);

    payload.validate()?;

    // Use a transaction so the read-merge-write sequence is atomic
    let mut tx = state.db.begin().await?;

    let existing = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, product_type, available, lead_time_days,
               expiry_date, season_start_date, season_end_date,
               created_at, updated_at
        FROM products
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| {
        tracing::debug!("Product with id {} not found for update", id);
        ApiError::NotFound {
            resource: "Product".to_string(),
            id: id.to_string(),
        }
    })?;

    // If name is being updated and differs, check for duplicates
    if let Some(ref new_name) = payload.name {
        if new_name != &existing.name {
            let duplicate_exists: Option<bool> = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM products WHERE name = $1 AND id != $2)",
            )
            .bind(new_name)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            if duplicate_exists.unwrap_or(false) {
                tracing::warn!("Attempt to update product {} to duplicate name: {}", id, new_name);
                return Err(ApiError::Conflict {
                    message: format!("Product with name '{}' already exists", new_name),
                });
            }
        }
    }

    // Merge provided fields over the existing record, then re-check the
    // type/date-field consistency of the result
    let name = payload.name.unwrap_or(existing.name);
    let product_type = payload.product_type.unwrap_or(existing.product_type);
    let available = payload.available.unwrap_or(existing.available);
    let lead_time_days = payload.lead_time_days.unwrap_or(existing.lead_time_days);
    let expiry_date = payload.expiry_date.unwrap_or(existing.expiry_date);
    let season_start_date = payload.season_start_date.unwrap_or(existing.season_start_date);
    let season_end_date = payload.season_end_date.unwrap_or(existing.season_end_date);

    validation::validate_kind_dates(product_type, expiry_date, season_start_date, season_end_date)
        .map_err(|e| {
            let mut errors = validator::ValidationErrors::new();
            errors.add("product_type", e);
            ApiError::ValidationError(errors)
        })?;

    let updated_product = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
        SET name = $1,
            product_type = $2,
            available = $3,
            lead_time_days = $4,
            expiry_date = $5,
            season_start_date = $6,
            season_end_date = $7,
            updated_at = NOW()
        WHERE id = $8
        RETURNING id, name, product_type, available, lead_time_days,
                  expiry_date, season_start_date, season_end_date,
                  created_at, updated_at
        "#,
    )
    .bind(&name)
    .bind(product_type)
    .bind(available)
    .bind(lead_time_days)
    .bind(expiry_date)
    .bind(season_start_date)
    .bind(season_end_date)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!("Successfully updated product with id: {}", id);
    Ok(Json(updated_product))
}

/// Handler for DELETE /api/products/:id
/// Deletes a catalog product
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    responses(
        (status = 204, description = "Product deleted successfully"),
        (status = 404, description = "Product not found", body = String, example = json!({"error": "Product with id 1 not found"})),
        (status = 500, description = "Internal server error", body = String, example = json!({"error": "Database error"}))
    ),
    tag = "products"
)]
async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    tracing::debug!("Deleting product with id: {}", id);

    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        tracing::debug!("Product with id {} not found for deletion", id);
        return Err(ApiError::NotFound {
            resource: "Product".to_string(),
            id: id.to_string(),
        });
    }

    tracing::info!("Successfully deleted product with id: {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS middleware
fn create_router(state: AppState) -> Router {
    use tower_http::cors::{Any, CorsLayer};

    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Catalog routes
        .route("/api/products", post(create_product))
        .route("/api/products", get(get_all_products))
        .route("/api/products/:id", get(get_product_by_id))
        .route("/api/products/:id", put(update_product))
        .route("/api/products/:id", delete(delete_product))
        // Order routes
        .route("/api/orders", post(fulfillment::handlers::create_order_handler))
        .route("/api/orders/:order_id", get(fulfillment::handlers::get_order_handler))
        .route(
            "/api/orders/:order_id/process",
            post(fulfillment::handlers::process_order_handler),
        )
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Fulfillment API - Starting...");

    // Get configuration from environment variables
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&database_url)
        .await
        .expect("Failed to create database pool");

    // Run SQLx migrations on startup
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    // Wire the fulfillment service to its collaborators
    let repository = Arc::new(PgFulfillmentRepository::new(db_pool.clone()));
    let notifications = Arc::new(LoggingNotificationService::new());
    let fulfillment_service = FulfillmentService::new(repository, notifications);

    let state = AppState {
        db: db_pool,
        fulfillment: fulfillment_service,
    };

    // Create the application router
    let app = create_router(state);

    // Start the Axum server
    let addr = format!("{}:{}", host, port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Fulfillment API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}

#[cfg(test)]
mod tests;
