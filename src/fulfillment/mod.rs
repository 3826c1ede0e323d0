pub mod availability;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notifications;
pub mod repository;
pub mod service;

pub use availability::*;
pub use error::*;
pub use handlers::*;
pub use models::*;
pub use notifications::*;
pub use repository::*;
pub use service::*;
