pub mod accounts;
pub mod audit;
pub mod error;
pub mod handlers;
pub mod mail;
pub mod middleware;
pub mod parcels;
pub mod quotes;
pub mod recipients;
pub mod routes;

pub use error::{ApiError, ErrorResponse};
pub use routes::create_router;
