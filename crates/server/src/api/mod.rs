pub mod acquisitions;
pub mod downloads;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod search;
pub mod torrents;
pub mod ws;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
