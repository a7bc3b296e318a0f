//! REST gateway over the practice store.

pub mod server;
pub mod types;

pub use server::{ApiError, GatewayState, build_router, start_server};
