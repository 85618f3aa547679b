//! HTTP API
//!
//! Template catalogue and report generation over REST.
//! Run with `xlfill serve` or `xlfill-server`.

pub mod handlers;
pub mod server;

pub use handlers::{ApiError, ApiResponse, ErrorBody};
pub use server::{build_router, init_tracing, run_api_server, AppState};
