//! PayMesh API - REST surface for the settlement engine
//!
//! Thin HTTP layer over the core crates: every handler validates input,
//! calls exactly one core operation, and maps the result through the shared
//! error taxonomy. No business logic lives here.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod signature;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::{ApiConfig, AppState};
