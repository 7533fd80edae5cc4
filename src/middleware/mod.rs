pub mod auth;
pub mod response;

pub use auth::authorization_gate;
pub use response::{ApiResponse, ApiResult};
