pub mod config;
pub mod error;
pub mod http;
pub mod providers;
pub mod server;
pub(crate) mod utils;

pub use error::{HttpError, SquaregateError};
pub use http::{HttpSession, ProviderResponse, RetryPolicy};
pub use providers::{AuthorizeParams, SquareClient};

/// User agent sent on every outbound call.
pub const SQUAREGATE_USER_AGENT: &str = concat!("squaregate/", env!("CARGO_PKG_VERSION"));
