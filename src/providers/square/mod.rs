mod authorize;
mod client;

pub use authorize::{AuthorizeParams, DEFAULT_LOCALE, DEFAULT_SCOPE, build_authorize_link};
pub use client::SquareClient;
