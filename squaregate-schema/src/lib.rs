pub mod square;

pub use square::{AuthUrlResponse, DEFAULT_GRANT_TYPE, ObtainTokenPayload, ObtainTokenRequest};
