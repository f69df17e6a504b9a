mod squaregate;
mod upstream;

pub use squaregate::{ApiErrorBody, ApiErrorObject, SquaregateError};
pub use upstream::HttpError;

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}
