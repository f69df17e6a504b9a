//! Outbound HTTP plumbing: a shared session, a retry/deadline policy applied
//! around every request, and status-based response classification.

pub mod response;
pub mod retry;
pub mod session;

pub use response::{CORRECT_RESPONSE_STATUSES, ProviderResponse, UPSTREAM_BODY_PREVIEW_CHARS};
pub use retry::{LinearBackoff, LinearBuilder, RetryError, RetryOutcome, RetryPolicy};
pub use session::{HttpSession, RequestOptions, SHUTDOWN_GRACE, SessionSettings};
