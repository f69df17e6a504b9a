pub mod router;
pub mod routes;

pub use router::{SquaregateState, squaregate_router};
