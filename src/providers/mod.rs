pub mod square;

pub use square::{AuthorizeParams, SquareClient};
