pub mod error;

pub use error::{BoxError, PriorisError, Result};
