pub mod error;
pub mod linalg;
pub mod types;

#[cfg(feature = "allocator")]
pub mod allocator;

pub use error::MarkowitzError;
pub use types::*;

/// Standard result type for all markowitz operations
pub type MarkowitzResult<T> = Result<T, MarkowitzError>;
