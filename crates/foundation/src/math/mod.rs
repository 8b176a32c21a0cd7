pub mod angle;
pub mod precision;

pub use angle::*;
pub use precision::*;
