pub mod detail;
pub mod input;
pub mod machine;
pub mod state;

pub use detail::*;
pub use input::*;
pub use machine::*;
pub use state::*;
