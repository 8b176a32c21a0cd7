pub mod analysis;
pub mod config;
pub mod data;
pub mod engine;
pub mod events;

pub use analysis::*;
pub use config::*;
pub use data::*;
pub use engine::*;
pub use events::*;
