pub mod entity;
pub mod history;
pub mod picking;
pub mod procgen;
pub mod store;

pub use entity::*;
pub use history::*;
pub use picking::*;
pub use procgen::*;
pub use store::*;
