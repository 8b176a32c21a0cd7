pub mod marker;
pub mod surface;
pub mod symbology;
pub mod sync;
pub mod tooltip;

pub use marker::*;
pub use surface::*;
pub use sync::*;
