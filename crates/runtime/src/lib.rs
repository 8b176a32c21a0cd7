pub mod event_bus;
pub mod metrics;
pub mod pending;
pub mod timer;

pub use event_bus::*;
pub use metrics::*;
pub use pending::*;
pub use timer::*;
