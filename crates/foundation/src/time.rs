/// Time primitives.
///
/// The engine never reads a wall clock. The host advances a monotonic
/// millisecond clock, which keeps timed sequences replayable in tests.
use serde::{Deserialize, Serialize};

#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Millis(pub u64);

impl Millis {
    pub const ZERO: Millis = Millis(0);

    pub fn saturating_add(self, delay: Delay) -> Self {
        Millis(self.0.saturating_add(delay.0))
    }

    pub fn since(self, earlier: Millis) -> Delay {
        Delay(self.0.saturating_sub(earlier.0))
    }
}

/// A relative delay in milliseconds.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Delay(pub u64);

impl Delay {
    pub const fn ms(ms: u64) -> Self {
        Delay(ms)
    }
}
