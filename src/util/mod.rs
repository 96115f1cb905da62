//! Small runtime helpers shared across layers.

pub mod clock;
pub(crate) mod sync;
