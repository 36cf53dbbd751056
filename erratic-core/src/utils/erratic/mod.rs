//! Erratic motion scheduling.
//!
//! - `time`: wrapping microsecond timestamps
//! - `scheduler`: the per-motor timed state machine
//! - `array`: the fixed collection of schedulers and its board wiring

pub mod array;
pub mod scheduler;
pub mod time;
