//! Utility re-exports and helper macros for the erratic motor array.
//!
//! This module re-exports the scheduling core, the hardware controllers and
//! the configuration types:
//!
//! - `config`: board enumeration and PWM settings
//! - `controllers`: motor driver trait, shield driver and the array controller
//! - `erratic`: per-motor timed state machine and the array manager
//!
//! The `mk_static!` macro simplifies static initialization in no-std contexts.

pub mod config;
pub mod controllers;
pub mod erratic;

pub use config::ArrayConfig;
pub use controllers::ArrayController;
pub use erratic::{array::MotorArray, scheduler::MotorScheduler, time::Timestamp};

#[macro_export]
/// Initialize a no-std static cell and write the given value into it.
///
/// This macro creates a `static_cell::StaticCell` for type `$t` and initializes
/// it with `$val`, returning a mutable reference to the stored value.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        STATIC_CELL.uninit().write($val)
    }};
}
