//! Wrapping microsecond timestamps.
//!
//! The controller's monotonic clock is a free-running 32-bit microsecond
//! counter that wraps roughly every 71.6 minutes. Comparisons are only
//! meaningful between instants less than half a wrap (~35.8 minutes) apart,
//! which comfortably covers the 10-20 s scheduling window.

use embassy_time::Instant;

pub const MICROS_PER_SEC: u32 = 1_000_000;

/// An instant in the controller's wrapping microsecond time domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamp(u32);

impl Timestamp {
    pub const fn from_micros(micros: u32) -> Self {
        Self(micros)
    }

    pub const fn as_micros(self) -> u32 {
        self.0
    }

    /// Read the embassy monotonic clock.
    #[inline]
    pub fn now() -> Self {
        Instant::now().into()
    }

    /// `self + secs`, wrapping at `u32::MAX`.
    pub const fn wrapping_add_secs(
        self,
        secs: u32,
    ) -> Self {
        Self(self.0.wrapping_add(secs.wrapping_mul(MICROS_PER_SEC)))
    }

    /// Signed distance from `earlier` to `self`, in microseconds.
    pub const fn micros_since(
        self,
        earlier: Timestamp,
    ) -> i32 {
        self.0.wrapping_sub(earlier.0) as i32
    }

    /// True once `self` is at or past `deadline`.
    pub const fn has_reached(
        self,
        deadline: Timestamp,
    ) -> bool {
        self.micros_since(deadline) >= 0
    }
}

impl From<Instant> for Timestamp {
    fn from(instant: Instant) -> Self {
        // truncation is the wrap
        Self(instant.as_micros() as u32)
    }
}
