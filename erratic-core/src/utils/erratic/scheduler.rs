//! Per-motor erratic behavior.
//!
//! A `MotorScheduler` owns one motor handle and a single expiration instant.
//! Each time the expiration passes, the next `poll` draws a fresh random
//! duration, direction and speed ("arming"). Arming latches the direction
//! and speed into the driver and then releases the bridge, so the motor is
//! left coasting with its next drive settings loaded.
//!
//! # Example
//! ```rust
//! use erratic_core::utils::controllers::driver::{Direction, MotorDriver, MotorHandle};
//! use erratic_core::utils::{MotorScheduler, Timestamp};
//! use rand::{rngs::SmallRng, SeedableRng};
//!
//! struct Null;
//! impl MotorDriver for Null {
//!     type Error = ();
//!     fn motor_handle(&mut self, board: u8, position: u8) -> Result<MotorHandle, ()> {
//!         Ok(MotorHandle::new(board, position))
//!     }
//!     fn set_direction(&mut self, _: MotorHandle, _: Direction) -> Result<(), ()> { Ok(()) }
//!     fn set_speed(&mut self, _: MotorHandle, _: u8) -> Result<(), ()> { Ok(()) }
//! }
//!
//! let mut rng = SmallRng::seed_from_u64(1);
//! let mut motor = MotorScheduler::new();
//! motor.init(MotorHandle::new(0x60, 1), &mut Null, &mut rng, Timestamp::from_micros(0));
//! assert!(motor.is_armed());
//! ```

use rand::{Rng, RngCore};

use crate::utils::{
    controllers::driver::{Direction, MotorDriver, MotorHandle},
    erratic::time::Timestamp,
};

/// Active duration bounds in whole seconds, upper bound exclusive.
pub const MIN_DURATION_SECS: u32 = 10;
pub const MAX_DURATION_SECS: u32 = 20;

/// Speed bounds, both inclusive. A fresh arm never draws zero.
pub const MIN_SPEED: u8 = 1;
pub const MAX_SPEED: u8 = 255;

/// One random draw committed by an arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmDraw {
    pub duration_secs: u32,
    pub direction: Direction,
    pub speed: u8,
}

impl ArmDraw {
    /// Draw duration, then direction, then speed.
    pub fn draw<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let duration_secs = rng.random_range(MIN_DURATION_SECS..MAX_DURATION_SECS);
        let raw = rng.random_range(Direction::Forward as u8..=Direction::Backward as u8);
        let direction = Direction::from_raw(raw).unwrap_or(Direction::Forward);
        let speed = rng.random_range(MIN_SPEED..=MAX_SPEED);
        Self {
            duration_secs,
            direction,
            speed,
        }
    }
}

/// Erratic-behavior state of one physical motor.
///
/// Polls must come at least every ~35.8 minutes (half the 32-bit microsecond
/// wrap). A poll arriving 2^31 µs or more past the expiration reads as
/// "before" it, and the motor stays frozen until the clock comes around.
#[derive(Debug, Clone, Default)]
pub struct MotorScheduler {
    handle: Option<MotorHandle>,
    expiration: Timestamp,
    draw: Option<ArmDraw>,
    halted: bool,
}

impl MotorScheduler {
    /// An unbound scheduler; `poll` and `halt` do nothing until `init`.
    pub const fn new() -> Self {
        Self {
            handle: None,
            expiration: Timestamp::from_micros(0),
            draw: None,
            halted: false,
        }
    }

    /// Bind `handle` and arm immediately.
    ///
    /// If the first arm fails on the bus, the expiration stays at `now` so the
    /// very next `poll` tries again.
    pub fn init<D, R>(
        &mut self,
        handle: MotorHandle,
        driver: &mut D,
        rng: &mut R,
        now: Timestamp,
    ) where
        D: MotorDriver,
        R: RngCore + ?Sized,
    {
        self.handle = Some(handle);
        self.expiration = now;
        self.draw = None;
        self.halted = false;
        self.try_arm(driver, rng, now);
    }

    /// Re-arm if `now` has reached the expiration. Returns true on a re-arm.
    pub fn poll<D, R>(
        &mut self,
        driver: &mut D,
        rng: &mut R,
        now: Timestamp,
    ) -> bool
    where
        D: MotorDriver,
        R: RngCore + ?Sized,
    {
        if self.handle.is_none() || !now.has_reached(self.expiration) {
            return false;
        }
        self.try_arm(driver, rng, now)
    }

    /// Draw new behavior and commit it: direction, speed, then release.
    ///
    /// The expiration and draw are only updated once every driver command
    /// succeeded. Returns `Ok(None)` on an unbound scheduler.
    pub fn arm<D, R>(
        &mut self,
        driver: &mut D,
        rng: &mut R,
        now: Timestamp,
    ) -> Result<Option<ArmDraw>, D::Error>
    where
        D: MotorDriver,
        R: RngCore + ?Sized,
    {
        let Some(handle) = self.handle else {
            return Ok(None);
        };
        let draw = ArmDraw::draw(rng);
        let expiration = now.wrapping_add_secs(draw.duration_secs);

        let committed = driver
            .set_direction(handle, draw.direction)
            .and_then(|()| driver.set_speed(handle, draw.speed))
            // direction and speed stay latched; the bridge coasts until driven
            .and_then(|()| driver.set_direction(handle, Direction::Release));
        if let Err(e) = committed {
            self.restore(driver, handle);
            return Err(e);
        }

        self.expiration = expiration;
        self.draw = Some(draw);
        self.halted = false;
        tracing::debug!(
            board = handle.board(),
            position = handle.position(),
            ?draw,
            expiration = expiration.as_micros(),
            "motor armed"
        );
        Ok(Some(draw))
    }

    /// Best-effort return to the bridge state held before a failed arm:
    /// braked at zero speed if halted, coasting otherwise.
    fn restore<D: MotorDriver>(
        &self,
        driver: &mut D,
        handle: MotorHandle,
    ) {
        let direction = if self.halted {
            if let Err(e) = driver.set_speed(handle, 0) {
                tracing::warn!(?handle, "restore speed failed: {:?}", e);
            }
            Direction::Brake
        } else {
            Direction::Release
        };
        match driver.set_direction(handle, direction) {
            Ok(()) => tracing::debug!(?handle, ?direction, "bridge restored after failed arm"),
            Err(e) => tracing::warn!(?handle, "restore direction failed: {:?}", e),
        }
    }

    fn try_arm<D, R>(
        &mut self,
        driver: &mut D,
        rng: &mut R,
        now: Timestamp,
    ) -> bool
    where
        D: MotorDriver,
        R: RngCore + ?Sized,
    {
        match self.arm(driver, rng, now) {
            Ok(armed) => armed.is_some(),
            Err(e) => {
                tracing::warn!(handle = ?self.handle, "arm dropped, retrying on next poll: {:?}", e);
                false
            }
        }
    }

    /// Zero the speed and brake. The expiration is left alone, so the next
    /// poll past it resumes erratic motion.
    pub fn halt<D: MotorDriver>(
        &mut self,
        driver: &mut D,
    ) -> Result<(), D::Error> {
        let Some(handle) = self.handle else {
            return Ok(());
        };
        driver.set_speed(handle, 0)?;
        driver.set_direction(handle, Direction::Brake)?;
        self.halted = true;
        Ok(())
    }

    pub fn handle(&self) -> Option<MotorHandle> {
        self.handle
    }

    pub fn expiration(&self) -> Timestamp {
        self.expiration
    }

    /// The most recent committed draw.
    pub fn last_draw(&self) -> Option<ArmDraw> {
        self.draw
    }

    pub fn is_bound(&self) -> bool {
        self.handle.is_some()
    }

    /// Bound and holding a committed draw.
    pub fn is_armed(&self) -> bool {
        self.handle.is_some() && self.draw.is_some()
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }
}
