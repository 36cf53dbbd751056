//! The fixed collection of motor schedulers.
//!
//! `MotorArray` binds slot `i` to position `(i % 4) + 1` on `boards[i / 4]`
//! and forwards each host tick to every slot. Setup is all-or-nothing: every
//! handle is resolved before any motor is bound or armed.

use rand::RngCore;

use crate::utils::{
    config::ArrayConfig,
    controllers::driver::{MotorDriver, MotorHandle},
    erratic::{scheduler::MotorScheduler, time::Timestamp},
};

/// Fatal array setup failures.
#[derive(Debug, PartialEq, Eq)]
pub enum SetupError<E> {
    /// The board list does not cover exactly the array's slots.
    SlotCount { slots: usize, configured: usize },
    AlreadyInitialized,
    /// A declared board or position could not be addressed.
    Unreachable {
        slot: usize,
        board: u8,
        position: u8,
        source: E,
    },
}

/// `N` motor schedulers driven in slot order.
pub struct MotorArray<const N: usize> {
    motors: [MotorScheduler; N],
}

impl<const N: usize> Default for MotorArray<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> MotorArray<N> {
    pub fn new() -> Self {
        Self {
            motors: core::array::from_fn(|_| MotorScheduler::new()),
        }
    }

    /// Resolve every slot's handle from `config`, then bind and arm each slot.
    ///
    /// Nothing is bound if any handle fails to resolve.
    pub fn init_all<D, R>(
        &mut self,
        config: &ArrayConfig,
        driver: &mut D,
        rng: &mut R,
        now: Timestamp,
    ) -> Result<(), SetupError<D::Error>>
    where
        D: MotorDriver,
        R: RngCore + ?Sized,
    {
        if self.motors.iter().any(MotorScheduler::is_bound) {
            return Err(SetupError::AlreadyInitialized);
        }
        if config.motor_count() != N {
            tracing::error!(
                "board list addresses {} motors, array has {} slots",
                config.motor_count(),
                N
            );
            return Err(SetupError::SlotCount {
                slots: N,
                configured: config.motor_count(),
            });
        }

        let mut handles: [Option<MotorHandle>; N] = [None; N];
        for (slot, handle) in handles.iter_mut().enumerate() {
            let Some((board, position)) = config.address_of(slot) else {
                continue;
            };
            match driver.motor_handle(board, position) {
                Ok(h) => *handle = Some(h),
                Err(source) => {
                    tracing::error!(
                        slot,
                        "motor 0x{:02X}/M{} unreachable, refusing to start: {:?}",
                        board,
                        position,
                        source
                    );
                    return Err(SetupError::Unreachable {
                        slot,
                        board,
                        position,
                        source,
                    });
                }
            }
        }

        for (motor, handle) in self.motors.iter_mut().zip(handles) {
            if let Some(handle) = handle {
                motor.init(handle, driver, rng, now);
            }
        }
        tracing::info!("{} motors on {} boards armed", N, config.boards.len());
        Ok(())
    }

    /// Poll every slot once, in slot order. Returns how many re-armed.
    pub fn poll_all<D, R>(
        &mut self,
        driver: &mut D,
        rng: &mut R,
        now: Timestamp,
    ) -> usize
    where
        D: MotorDriver,
        R: RngCore + ?Sized,
    {
        self.motors
            .iter_mut()
            .filter_map(|m| m.poll(driver, rng, now).then_some(()))
            .count()
    }

    /// Halt every slot, continuing past failures. Returns the first error.
    pub fn halt_all<D: MotorDriver>(
        &mut self,
        driver: &mut D,
    ) -> Result<(), D::Error> {
        let mut first_err = None;
        for (slot, motor) in self.motors.iter_mut().enumerate() {
            if let Err(e) = motor.halt(driver) {
                tracing::error!(slot, "halt failed: {:?}", e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn get(
        &self,
        slot: usize,
    ) -> Option<&MotorScheduler> {
        self.motors.get(slot)
    }

    pub fn get_mut(
        &mut self,
        slot: usize,
    ) -> Option<&mut MotorScheduler> {
        self.motors.get_mut(slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MotorScheduler> {
        self.motors.iter()
    }

    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }
}
