//! Module Exports
//!
//! This file exports the hardware-facing pieces of the motor array.
//!
//! - `driver`: the motor driver trait the scheduling core consumes.
//! - `shield`: Adafruit Motor Shield V2 implementation of that trait.

pub mod driver;
pub mod shield;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Ticker};
use rand::RngCore;
use serde::{Deserialize, Serialize};

pub use driver::{Direction, MotorDriver, MotorHandle};
pub use shield::{DeviceError, MotorShields};

use crate::utils::{
    config::ArrayConfig,
    erratic::{
        array::{MotorArray, SetupError},
        time::Timestamp,
    },
};

/// Channel used to receive array commands from other tasks or threads.
pub static ARRAY_CHANNEL: embassy_sync::channel::Channel<CriticalSectionRawMutex, ArrayCommand, 16> =
    embassy_sync::channel::Channel::new();

/// Host-issued array commands.
///
/// Serialized as JSON with tag `"ac"`; `m` is a slot index.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "ac", rename_all = "snake_case")] // ac = array command
pub enum ArrayCommand {
    /// Emergency stop: brake every motor.
    HaltAll,
    /// Brake one motor until its expiration passes.
    Halt { m: usize },
    /// Draw fresh behavior for one motor now.
    Rearm { m: usize },
}

/// Owns the driver, the random source and the motor array.
pub struct ArrayController<D, R, const N: usize> {
    driver: D,
    rng: R,
    array: MotorArray<N>,
}

impl<D, R, const N: usize> ArrayController<D, R, N>
where
    D: MotorDriver,
    R: RngCore,
{
    pub fn new(
        driver: D,
        rng: R,
    ) -> Self {
        Self {
            driver,
            rng,
            array: MotorArray::new(),
        }
    }

    /// Bring up every board and arm every motor. Must succeed before `run`.
    pub fn init(
        &mut self,
        config: &ArrayConfig,
        now: Timestamp,
    ) -> Result<(), SetupError<D::Error>> {
        self.array
            .init_all(config, &mut self.driver, &mut self.rng, now)
    }

    /// One host tick: poll every motor.
    pub fn tick(
        &mut self,
        now: Timestamp,
    ) -> usize {
        self.array.poll_all(&mut self.driver, &mut self.rng, now)
    }

    pub fn halt_all(&mut self) -> Result<(), D::Error> {
        tracing::warn!("halting all motors");
        self.array.halt_all(&mut self.driver)
    }

    /// Execute an `ArrayCommand`. Out-of-range slots are logged and ignored.
    pub fn execute_command(
        &mut self,
        command: ArrayCommand,
        now: Timestamp,
    ) -> Result<(), D::Error> {
        match command {
            ArrayCommand::HaltAll => self.halt_all(),
            ArrayCommand::Halt { m } => match self.array.get_mut(m) {
                Some(motor) => motor.halt(&mut self.driver),
                None => {
                    tracing::warn!("halt for unknown motor slot {}", m);
                    Ok(())
                }
            },
            ArrayCommand::Rearm { m } => match self.array.get_mut(m) {
                Some(motor) => motor
                    .arm(&mut self.driver, &mut self.rng, now)
                    .map(|_| ()),
                None => {
                    tracing::warn!("rearm for unknown motor slot {}", m);
                    Ok(())
                }
            },
        }
    }

    /// Drain pending commands, poll every motor, then wait out the period.
    pub async fn run(
        &mut self,
        period: Duration,
    ) -> ! {
        let mut ticker = Ticker::every(period);
        loop {
            while let Ok(command) = ARRAY_CHANNEL.try_receive() {
                tracing::info!("Received array command: {:?}", command);
                if let Err(e) = self.execute_command(command, Timestamp::now()) {
                    tracing::error!("array command failed: {:?}", e);
                }
            }
            self.tick(Timestamp::now());
            ticker.next().await;
        }
    }

    pub fn array(&self) -> &MotorArray<N> {
        &self.array
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}
