//! Adafruit Motor Shield V2 driver over a shared I2C bus.
//!
//! Each shield is a PCA9685 PWM expander feeding two TB6612 H-bridges. Per
//! motor, one PWM channel sets the magnitude and two channels act as the
//! bridge's IN1/IN2 logic pins. Boards are brought up lazily, the first time
//! a handle on them is requested.

use core::cell::RefCell;

use embedded_hal::i2c::I2c;
use embedded_hal_bus::i2c::RefCellDevice;
use heapless::Vec;
use pwm_pca9685::{Address as PwmAddress, Channel, Error as PwmError, Pca9685};

use crate::utils::{
    config::{ArrayConfig, MAX_BOARDS},
    controllers::driver::{Direction, MotorDriver, MotorHandle, MOTORS_PER_BOARD},
};

/// Duty scale from an 8-bit speed to the 12-bit PCA9685 counter.
const SPEED_SCALE: u16 = 16;

/// `(pwm, in2, in1)` channels for M1..M4.
const MOTOR_CHANNELS: [(Channel, Channel, Channel); MOTORS_PER_BOARD] = [
    (Channel::C8, Channel::C9, Channel::C10),
    (Channel::C13, Channel::C12, Channel::C11),
    (Channel::C2, Channel::C3, Channel::C4),
    (Channel::C7, Channel::C6, Channel::C5),
];

/// Errors that can occur when driving a shield.
#[derive(Debug)]
pub enum DeviceError<E: core::fmt::Debug> {
    PwmError(PwmError<E>),
    /// The address is not part of the configured enumeration.
    UnknownBoard(u8),
    /// Positions are 1..=4.
    InvalidPosition(u8),
    TooManyBoards,
}

struct Shield<'a, I2C: 'static> {
    address: u8,
    pwm: Pca9685<RefCellDevice<'a, I2C>>,
    ready: bool,
}

/// All shields of the array, addressed by bus address.
pub struct MotorShields<'a, I2C: 'static> {
    boards: Vec<Shield<'a, I2C>, MAX_BOARDS>,
    prescale: u8,
}

impl<'a, I2C, E> MotorShields<'a, I2C>
where
    I2C: I2c<Error = E> + 'static,
    E: core::fmt::Debug,
{
    /// Create drivers for every configured board. No bus traffic happens here.
    pub fn new(
        i2c_bus: &'a RefCell<I2C>,
        config: &ArrayConfig,
    ) -> Result<Self, DeviceError<E>> {
        let mut boards = Vec::new();
        for &address in &config.boards {
            let pwm = Pca9685::new(RefCellDevice::new(i2c_bus), PwmAddress::from(address))
                .map_err(DeviceError::PwmError)?;
            boards
                .push(Shield {
                    address,
                    pwm,
                    ready: false,
                })
                .map_err(|_| DeviceError::TooManyBoards)?;
        }
        Ok(Self {
            boards,
            prescale: config.prescale,
        })
    }

    /// Enable the oscillator, set the PWM prescale and drive every channel
    /// low on one board.
    pub fn begin(
        &mut self,
        board: u8,
    ) -> Result<(), DeviceError<E>> {
        let prescale = self.prescale;
        let shield = self.shield(board)?;
        if shield.ready {
            return Ok(());
        }
        shield.pwm.enable().map_err(DeviceError::PwmError)?;
        shield
            .pwm
            .set_prescale(prescale)
            .map_err(DeviceError::PwmError)?;
        // outputs may still be live from before a warm restart
        shield
            .pwm
            .set_channel_on_off(Channel::All, 0, 0)
            .map_err(DeviceError::PwmError)?;
        shield.ready = true;
        tracing::info!("motor shield 0x{:02X} ready (prescale {})", board, prescale);
        Ok(())
    }

    /// Put every board's oscillator to sleep; all outputs go idle.
    pub fn disable(&mut self) -> Result<(), DeviceError<E>> {
        for shield in self.boards.iter_mut().filter(|s| s.ready) {
            shield.pwm.disable().map_err(DeviceError::PwmError)?;
            shield.ready = false;
        }
        Ok(())
    }

    fn shield(
        &mut self,
        board: u8,
    ) -> Result<&mut Shield<'a, I2C>, DeviceError<E>> {
        self.boards
            .iter_mut()
            .find(|s| s.address == board)
            .ok_or(DeviceError::UnknownBoard(board))
    }

    fn channels(motor: MotorHandle) -> Result<(Channel, Channel, Channel), DeviceError<E>> {
        let index = usize::from(motor.position())
            .checked_sub(1)
            .ok_or(DeviceError::InvalidPosition(motor.position()))?;
        MOTOR_CHANNELS
            .get(index)
            .copied()
            .ok_or(DeviceError::InvalidPosition(motor.position()))
    }

    /// Drive a bridge logic pin fully high or low.
    fn set_pin(
        pwm: &mut Pca9685<RefCellDevice<'a, I2C>>,
        channel: Channel,
        high: bool,
    ) -> Result<(), DeviceError<E>> {
        let result = if high {
            pwm.set_channel_full_on(channel, 0)
        } else {
            pwm.set_channel_on_off(channel, 0, 0)
        };
        result.map_err(DeviceError::PwmError)
    }
}

impl<'a, I2C, E> MotorDriver for MotorShields<'a, I2C>
where
    I2C: I2c<Error = E> + 'static,
    E: core::fmt::Debug,
{
    type Error = DeviceError<E>;

    fn motor_handle(
        &mut self,
        board: u8,
        position: u8,
    ) -> Result<MotorHandle, Self::Error> {
        let handle = MotorHandle::new(board, position);
        Self::channels(handle)?;
        self.begin(board)?;
        Ok(handle)
    }

    fn set_direction(
        &mut self,
        motor: MotorHandle,
        direction: Direction,
    ) -> Result<(), Self::Error> {
        let (_, in2, in1) = Self::channels(motor)?;
        let pwm = &mut self.shield(motor.board())?.pwm;
        match direction {
            Direction::Forward => {
                Self::set_pin(pwm, in2, false)?;
                Self::set_pin(pwm, in1, true)
            }
            Direction::Backward => {
                Self::set_pin(pwm, in1, false)?;
                Self::set_pin(pwm, in2, true)
            }
            Direction::Release => {
                Self::set_pin(pwm, in1, false)?;
                Self::set_pin(pwm, in2, false)
            }
            Direction::Brake => {
                Self::set_pin(pwm, in1, true)?;
                Self::set_pin(pwm, in2, true)
            }
        }
    }

    fn set_speed(
        &mut self,
        motor: MotorHandle,
        speed: u8,
    ) -> Result<(), Self::Error> {
        let (pwm_channel, _, _) = Self::channels(motor)?;
        let pwm = &mut self.shield(motor.board())?.pwm;
        pwm.set_channel_on_off(pwm_channel, 0, u16::from(speed) * SPEED_SCALE)
            .map_err(DeviceError::PwmError)
    }
}
