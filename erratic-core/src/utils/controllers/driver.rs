//! Abstract motor-driver interface consumed by the scheduling core.

use core::fmt::Debug;

/// Motor positions on one shield (M1..M4).
pub const MOTORS_PER_BOARD: usize = 4;

/// Commanded H-bridge state, numbered like the shield's `run()` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    Forward = 1,
    Backward = 2,
    /// Both bridge inputs high: active braking.
    Brake = 3,
    /// Both bridge inputs low: the motor coasts.
    Release = 4,
}

impl Direction {
    /// Map a raw command number back to a direction.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::Forward),
            2 => Some(Self::Backward),
            3 => Some(Self::Brake),
            4 => Some(Self::Release),
            _ => None,
        }
    }
}

/// Opaque reference to one motor: a board bus address plus position 1..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorHandle {
    board: u8,
    position: u8,
}

impl MotorHandle {
    /// Only drivers should mint handles, after validating the address.
    pub fn new(
        board: u8,
        position: u8,
    ) -> Self {
        Self { board, position }
    }

    pub fn board(&self) -> u8 {
        self.board
    }

    pub fn position(&self) -> u8 {
        self.position
    }
}

/// Hardware-facing capability behind every motor.
pub trait MotorDriver {
    type Error: Debug;

    /// Resolve (and bring up, if needed) the motor at `position` on `board`.
    fn motor_handle(
        &mut self,
        board: u8,
        position: u8,
    ) -> Result<MotorHandle, Self::Error>;

    /// Command the bridge state of one motor.
    fn set_direction(
        &mut self,
        motor: MotorHandle,
        direction: Direction,
    ) -> Result<(), Self::Error>;

    /// Command the PWM magnitude (0..=255) of one motor.
    fn set_speed(
        &mut self,
        motor: MotorHandle,
        speed: u8,
    ) -> Result<(), Self::Error>;
}
