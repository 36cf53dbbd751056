//! Recording motor driver shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use erratic_core::utils::controllers::{Direction, MotorDriver, MotorHandle};

/// Four-board wiring used by the scenario tests.
pub const BOARDS: [u8; 4] = [0x67, 0x61, 0x60, 0x66];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmd {
    Dir(Direction),
    Speed(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockError {
    Unreachable(u8),
    BadPosition(u8),
    Bus,
}

/// Accepts every command and remembers what each motor was told.
#[derive(Default)]
pub struct RecordingDriver {
    pub log: Vec<(MotorHandle, Cmd)>,
    pub handles_issued: Vec<MotorHandle>,
    pub unreachable: HashSet<u8>,
    pub failing: HashSet<(u8, u8)>,
    direction: HashMap<(u8, u8), Direction>,
    speed: HashMap<(u8, u8), u8>,
}

impl RecordingDriver {
    pub fn direction_of(
        &self,
        board: u8,
        position: u8,
    ) -> Option<Direction> {
        self.direction.get(&(board, position)).copied()
    }

    pub fn speed_of(
        &self,
        board: u8,
        position: u8,
    ) -> Option<u8> {
        self.speed.get(&(board, position)).copied()
    }

    /// Commands sent to one motor, oldest first.
    pub fn commands_for(
        &self,
        board: u8,
        position: u8,
    ) -> Vec<Cmd> {
        self.log
            .iter()
            .filter(|(h, _)| h.board() == board && h.position() == position)
            .map(|&(_, c)| c)
            .collect()
    }

    fn check(
        &self,
        motor: MotorHandle,
    ) -> Result<(), MockError> {
        if self.failing.contains(&(motor.board(), motor.position())) {
            Err(MockError::Bus)
        } else {
            Ok(())
        }
    }
}

impl MotorDriver for RecordingDriver {
    type Error = MockError;

    fn motor_handle(
        &mut self,
        board: u8,
        position: u8,
    ) -> Result<MotorHandle, Self::Error> {
        if self.unreachable.contains(&board) {
            return Err(MockError::Unreachable(board));
        }
        if !(1..=4).contains(&position) {
            return Err(MockError::BadPosition(position));
        }
        let handle = MotorHandle::new(board, position);
        self.handles_issued.push(handle);
        Ok(handle)
    }

    fn set_direction(
        &mut self,
        motor: MotorHandle,
        direction: Direction,
    ) -> Result<(), Self::Error> {
        self.check(motor)?;
        self.log.push((motor, Cmd::Dir(direction)));
        self.direction
            .insert((motor.board(), motor.position()), direction);
        Ok(())
    }

    fn set_speed(
        &mut self,
        motor: MotorHandle,
        speed: u8,
    ) -> Result<(), Self::Error> {
        self.check(motor)?;
        self.log.push((motor, Cmd::Speed(speed)));
        self.speed.insert((motor.board(), motor.position()), speed);
        Ok(())
    }
}
