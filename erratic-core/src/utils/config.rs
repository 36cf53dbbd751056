//! Board enumeration and PWM settings for the motor array.
//!
//! The order of `boards` is part of the wiring contract: slot `i` of the
//! array always drives position `(i % 4) + 1` on `boards[i / 4]`. Reordering
//! the list rewires every motor.

use heapless::Vec;
use serde::Deserialize;

use crate::utils::controllers::driver::MOTORS_PER_BOARD;

/// Upper bound on shields sharing one bus (5 address jumpers).
pub const MAX_BOARDS: usize = 32;

/// Stock board addresses, in wiring order.
pub const DEFAULT_BOARDS: [u8; 4] = [0x67, 0x61, 0x60, 0x66];

/// PCA9685 prescale for ~1.6 kHz, the shield's stock PWM frequency.
pub const DEFAULT_PRESCALE: u8 = 3;

/// Array configuration, normally deserialized from JSON on the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArrayConfig {
    /// Board bus addresses in board-major slot order.
    #[serde(default = "default_boards")]
    pub boards: Vec<u8, MAX_BOARDS>,
    /// PCA9685 prescale written during board bring-up.
    #[serde(default = "default_prescale")]
    pub prescale: u8,
}

impl Default for ArrayConfig {
    fn default() -> Self {
        Self {
            boards: default_boards(),
            prescale: DEFAULT_PRESCALE,
        }
    }
}

impl ArrayConfig {
    /// Build a configuration from an explicit board list.
    ///
    /// Returns `None` if more than `MAX_BOARDS` addresses are given.
    pub fn with_boards(boards: &[u8]) -> Option<Self> {
        Some(Self {
            boards: Vec::from_slice(boards).ok()?,
            prescale: DEFAULT_PRESCALE,
        })
    }

    /// Number of motor slots this enumeration addresses.
    pub fn motor_count(&self) -> usize {
        self.boards.len() * MOTORS_PER_BOARD
    }

    /// The `(board, position)` pair wired to `slot`, if the slot exists.
    pub fn address_of(
        &self,
        slot: usize,
    ) -> Option<(u8, u8)> {
        let board = *self.boards.get(slot / MOTORS_PER_BOARD)?;
        Some((board, (slot % MOTORS_PER_BOARD) as u8 + 1))
    }
}

fn default_boards() -> Vec<u8, MAX_BOARDS> {
    let mut boards = Vec::new();
    for addr in DEFAULT_BOARDS {
        let _ = boards.push(addr);
    }
    boards
}

fn default_prescale() -> u8 {
    DEFAULT_PRESCALE
}
