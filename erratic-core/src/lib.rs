//! Erratic motion scheduling for arrays of DC motors on Adafruit Motor Shield V2
//! boards, for no-std embedded platforms.
//!
//! For a desktop bring-up harness, see the `erratic-app/mock-host` crate.
#![no_std]

pub mod utils;
