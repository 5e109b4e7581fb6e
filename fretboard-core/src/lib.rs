#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! # Fretboard Core
//!
//! Real-time event core of the fretboard rhythm game firmware: keypad
//! scanning, the lock-free key queue, the tick-driven game engine and the
//! DMA serial transmit queue. Hardware access goes through the traits in
//! [`hal`], so everything here runs on the host as well.

// Must come first so the logging macros are visible to every module.
#[macro_use]
mod fmt;

pub mod types;
pub mod controller;
pub mod key_queue;
pub mod scanner;
pub mod game;
pub mod song;
pub mod serial;
pub mod dispatch;
pub mod render;
pub mod lcd;
pub mod buttons;
pub mod leds;
pub mod hal;


pub use types::*;
pub use controller::*;
pub use key_queue::*;
pub use scanner::*;
pub use game::*;
pub use song::{default_song, DEFAULT_SONG, MANUAL_NOTES};
pub use serial::*;
pub use dispatch::*;
pub use hal::*;

/// Fretboard library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default game tuning for the 128x160 board
pub fn default_config() -> GameConfig {
    GameConfig::default()
}
