//! Foreground loop: keypad commands and tick delivery for the game

use crate::controller::{HeldKeys, TickPulses};
use crate::game::RhythmGame;
use crate::hal::{DebugSink, DrawService, GameHal};
use crate::key_queue::KeyEventQueue;
use crate::types::{
    Column, KeyCode, COLUMNS, KEY_1, KEY_2, KEY_3, KEY_4, KEY_5, KEY_6, KEY_A, KEY_C, KEY_D,
    KEY_POUND, KEY_STAR,
};

/// Top-row keys acting as frets, left to right.
pub const FRET_KEYS: [KeyCode; COLUMNS] = [KEY_1, KEY_2, KEY_3, KEY_A];

/// What a key press asks the game to do.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Fret(Column),
    ToggleFalling,
    SpeedUp,
    SlowDown,
    WidenWindow,
    NarrowWindow,
    Reset,
    SpawnAll,
}

impl Command {
    pub fn from_key(key: KeyCode) -> Option<Command> {
        if key.is_none() {
            return None;
        }
        if key.row() == 1 {
            return Column::new(key.col()).map(Command::Fret);
        }
        match key {
            KEY_5 => Some(Command::ToggleFalling),
            KEY_C => Some(Command::SpeedUp),
            KEY_D => Some(Command::SlowDown),
            KEY_6 => Some(Command::WidenWindow),
            KEY_4 => Some(Command::NarrowWindow),
            KEY_STAR => Some(Command::Reset),
            KEY_POUND => Some(Command::SpawnAll),
            _ => None,
        }
    }
}

/// Work done by one [`Foreground::step`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Keys taken from the queue
    pub keys: usize,
    /// Tick pulses handed to the game
    pub ticks: u32,
}

/// The foreground half of the game: everything the main loop does between
/// waits.
pub struct Foreground<'a, const N: usize> {
    keys: &'a KeyEventQueue<N>,
    held: &'a HeldKeys,
    pulses: &'a TickPulses,
}

impl<'a, const N: usize> Foreground<'a, N> {
    pub fn new(keys: &'a KeyEventQueue<N>, held: &'a HeldKeys, pulses: &'a TickPulses) -> Self {
        Self { keys, held, pulses }
    }

    /// One loop iteration: dispatch queued keys, release frets whose key is
    /// up, then advance the game by the drained tick pulses.
    pub fn step<H: GameHal>(&mut self, game: &mut RhythmGame<'_>, hal: &mut H) -> StepReport {
        let mut report = StepReport::default();

        while let Some(key) = self.keys.try_dequeue() {
            report.keys += 1;
            if let Some(command) = Command::from_key(key) {
                self.execute(command, game, hal);
            }
        }

        for (column, key) in Column::ALL.into_iter().zip(FRET_KEYS) {
            if hal.draw().is_fret_visually_pressed(column) && !self.held.is_held(key) {
                game.release_fret(hal, column);
            }
        }

        report.ticks = self.pulses.drain();
        if report.ticks > 0 {
            game.advance_ticks(hal, report.ticks);
        }
        report
    }

    pub fn execute<H: GameHal>(&mut self, command: Command, game: &mut RhythmGame<'_>, hal: &mut H) {
        trace!("command {}", command);
        match command {
            Command::Fret(column) => {
                game.press_fret(hal, column);
            }
            Command::ToggleFalling => {
                let message: &'static [u8] = if self.pulses.toggle_running() {
                    b"Fall on!\n"
                } else {
                    b"Fall off!\n"
                };
                hal.sink().send_static(message);
            }
            Command::SpeedUp => {
                if self.pulses.speed_up() {
                    hal.sink().send_static(b"Speeding up!\n");
                }
            }
            Command::SlowDown => {
                if self.pulses.slow_down() {
                    hal.sink().send_static(b"Slowing down!\n");
                }
            }
            Command::WidenWindow => {
                game.widen_hit_window();
                hal.sink().send_static(b"Hit window wider\n");
            }
            Command::NarrowWindow => {
                game.narrow_hit_window();
                hal.sink().send_static(b"Hit window narrower\n");
            }
            Command::Reset => game.reset(hal),
            Command::SpawnAll => {
                for column in Column::ALL {
                    game.spawn_manual(hal, column);
                }
            }
        }
    }
}
