//! Host test harness for the fretboard game core
//!
//! [`Session`] wires a mock keypad, the key queue, the foreground dispatcher
//! and a game together the way the firmware does, so tests can drive the
//! whole event path with key taps and timer interrupts.

#[cfg(test)]
mod game_tests;
#[cfg(test)]
mod glue_tests;
#[cfg(test)]
mod queue_tests;
#[cfg(test)]
mod scanner_tests;

use fretboard_core::controller::{HeldKeys, TickPulses};
use fretboard_core::dispatch::{Foreground, StepReport};
use fretboard_core::game::RhythmGame;
use fretboard_core::hal::mock::{MockGameHal, MockMatrix};
use fretboard_core::key_queue::{KeyEventQueue, KEY_QUEUE_CAPACITY};
use fretboard_core::scanner::{KeyboardScanner, ScanState};
use fretboard_core::types::{Column, GameConfig, KeyCode, NoteInfo, Pitch};

pub type Queue = KeyEventQueue<KEY_QUEUE_CAPACITY>;

/// Build a song from `(column, start)` pairs with A4 notes of 29 ticks.
///
/// The table is leaked so games can borrow it for `'static`.
pub fn song(notes: &[(u8, u32)]) -> &'static [NoteInfo] {
    let notes: Vec<NoteInfo> = notes
        .iter()
        .map(|&(column, start)| NoteInfo {
            column: Column::new(column).expect("column in 1..=4"),
            start,
            pitch: Pitch::A4,
            duration: 29,
        })
        .collect();
    Box::leak(notes.into_boxed_slice())
}

pub fn column(number: u8) -> Column {
    Column::new(number).expect("column in 1..=4")
}

/// Sorted note positions of one column.
pub fn positions(game: &RhythmGame<'_>, number: u8) -> Vec<i32> {
    let mut ys: Vec<i32> = game.notes_in(column(number)).map(|note| note.y).collect();
    ys.sort_unstable();
    ys
}

/// A whole board on mocks: keypad, scanner, dispatcher and game.
pub struct Session {
    pub scanner: KeyboardScanner<'static, MockMatrix, KEY_QUEUE_CAPACITY>,
    pub foreground: Foreground<'static, KEY_QUEUE_CAPACITY>,
    pub game: RhythmGame<'static>,
    pub hal: MockGameHal,
    pub queue: &'static Queue,
    pub held: &'static HeldKeys,
    pub pulses: &'static TickPulses,
}

impl Session {
    pub fn new(song: &'static [NoteInfo]) -> Self {
        Self::with_config(GameConfig::default(), song)
    }

    pub fn with_config(config: GameConfig, song: &'static [NoteInfo]) -> Self {
        let queue: &'static Queue = Box::leak(Box::new(Queue::new()));
        let held: &'static HeldKeys = Box::leak(Box::new(HeldKeys::new()));
        let pulses: &'static TickPulses = Box::leak(Box::new(TickPulses::new()));
        Self {
            scanner: KeyboardScanner::new(MockMatrix::new(), queue, held),
            foreground: Foreground::new(queue, held, pulses),
            game: RhythmGame::new(config, song),
            hal: MockGameHal::mock(),
            queue,
            held,
            pulses,
        }
    }

    /// One foreground loop iteration.
    pub fn step(&mut self) -> StepReport {
        self.foreground.step(&mut self.game, &mut self.hal)
    }

    /// Press `key` and let the scanner pick it up; keeps it held.
    pub fn hold(&mut self, key: KeyCode) -> StepReport {
        self.scanner.matrix_mut().press(key);
        if self.scanner.state() == ScanState::Idle {
            self.scanner.on_row_edge();
        }
        self.scanner.on_poll_tick();
        self.step()
    }

    /// Let go of `key` and rescan.
    pub fn release(&mut self, key: KeyCode) -> StepReport {
        self.scanner.matrix_mut().release(key);
        self.scanner.on_poll_tick();
        self.step()
    }

    /// Press and release `key`, then run the foreground once.
    pub fn tap(&mut self, key: KeyCode) -> StepReport {
        self.scanner.matrix_mut().press(key);
        if self.scanner.state() == ScanState::Idle {
            self.scanner.on_row_edge();
        }
        self.scanner.on_poll_tick();
        self.scanner.matrix_mut().release(key);
        self.scanner.on_poll_tick();
        self.step()
    }

    /// Fire the tick timer `interrupts` times, then run the foreground once.
    pub fn run_timer(&mut self, interrupts: u32) -> StepReport {
        for _ in 0..interrupts {
            self.pulses.on_timer_interrupt();
        }
        self.step()
    }
}
