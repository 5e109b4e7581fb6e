//! Tick-driven rhythm game engine
//!
//! Notes fall down four columns one pixel per tick. Pressing a fret while a
//! note sits within the hit window of the fret line scores it and plays its
//! pitch; a note that falls off the board costs a fixed penalty.
//!
//! The engine is foreground-only. Interrupts never call into it; they count
//! tick pulses that the foreground loop drains into [`RhythmGame::advance_ticks`].

use core::fmt::Write;

use heapless::String;

use crate::hal::{DebugSink, DrawService, GameHal, ToneGenerator};
use crate::song::MANUAL_NOTES;
use crate::types::{Column, GameConfig, NoteInfo, COLUMNS, MAX_TOLERANCE};

/// Note slots per column, one bit each in the occupancy mask.
pub const SLOTS_PER_COLUMN: usize = 32;

const _: () = assert!(SLOTS_PER_COLUMN == u32::BITS as usize);

type Trace = String<48>;

/// A note on the board.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SpawnedNote<'a> {
    /// Top edge in board pixels, negative while still above the board.
    pub y: i32,
    pub info: &'a NoteInfo,
}

/// Indices of the set bits of an occupancy mask, lowest first.
#[derive(Copy, Clone, Debug)]
pub struct OccupiedSlots(u32);

impl Iterator for OccupiedSlots {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let slot = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(slot)
    }
}

/// Where a spawn request ended up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpawnOutcome {
    /// Placed in this slot.
    Placed(usize),
    /// Already past the board when caught; scored as a miss.
    Missed,
    /// Column full; the note was dropped.
    Dropped,
}

/// Complete game state for one song.
pub struct RhythmGame<'a> {
    config: GameConfig,
    song: &'a [NoteInfo],
    notes: [[Option<SpawnedNote<'a>>; SLOTS_PER_COLUMN]; COLUMNS],
    occupancy: [u32; COLUMNS],
    score: u32,
    spawn_cursor: usize,
    tick: u32,
    speaker_off_at: Option<u32>,
}

impl<'a> RhythmGame<'a> {
    /// Create a game over `song`, whose notes must be ordered by start tick.
    pub fn new(config: GameConfig, song: &'a [NoteInfo]) -> Self {
        debug_assert!(crate::song::is_ordered(song));
        Self {
            config,
            song,
            notes: [[None; SLOTS_PER_COLUMN]; COLUMNS],
            occupancy: [0; COLUMNS],
            score: 0,
            spawn_cursor: 0,
            tick: 0,
            speaker_off_at: None,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    /// Index of the next song note to spawn.
    pub fn spawn_cursor(&self) -> usize {
        self.spawn_cursor
    }

    pub fn occupancy(&self, column: Column) -> u32 {
        self.occupancy[column.index()]
    }

    pub fn note_count(&self) -> usize {
        self.occupancy.iter().map(|bits| bits.count_ones() as usize).sum()
    }

    /// Live notes of one column in slot order.
    pub fn notes_in(&self, column: Column) -> impl Iterator<Item = &SpawnedNote<'a>> + '_ {
        let col = column.index();
        OccupiedSlots(self.occupancy[col]).filter_map(move |slot| self.notes[col][slot].as_ref())
    }

    /// Tick at which the speaker goes quiet, if a tone is ringing.
    pub fn speaker_deadline(&self) -> Option<u32> {
        self.speaker_off_at
    }

    /// Every song note spawned and none left on the board.
    pub fn is_finished(&self) -> bool {
        self.spawn_cursor == self.song.len() && self.note_count() == 0
    }

    /// Advance the clock by `n` ticks: spawn due notes, move the others,
    /// and silence the speaker once its deadline passes.
    pub fn advance_ticks<H: GameHal>(&mut self, hal: &mut H, n: u32) {
        self.tick = self.tick.saturating_add(n);

        // Notes spawned below already sit at their caught-up position.
        let moving = self.occupancy;
        self.spawn_due(hal);
        self.move_notes(hal, moving, n);

        if let Some(deadline) = self.speaker_off_at {
            if self.tick >= deadline {
                hal.tone().tone_off();
                self.speaker_off_at = None;
            }
        }
    }

    fn spawn_due<H: GameHal>(&mut self, hal: &mut H) {
        let song = self.song;
        while let Some(info) = song.get(self.spawn_cursor) {
            if info.start > self.tick {
                break;
            }
            self.spawn_cursor += 1;
            let late = i32::try_from(self.tick - info.start).unwrap_or(i32::MAX);
            let y = self.config.spawn_y.saturating_add(late);
            if let SpawnOutcome::Placed(_) = self.spawn(hal, info, y) {
                let mut trace = Trace::new();
                let _ = writeln!(trace, "spawn col {} tick {}", info.column.number(), self.tick);
                hal.sink().send_copy(trace.as_bytes());
            }
        }
    }

    fn move_notes<H: GameHal>(&mut self, hal: &mut H, moving: [u32; COLUMNS], n: u32) {
        if n == 0 {
            return;
        }
        let delta = i32::try_from(n).unwrap_or(i32::MAX);
        for column in Column::ALL {
            let col = column.index();
            for slot in OccupiedSlots(moving[col]) {
                let Some(note) = self.notes[col][slot].as_mut() else {
                    continue;
                };
                let old_y = note.y;
                note.y = old_y.saturating_add(delta);
                if note.y > self.config.visible_height {
                    hal.draw().erase_note_at(column, old_y);
                    self.remove(column, slot);
                    self.penalize();
                } else {
                    hal.draw().move_note_vertical(column, old_y, delta);
                }
            }
        }
    }

    /// Put `info` on the board at `y`.
    fn spawn<H: GameHal>(&mut self, hal: &mut H, info: &'a NoteInfo, y: i32) -> SpawnOutcome {
        let column = info.column;
        if y > self.config.visible_height {
            self.penalize();
            return SpawnOutcome::Missed;
        }
        let col = column.index();
        let slot = self.occupancy[col].trailing_ones() as usize;
        if slot >= SLOTS_PER_COLUMN {
            let mut trace = Trace::new();
            let _ = writeln!(trace, "col {} full, note dropped", column.number());
            hal.sink().send_copy(trace.as_bytes());
            warn!("column {=u8} full, note dropped", column.number());
            return SpawnOutcome::Dropped;
        }
        self.notes[col][slot] = Some(SpawnedNote { y, info });
        self.occupancy[col] |= 1 << slot;
        hal.draw().draw_note_at(column, y);
        SpawnOutcome::Placed(slot)
    }

    /// Drop a practice note into `column` at the spawn height.
    pub fn spawn_manual<H: GameHal>(&mut self, hal: &mut H, column: Column) -> SpawnOutcome {
        let y = self.config.spawn_y;
        self.spawn(hal, &MANUAL_NOTES[column.index()], y)
    }

    fn remove(&mut self, column: Column, slot: usize) -> Option<SpawnedNote<'a>> {
        let col = column.index();
        self.occupancy[col] &= !(1 << slot);
        self.notes[col][slot].take()
    }

    fn penalize(&mut self) {
        self.score = self.score.saturating_sub(self.config.miss_penalty);
    }

    /// Fret press: score every note of `column` inside the hit window.
    ///
    /// Returns the points awarded by this press.
    pub fn press_fret<H: GameHal>(&mut self, hal: &mut H, column: Column) -> u32 {
        hal.draw().press_fret_visual(column);

        let col = column.index();
        let mut awarded = 0u32;
        for slot in OccupiedSlots(self.occupancy[col]) {
            let Some(note) = self.notes[col][slot] else {
                continue;
            };
            let error = note.y - self.config.hit_line;
            if error.abs() >= self.config.tolerance {
                continue;
            }

            hal.draw().erase_note_at(column, note.y);
            self.remove(column, slot);
            let award = self.config.base_award.saturating_sub(error.unsigned_abs());
            self.score = self.score.saturating_add(award);
            awarded = awarded.saturating_add(award);

            hal.tone().set_pitch(note.info.pitch);
            hal.tone().tone_on();
            // An early hit rings longer so the tone ends when an exact hit would.
            let ring = i64::from(note.info.duration) - i64::from(error);
            let deadline = i64::from(self.tick) + ring.max(0);
            self.speaker_off_at = Some(u32::try_from(deadline).unwrap_or(u32::MAX));

            let mut trace = Trace::new();
            let _ = writeln!(trace, "hit col {} err {} +{}", column.number(), error, award);
            hal.sink().send_copy(trace.as_bytes());
        }

        if awarded > 0 {
            hal.draw().draw_score(self.score);
        }
        awarded
    }

    /// Fret release. Visual only.
    pub fn release_fret<H: GameHal>(&mut self, hal: &mut H, column: Column) {
        hal.draw().release_fret_visual(column);
    }

    /// Restart the song from tick zero with an empty board.
    pub fn reset<H: GameHal>(&mut self, hal: &mut H) {
        self.tick = 0;
        self.spawn_cursor = 0;
        self.score = 0;
        for column in Column::ALL {
            for slot in OccupiedSlots(self.occupancy[column.index()]) {
                if let Some(note) = self.remove(column, slot) {
                    hal.draw().erase_note_at(column, note.y);
                }
            }
        }
        hal.tone().tone_off();
        self.speaker_off_at = None;
        hal.draw().draw_score(self.score);
        hal.sink().send_static(b"game reset\n");
    }

    /// Widen the hit window by one pixel; returns the new tolerance.
    pub fn widen_hit_window(&mut self) -> i32 {
        self.config.tolerance = (self.config.tolerance + 1).min(MAX_TOLERANCE);
        self.config.tolerance
    }

    /// Narrow the hit window by one pixel; returns the new tolerance.
    pub fn narrow_hit_window(&mut self) -> i32 {
        self.config.tolerance = (self.config.tolerance - 1).max(1);
        self.config.tolerance
    }
}
