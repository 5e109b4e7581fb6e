//! Built-in song and note tables
//!
//! The default song is expanded at compile time from compact digit strings:
//! an intro riff played three times (the third pass cut short) followed by an
//! outro whose final note rings four times longer.

use crate::types::{Column, NoteInfo, Pitch, COLUMNS};

/// Ticks between consecutive notes.
pub const NOTE_SPACING: u32 = 30;
/// Ticks the tone rings after a hit.
pub const NOTE_DURATION: u32 = NOTE_SPACING - 1;
/// Start tick of the first note.
pub const FIRST_NOTE_TICK: u32 = 10;

const RIFF_LEN: usize = 64;
const OUTRO_LEN: usize = 17;
const PASS_CUTOFFS: [usize; 3] = [0, 0, 16];
const LAST_NOTE_STRETCH: u32 = 4;

pub const SONG_LEN: usize =
    RIFF_LEN * PASS_CUTOFFS.len() - PASS_CUTOFFS[0] - PASS_CUTOFFS[1] - PASS_CUTOFFS[2] + OUTRO_LEN;

/// Riff digits: a seven-note phrase repeated over an eight-step pattern.
struct Riff {
    phrase: &'static [u8; 7],
    steps: [u8; 8],
}

const fn expand(riff: Riff) -> [u8; RIFF_LEN] {
    let mut out = [0u8; RIFF_LEN];
    let mut pos = 0;
    let mut step = 0;
    while step < riff.steps.len() {
        out[pos] = riff.steps[step];
        pos += 1;
        let mut i = 0;
        while i < riff.phrase.len() {
            out[pos] = riff.phrase[i] - b'0';
            pos += 1;
            i += 1;
        }
        step += 1;
    }
    out
}

const RIFF_COLUMNS: [u8; RIFF_LEN] = expand(Riff {
    phrase: b"4324232",
    steps: [1, 1, 2, 2, 3, 3, 1, 1],
});
const RIFF_LETTERS: [u8; RIFF_LEN] = expand(Riff {
    phrase: b"2977969",
    steps: [2, 2, 4, 4, 7, 7, 2, 2],
});
const RIFF_OCTAVES: [u8; RIFF_LEN] = expand(Riff {
    phrase: b"4334343",
    steps: [3; 8],
});

// The riff closes on a variant of the phrase.
const RIFF_TAIL_LETTERS: &[u8; 7] = b"2977767";

const OUTRO_COLUMNS: &[u8; OUTRO_LEN] = b"42321212324232123";
const OUTRO_LETTERS: &[u8; OUTRO_LEN] = b"79694929496979692";
const OUTRO_OCTAVES: &[u8; OUTRO_LEN] = b"43434343434343434";

const fn note(column: u8, letter: u8, octave: u8, start: u32, duration: u32) -> NoteInfo {
    let column = match Column::new(column) {
        Some(column) => column,
        None => panic!("song column out of range"),
    };
    let pitch = match Pitch::new(letter, octave) {
        Some(pitch) => pitch,
        None => panic!("song pitch out of range"),
    };
    NoteInfo {
        column,
        start,
        pitch,
        duration,
    }
}

const fn riff_letter(i: usize) -> u8 {
    // the last phrase replaces the plain one
    if i >= RIFF_LEN - RIFF_TAIL_LETTERS.len() {
        RIFF_TAIL_LETTERS[i - (RIFF_LEN - RIFF_TAIL_LETTERS.len())] - b'0'
    } else {
        RIFF_LETTERS[i]
    }
}

const fn build_song() -> [NoteInfo; SONG_LEN] {
    let mut notes = [note(1, 1, 4, 0, 0); SONG_LEN];
    let mut n = 0;
    let mut start = FIRST_NOTE_TICK;

    let mut pass = 0;
    while pass < PASS_CUTOFFS.len() {
        let mut i = 0;
        while i < RIFF_LEN - PASS_CUTOFFS[pass] {
            notes[n] = note(RIFF_COLUMNS[i], riff_letter(i), RIFF_OCTAVES[i], start, NOTE_DURATION);
            n += 1;
            start += NOTE_SPACING;
            i += 1;
        }
        pass += 1;
    }

    let mut i = 0;
    while i < OUTRO_LEN {
        let duration = if i == OUTRO_LEN - 1 {
            NOTE_SPACING * LAST_NOTE_STRETCH - 1
        } else {
            NOTE_DURATION
        };
        notes[n] = note(
            OUTRO_COLUMNS[i] - b'0',
            OUTRO_LETTERS[i] - b'0',
            OUTRO_OCTAVES[i] - b'0',
            start,
            duration,
        );
        n += 1;
        start += NOTE_SPACING;
        i += 1;
    }
    notes
}

/// True when start ticks never decrease.
pub const fn is_ordered(notes: &[NoteInfo]) -> bool {
    let mut i = 1;
    while i < notes.len() {
        if notes[i].start < notes[i - 1].start {
            return false;
        }
        i += 1;
    }
    true
}

pub static DEFAULT_SONG: [NoteInfo; SONG_LEN] = build_song();

const _: () = assert!(SONG_LEN == 193);
const _: () = assert!(is_ordered(&build_song()));

/// Notes spawned by hand, one per column, all ringing A4.
pub static MANUAL_NOTES: [NoteInfo; COLUMNS] = [
    NoteInfo { column: Column::ALL[0], start: 0, pitch: Pitch::A4, duration: NOTE_DURATION },
    NoteInfo { column: Column::ALL[1], start: 0, pitch: Pitch::A4, duration: NOTE_DURATION },
    NoteInfo { column: Column::ALL[2], start: 0, pitch: Pitch::A4, duration: NOTE_DURATION },
    NoteInfo { column: Column::ALL[3], start: 0, pitch: Pitch::A4, duration: NOTE_DURATION },
];

pub fn default_song() -> &'static [NoteInfo] {
    &DEFAULT_SONG
}
