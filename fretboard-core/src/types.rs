//! Core data types for the fretboard event core

/// Rows (and columns) of the keypad matrix.
pub const MATRIX_SIZE: u8 = 4;

/// Fret columns on the board.
pub const COLUMNS: usize = 4;

const ROW_NIBBLE: u8 = 0x0F;
const COL_SHIFT: u8 = 4;

/// One-based index of the highest set bit, 0 for an empty mask.
///
/// When more than one bit is set the highest one wins, which for the row
/// nibble means the physically lowest row.
pub const fn highest_bit_index(mask: u8) -> u8 {
    (u8::BITS - mask.leading_zeros()) as u8
}

const _: () = assert!(highest_bit_index(0b0001) == 1);
const _: () = assert!(highest_bit_index(0b1000) == 4);
const _: () = assert!(highest_bit_index(0b1111) == 4);
const _: () = assert!(highest_bit_index(0) == 0);

/// A key press reported by the matrix scanner.
///
/// The low nibble is a row bitmask (bit per row 1..=4) and the high nibble a
/// column bitmask. `0xFF` is reserved for "no key".
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyCode(u8);

const fn key(row: u8, col: u8) -> KeyCode {
    KeyCode((1 << (row - 1)) | (1 << (col - 1 + COL_SHIFT)))
}

pub const KEY_1: KeyCode = key(1, 1);
pub const KEY_2: KeyCode = key(1, 2);
pub const KEY_3: KeyCode = key(1, 3);
pub const KEY_A: KeyCode = key(1, 4);
pub const KEY_4: KeyCode = key(2, 1);
pub const KEY_5: KeyCode = key(2, 2);
pub const KEY_6: KeyCode = key(2, 3);
pub const KEY_B: KeyCode = key(2, 4);
pub const KEY_7: KeyCode = key(3, 1);
pub const KEY_8: KeyCode = key(3, 2);
pub const KEY_9: KeyCode = key(3, 3);
pub const KEY_C: KeyCode = key(3, 4);
pub const KEY_STAR: KeyCode = key(4, 1);
pub const KEY_0: KeyCode = key(4, 2);
pub const KEY_POUND: KeyCode = key(4, 3);
pub const KEY_D: KeyCode = key(4, 4);

#[cfg(test)]
const LEGENDS: [[char; 4]; 4] = [
    ['1', '2', '3', 'A'],
    ['4', '5', '6', 'B'],
    ['7', '8', '9', 'C'],
    ['*', '0', '#', 'D'],
];

const _: () = assert!(KEY_D.0 == 0x88);
const _: () = assert!(KEY_1.0 == 0x11);

impl KeyCode {
    /// Sentinel meaning "no key".
    pub const NONE: KeyCode = KeyCode(0xFF);

    /// Build the code for the key at `row`, `col` (both 1..=4).
    pub const fn new(row: u8, col: u8) -> Option<KeyCode> {
        if row == 0 || row > MATRIX_SIZE || col == 0 || col > MATRIX_SIZE {
            return None;
        }
        Some(key(row, col))
    }

    /// Reinterpret a raw byte, rejecting the sentinel and codes with an empty
    /// row or column nibble.
    pub const fn from_bits(bits: u8) -> Option<KeyCode> {
        if bits == Self::NONE.0 || bits & ROW_NIBBLE == 0 || bits >> COL_SHIFT == 0 {
            None
        } else {
            Some(KeyCode(bits))
        }
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_none(self) -> bool {
        self.0 == Self::NONE.0
    }

    pub const fn row_mask(self) -> u8 {
        self.0 & ROW_NIBBLE
    }

    pub const fn col_mask(self) -> u8 {
        self.0 >> COL_SHIFT
    }

    /// Row number in 1..=4
    pub const fn row(self) -> u8 {
        highest_bit_index(self.row_mask())
    }

    /// Column number in 1..=4
    pub const fn col(self) -> u8 {
        highest_bit_index(self.col_mask())
    }

    /// Bit of this key in a [`HeldKeyMask`].
    pub const fn held_bit(self) -> u16 {
        1 << ((self.row() - 1) * MATRIX_SIZE + (self.col() - 1))
    }

    /// Printed legend of the key, `None` for the sentinel.
    #[cfg(test)]
    pub fn legend(self) -> Option<char> {
        if self.is_none() {
            return None;
        }
        Some(LEGENDS[(self.row() - 1) as usize][(self.col() - 1) as usize])
    }
}

/// Snapshot of every held key, one bit per (row, col).
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HeldKeyMask(u16);

impl HeldKeyMask {
    pub const EMPTY: HeldKeyMask = HeldKeyMask(0);

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn with(self, key: KeyCode) -> Self {
        Self(self.0 | key.held_bit())
    }

    pub const fn contains(self, key: KeyCode) -> bool {
        !key.is_none() && self.0 & key.held_bit() != 0
    }

    /// Keys set in `self` but not in `previous`.
    pub const fn pressed_since(self, previous: HeldKeyMask) -> HeldKeyMask {
        Self(self.0 & !previous.0)
    }

    /// Held keys in row-major order.
    pub fn keys(self) -> impl Iterator<Item = KeyCode> {
        (0..16u8)
            .filter(move |bit| self.0 & (1 << bit) != 0)
            .map(|bit| key(bit / MATRIX_SIZE + 1, bit % MATRIX_SIZE + 1))
    }
}

/// One of the four fret columns, numbered 1..=4 like the board lanes.
#[derive(Copy, Clone, PartialEq, Eq, Debug, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Column(u8);

impl Column {
    pub const ALL: [Column; COLUMNS] = [Column(1), Column(2), Column(3), Column(4)];

    pub const fn new(number: u8) -> Option<Column> {
        if number == 0 || number as usize > COLUMNS {
            None
        } else {
            Some(Column(number))
        }
    }

    /// One-based lane number.
    pub const fn number(self) -> u8 {
        self.0
    }

    /// Zero-based index for per-column arrays.
    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

/// Equal-tempered pitches of octave 4, C4..B4, in millihertz.
const OCTAVE_4_MILLIHZ: [u32; 12] = [
    261_626, 277_183, 293_665, 311_127, 329_628, 349_228, 369_994, 391_995, 415_305, 440_000,
    466_164, 493_883,
];

/// A musical pitch: `letter` 1..=12 (C=1, B=12), `octave` 0..=8.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pitch {
    letter: u8,
    octave: u8,
}

impl Pitch {
    pub const A4: Pitch = Pitch { letter: 10, octave: 4 };

    pub const fn new(letter: u8, octave: u8) -> Option<Pitch> {
        if letter == 0 || letter > 12 || octave > 8 {
            None
        } else {
            Some(Pitch { letter, octave })
        }
    }

    pub const fn letter(self) -> u8 {
        self.letter
    }

    pub const fn octave(self) -> u8 {
        self.octave
    }

    pub const fn frequency_millihz(self) -> u32 {
        let base = OCTAVE_4_MILLIHZ[(self.letter - 1) as usize];
        if self.octave >= 4 {
            base << (self.octave - 4)
        } else {
            base >> (4 - self.octave)
        }
    }

    /// Auto-reload value producing this pitch on a timer counting at
    /// `timer_hz`, saturated to the 16-bit range.
    pub const fn timer_reload(self, timer_hz: u32) -> u16 {
        let period = (timer_hz as u64 * 1000) / self.frequency_millihz() as u64;
        if period == 0 {
            0
        } else if period > u16::MAX as u64 + 1 {
            u16::MAX
        } else {
            (period - 1) as u16
        }
    }
}

/// One scheduled note of a song.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NoteInfo {
    pub column: Column,
    /// Tick at which the note enters the board.
    pub start: u32,
    pub pitch: Pitch,
    /// Ticks the tone plays after a hit.
    pub duration: u32,
}

/// Configuration errors
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Hit line outside the visible board
    HitLineOutOfRange,
    /// Hit window tolerance outside 1..=MAX_TOLERANCE
    ToleranceOutOfRange,
    /// Base award would not cover the worst hit
    AwardTooSmall,
    /// Notes must spawn above the visible area
    SpawnNotOffscreen,
    /// Tick divider shift above MAX_DIVIDER_SHIFT
    DividerOutOfRange,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::HitLineOutOfRange => write!(f, "hit line must lie inside the visible area"),
            ConfigError::ToleranceOutOfRange => write!(f, "tolerance must be between 1 and {}", MAX_TOLERANCE),
            ConfigError::AwardTooSmall => write!(f, "base award must exceed the tolerance"),
            ConfigError::SpawnNotOffscreen => write!(f, "spawn offset must be negative"),
            ConfigError::DividerOutOfRange => write!(f, "divider shift must be at most {}", MAX_DIVIDER_SHIFT),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

/// Widest hit window the game accepts, in pixels.
pub const MAX_TOLERANCE: i32 = 40;

/// Rhythm game tuning parameters
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GameConfig {
    /// Height of the visible board in pixels. Notes below it are missed.
    pub visible_height: i32,
    /// Y coordinate of the fret line.
    pub hit_line: i32,
    /// Half-width of the hit window; `|error| < tolerance` is a hit.
    pub tolerance: i32,
    /// Award for a perfect hit.
    pub base_award: u32,
    /// Penalty for a note that scrolls off unplayed.
    pub miss_penalty: u32,
    /// Y coordinate a note spawns at when caught on its start tick.
    pub spawn_y: i32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            visible_height: 160,
            hit_line: 130,
            tolerance: 5,
            base_award: 1000,
            miss_penalty: 50,
            spawn_y: -30,
        }
    }
}

impl GameConfig {
    /// Create a new configuration with validation
    pub fn new(
        visible_height: i32,
        hit_line: i32,
        tolerance: i32,
        base_award: u32,
        miss_penalty: u32,
        spawn_y: i32,
    ) -> Result<Self, ConfigError> {
        if hit_line < 0 || hit_line >= visible_height {
            return Err(ConfigError::HitLineOutOfRange);
        }
        if !(1..=MAX_TOLERANCE).contains(&tolerance) {
            return Err(ConfigError::ToleranceOutOfRange);
        }
        if base_award <= tolerance as u32 {
            return Err(ConfigError::AwardTooSmall);
        }
        if spawn_y >= 0 {
            return Err(ConfigError::SpawnNotOffscreen);
        }

        Ok(Self {
            visible_height,
            hit_line,
            tolerance,
            base_award,
            miss_penalty,
            spawn_y,
        })
    }
}

/// Largest power-of-two divider for the game tick timer.
pub const MAX_DIVIDER_SHIFT: u8 = 20;

/// Game tick pacing: one tick pulse per `2^divider_shift` timer interrupts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickConfig {
    pub divider_shift: u8,
}

impl TickConfig {
    pub fn new(divider_shift: u8) -> Result<Self, ConfigError> {
        if divider_shift > MAX_DIVIDER_SHIFT {
            return Err(ConfigError::DividerOutOfRange);
        }
        Ok(Self { divider_shift })
    }
}
