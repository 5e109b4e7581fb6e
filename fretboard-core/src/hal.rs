//! Hardware Abstraction Layer for the fretboard event core
//!
//! The core never touches registers. Everything it needs from the board is
//! expressed as one of the collaborator traits below; the firmware crate
//! implements them over the chip's register blocks and [`mock`] implements
//! them for host tests.

use crate::types::{Column, Pitch};

/// Error types for HAL operations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// GPIO operation failed
    GpioError,
    /// Invalid configuration
    InvalidConfig,
}

impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HalError::GpioError => write!(f, "GPIO operation failed"),
            HalError::InvalidConfig => write!(f, "Invalid configuration"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

/// LCD drawing service used by the game engine.
///
/// Coordinates are board pixels; `y` may be negative for notes still above
/// the visible area.
pub trait DrawService {
    fn draw_note_at(&mut self, column: Column, y: i32);
    fn erase_note_at(&mut self, column: Column, y: i32);
    /// Redraw a note that moved from `old_y` by `delta_y` pixels.
    fn move_note_vertical(&mut self, column: Column, old_y: i32, delta_y: i32);
    fn press_fret_visual(&mut self, column: Column);
    fn release_fret_visual(&mut self, column: Column);
    fn is_fret_visually_pressed(&self, column: Column) -> bool;
    fn draw_score(&mut self, score: u32);
    fn draw_board(&mut self);
}

/// Square-wave speaker.
pub trait ToneGenerator {
    fn set_pitch(&mut self, pitch: Pitch);
    fn tone_on(&mut self);
    fn tone_off(&mut self);
}

/// Fire-and-forget debug text output.
pub trait DebugSink {
    /// Send a buffer that outlives the transfer.
    fn send_static(&mut self, bytes: &'static [u8]);
    /// Send a transient buffer; the sink copies it before returning.
    fn send_copy(&mut self, bytes: &[u8]);
}

impl<T: DebugSink + ?Sized> DebugSink for &mut T {
    fn send_static(&mut self, bytes: &'static [u8]) {
        (**self).send_static(bytes)
    }

    fn send_copy(&mut self, bytes: &[u8]) {
        (**self).send_copy(bytes)
    }
}

/// Everything the game engine drives, bundled.
pub trait GameHal {
    type Draw: DrawService;
    type Tone: ToneGenerator;
    type Sink: DebugSink;

    /// Access to the drawing service
    fn draw(&mut self) -> &mut Self::Draw;

    /// Access to the speaker
    fn tone(&mut self) -> &mut Self::Tone;

    /// Access to the debug sink
    fn sink(&mut self) -> &mut Self::Sink;
}

/// Plain owner of the three game collaborators.
pub struct GamePeripherals<D, T, S> {
    pub draw: D,
    pub tone: T,
    pub sink: S,
}

impl<D, T, S> GamePeripherals<D, T, S> {
    pub fn new(draw: D, tone: T, sink: S) -> Self {
        Self { draw, tone, sink }
    }
}

impl<D, T, S> GameHal for GamePeripherals<D, T, S>
where
    D: DrawService,
    T: ToneGenerator,
    S: DebugSink,
{
    type Draw = D;
    type Tone = T;
    type Sink = S;

    fn draw(&mut self) -> &mut D {
        &mut self.draw
    }

    fn tone(&mut self) -> &mut T {
        &mut self.tone
    }

    fn sink(&mut self) -> &mut S {
        &mut self.sink
    }
}

/// Keypad matrix wiring as seen by the scanner.
///
/// Columns are outputs, rows are pulled-up inputs with falling-edge
/// interrupts. A pressed key connects its row to its column, so a row reads
/// low while its column is driven low.
pub trait MatrixHal {
    /// Drive every column line high or low.
    fn set_all_columns(&mut self, high: bool);

    /// Drive one column line (1..=4).
    fn set_column(&mut self, column: u8, high: bool);

    /// Busy-wait long enough for a column change to reach the row inputs.
    fn settle_delay(&mut self);

    /// Row lines currently reading low, bit `r - 1` for row `r`.
    fn read_rows_low(&mut self) -> u8;

    /// Restart the scan poll timer from zero.
    fn start_poll_timer(&mut self);

    fn stop_poll_timer(&mut self);

    /// Mask the row edge interrupts.
    fn disarm_row_interrupts(&mut self);

    /// Clear stale row edge flags and unmask the interrupts.
    fn rearm_row_interrupts(&mut self);
}

/// Transmit side of a DMA-driven serial port.
pub trait TxDma {
    /// Start sending `bytes`.
    ///
    /// Hardware implementations keep reading from `bytes` after returning;
    /// callers keep the buffer alive and untouched until the next
    /// [`TxDma::acknowledge_complete`].
    fn start(&mut self, bytes: &[u8]);

    /// Clear the transfer-complete flag (completion interrupt only).
    fn acknowledge_complete(&mut self);
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Mock implementations for testing

    use super::*;
    use crate::types::{HeldKeyMask, KeyCode, COLUMNS, MATRIX_SIZE};
    use std::string::String;
    use std::vec::Vec;

    /// Sink that discards everything.
    #[derive(Copy, Clone, Debug, Default)]
    pub struct NullSink;

    impl DebugSink for NullSink {
        fn send_static(&mut self, _bytes: &'static [u8]) {}

        fn send_copy(&mut self, _bytes: &[u8]) {}
    }

    /// One recorded drawing-service call.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub enum DrawCall {
        DrawNote { column: Column, y: i32 },
        EraseNote { column: Column, y: i32 },
        MoveNote { column: Column, old_y: i32, delta_y: i32 },
        PressFret(Column),
        ReleaseFret(Column),
        Score(u32),
        Board,
    }

    #[derive(Default)]
    pub struct MockDraw {
        pub calls: Vec<DrawCall>,
        pressed: [bool; COLUMNS],
    }

    impl MockDraw {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn last_score(&self) -> Option<u32> {
            self.calls.iter().rev().find_map(|call| match call {
                DrawCall::Score(score) => Some(*score),
                _ => None,
            })
        }

        pub fn count(&self, pred: impl Fn(&DrawCall) -> bool) -> usize {
            self.calls.iter().filter(|call| pred(call)).count()
        }

        pub fn clear(&mut self) {
            self.calls.clear();
        }
    }

    impl DrawService for MockDraw {
        fn draw_note_at(&mut self, column: Column, y: i32) {
            self.calls.push(DrawCall::DrawNote { column, y });
        }

        fn erase_note_at(&mut self, column: Column, y: i32) {
            self.calls.push(DrawCall::EraseNote { column, y });
        }

        fn move_note_vertical(&mut self, column: Column, old_y: i32, delta_y: i32) {
            self.calls.push(DrawCall::MoveNote { column, old_y, delta_y });
        }

        fn press_fret_visual(&mut self, column: Column) {
            self.pressed[column.index()] = true;
            self.calls.push(DrawCall::PressFret(column));
        }

        fn release_fret_visual(&mut self, column: Column) {
            self.pressed[column.index()] = false;
            self.calls.push(DrawCall::ReleaseFret(column));
        }

        fn is_fret_visually_pressed(&self, column: Column) -> bool {
            self.pressed[column.index()]
        }

        fn draw_score(&mut self, score: u32) {
            self.calls.push(DrawCall::Score(score));
        }

        fn draw_board(&mut self) {
            self.calls.push(DrawCall::Board);
        }
    }

    #[derive(Default)]
    pub struct MockTone {
        pub pitch: Option<Pitch>,
        pub on: bool,
        pub on_count: usize,
        pub off_count: usize,
    }

    impl MockTone {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl ToneGenerator for MockTone {
        fn set_pitch(&mut self, pitch: Pitch) {
            self.pitch = Some(pitch);
        }

        fn tone_on(&mut self) {
            self.on = true;
            self.on_count += 1;
        }

        fn tone_off(&mut self) {
            self.on = false;
            self.off_count += 1;
        }
    }

    #[derive(Default)]
    pub struct MockSink {
        pub messages: Vec<String>,
    }

    impl MockSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn contains(&self, needle: &str) -> bool {
            self.messages.iter().any(|message| message.contains(needle))
        }
    }

    impl DebugSink for MockSink {
        fn send_static(&mut self, bytes: &'static [u8]) {
            self.messages.push(String::from_utf8_lossy(bytes).into_owned());
        }

        fn send_copy(&mut self, bytes: &[u8]) {
            self.messages.push(String::from_utf8_lossy(bytes).into_owned());
        }
    }

    pub type MockGameHal = GamePeripherals<MockDraw, MockTone, MockSink>;

    impl MockGameHal {
        pub fn mock() -> Self {
            GamePeripherals::new(MockDraw::new(), MockTone::new(), MockSink::new())
        }
    }

    /// Simulated keypad: physically pressed keys plus the line levels the
    /// scanner drives.
    pub struct MockMatrix {
        pub pressed: HeldKeyMask,
        columns_high: [bool; MATRIX_SIZE as usize],
        pub timer_running: bool,
        pub timer_starts: usize,
        pub row_interrupts_armed: bool,
        pub settle_delays: usize,
    }

    impl Default for MockMatrix {
        fn default() -> Self {
            Self {
                pressed: HeldKeyMask::EMPTY,
                columns_high: [false; MATRIX_SIZE as usize],
                timer_running: false,
                timer_starts: 0,
                row_interrupts_armed: true,
                settle_delays: 0,
            }
        }
    }

    impl MockMatrix {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn press(&mut self, key: KeyCode) {
            self.pressed = self.pressed.with(key);
        }

        pub fn release(&mut self, key: KeyCode) {
            self.pressed = HeldKeyMask::from_bits(self.pressed.bits() & !key.held_bit());
        }

        pub fn release_all(&mut self) {
            self.pressed = HeldKeyMask::EMPTY;
        }

        pub fn columns_high(&self) -> [bool; MATRIX_SIZE as usize] {
            self.columns_high
        }
    }

    impl MatrixHal for MockMatrix {
        fn set_all_columns(&mut self, high: bool) {
            self.columns_high = [high; MATRIX_SIZE as usize];
        }

        fn set_column(&mut self, column: u8, high: bool) {
            self.columns_high[(column - 1) as usize] = high;
        }

        fn settle_delay(&mut self) {
            self.settle_delays += 1;
        }

        fn read_rows_low(&mut self) -> u8 {
            self.pressed
                .keys()
                .filter(|key| !self.columns_high[(key.col() - 1) as usize])
                .fold(0, |rows, key| rows | key.row_mask())
        }

        fn start_poll_timer(&mut self) {
            self.timer_running = true;
            self.timer_starts += 1;
        }

        fn stop_poll_timer(&mut self) {
            self.timer_running = false;
        }

        fn disarm_row_interrupts(&mut self) {
            self.row_interrupts_armed = false;
        }

        fn rearm_row_interrupts(&mut self) {
            self.row_interrupts_armed = true;
        }
    }

    #[derive(Default)]
    pub struct MockTxDma {
        pub transfers: Vec<Vec<u8>>,
        pub acknowledged: usize,
    }

    impl MockTxDma {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn transcript(&self) -> String {
            self.transfers
                .iter()
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .collect()
        }
    }

    impl TxDma for MockTxDma {
        fn start(&mut self, bytes: &[u8]) {
            self.transfers.push(bytes.to_vec());
        }

        fn acknowledge_complete(&mut self) {
            self.acknowledged += 1;
        }
    }
}
