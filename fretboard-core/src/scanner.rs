//! Interrupt-driven 4x4 keypad scanner
//!
//! Two interrupts cooperate: a row edge wakes the scanner up, then the poll
//! timer samples the matrix until a scan comes back empty.

use crate::controller::HeldKeys;
use crate::hal::MatrixHal;
use crate::key_queue::KeyEventQueue;
use crate::types::{highest_bit_index, HeldKeyMask, KeyCode, MATRIX_SIZE};

const ROW_LINES: u8 = (1 << MATRIX_SIZE) - 1;

const _: () = assert!(ROW_LINES == 0b1111);
const _: () = assert!(highest_bit_index(ROW_LINES) == MATRIX_SIZE);

/// Scanner state
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanState {
    /// Columns driven low, row edge interrupts armed, poll timer stopped
    Idle,
    /// Edge seen, waiting for the first poll tick to ride out contact bounce
    Settling,
    /// At least one key held; every poll tick rescans the matrix
    Scanning,
}

/// Keypad scanner state machine.
///
/// Owned by the interrupt context: both [`on_row_edge`](Self::on_row_edge)
/// and [`on_poll_tick`](Self::on_poll_tick) are called from interrupt
/// handlers. Results leave through the key queue and the held mask.
pub struct KeyboardScanner<'a, M, const N: usize> {
    matrix: M,
    queue: &'a KeyEventQueue<N>,
    held: &'a HeldKeys,
    state: ScanState,
    previous: HeldKeyMask,
}

impl<'a, M, const N: usize> KeyboardScanner<'a, M, N>
where
    M: MatrixHal,
{
    /// Take over the matrix and put it into the idle configuration.
    pub fn new(mut matrix: M, queue: &'a KeyEventQueue<N>, held: &'a HeldKeys) -> Self {
        matrix.stop_poll_timer();
        matrix.set_all_columns(false);
        matrix.rearm_row_interrupts();
        held.store(HeldKeyMask::EMPTY);
        Self {
            matrix,
            queue,
            held,
            state: ScanState::Idle,
            previous: HeldKeyMask::EMPTY,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn matrix(&self) -> &M {
        &self.matrix
    }

    pub fn matrix_mut(&mut self) -> &mut M {
        &mut self.matrix
    }

    /// Row edge interrupt.
    pub fn on_row_edge(&mut self) {
        self.matrix.disarm_row_interrupts();
        match self.state {
            ScanState::Idle => {
                self.matrix.set_all_columns(true);
                self.matrix.start_poll_timer();
                self.state = ScanState::Settling;
                trace!("scanner: settling");
            }
            // The poll timer already owns the matrix.
            ScanState::Settling | ScanState::Scanning => {}
        }
    }

    /// Poll timer interrupt. Returns the freshly scanned held mask.
    pub fn on_poll_tick(&mut self) -> HeldKeyMask {
        if self.state == ScanState::Idle {
            return HeldKeyMask::EMPTY;
        }
        self.state = ScanState::Scanning;

        let mask = self.scan();
        self.held.store(mask);
        self.previous = mask;

        if mask.is_empty() {
            self.enter_idle();
        }
        mask
    }

    /// Sample every column, enqueueing keys that were not held last scan.
    ///
    /// Only the highest asserted row of each column is decoded, so two keys
    /// sharing a column register as the one on the lower physical row.
    fn scan(&mut self) -> HeldKeyMask {
        let mut mask = HeldKeyMask::EMPTY;
        for col in 1..=MATRIX_SIZE {
            self.matrix.set_column(col, false);
            self.matrix.settle_delay();
            let rows = self.matrix.read_rows_low() & ROW_LINES;
            self.matrix.set_column(col, true);

            if rows == 0 {
                continue;
            }
            let Some(key) = KeyCode::new(highest_bit_index(rows), col) else {
                continue;
            };
            mask = mask.with(key);
            if !self.previous.contains(key) {
                debug!("scanner: key {=u8:#x} pressed", key.bits());
                self.queue.enqueue(key);
            }
        }
        mask
    }

    fn enter_idle(&mut self) {
        self.matrix.stop_poll_timer();
        self.matrix.set_all_columns(false);
        self.matrix.rearm_row_interrupts();
        self.state = ScanState::Idle;
        trace!("scanner: idle");
    }
}
