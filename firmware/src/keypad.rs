//! 4x4 keypad on GPIOC: columns PC0-PC3 (outputs), rows PC6-PC9 (inputs
//! with pull-ups, falling-edge EXTI). TIM3 paces the scan.

use fretboard_core::hal::MatrixHal;
use stm32f4::stm32f411::{exti, gpioa, syscfg, tim3, EXTI, GPIOC, RCC, SYSCFG, TIM3};

use crate::board::HSI_HZ;
use crate::gpio::{GpioPin, Port, Pull};

const FIRST_ROW_PIN: u32 = 6;
const ROW_PINS: u32 = 0b1111 << FIRST_ROW_PIN;
const COLUMN_PINS: u32 = 0b1111;

/// SYSCFG_EXTICRx source selector for port C
const EXTI_PORT_C: u32 = 0b0010;
/// EXTI6/7 sit in the upper half of EXTICR2, EXTI8/9 in the lower half of
/// EXTICR3.
const EXTICR2_ROWS: (u32, u32) = (0xFF << 8, (EXTI_PORT_C << 8) | (EXTI_PORT_C << 12));
const EXTICR3_ROWS: (u32, u32) = (0xFF, EXTI_PORT_C | (EXTI_PORT_C << 4));

/// Scan period: 1 MHz timer clock, 10 ms update.
const POLL_PRESCALER: u32 = HSI_HZ / 1_000_000 - 1;
const POLL_RELOAD: u32 = 10_000 - 1;

const _: () = assert!(POLL_PRESCALER == 15);
const _: () = assert!((POLL_PRESCALER + 1) * (POLL_RELOAD + 1) == HSI_HZ / 100);

/// Busy-wait cycles between driving a column and sampling the rows.
const SETTLE_CYCLES: u32 = 40;

// SAFETY (all four): fixed MMIO blocks owned by this driver once `init`
// has run; the interrupt handlers only read flags or clear them.
fn exti() -> &'static exti::RegisterBlock {
    unsafe { &*EXTI::ptr() }
}

fn poll_timer() -> &'static tim3::RegisterBlock {
    unsafe { &*TIM3::ptr() }
}

fn gpioc() -> &'static gpioa::RegisterBlock {
    unsafe { &*(GPIOC::ptr() as *const gpioa::RegisterBlock) }
}

fn syscfg() -> &'static syscfg::RegisterBlock {
    unsafe { &*SYSCFG::ptr() }
}

pub struct Keypad {
    _private: (),
}

impl Keypad {
    /// Configure pins, row interrupts and the poll timer. Columns start low
    /// so any press pulls its row down and raises the edge interrupt.
    pub fn init() -> Self {
        Port::C.enable_clock();
        // SAFETY: enable bits are only ever set
        let rcc = unsafe { &*RCC::ptr() };
        rcc.apb1enr.modify(|_, w| w.tim3en().set_bit());
        rcc.apb2enr.modify(|_, w| w.syscfgen().set_bit());

        for pin in 0..4 {
            GpioPin::new(Port::C, pin).into_output(false);
        }
        for pin in 6..10 {
            GpioPin::new(Port::C, pin).into_input(Pull::Up);
        }

        // SAFETY: port selectors and EXTI line masks are plain bit fields
        unsafe {
            let syscfg = syscfg();
            let (mask, value) = EXTICR2_ROWS;
            syscfg.exticr2.modify(|r, w| w.bits((r.bits() & !mask) | value));
            let (mask, value) = EXTICR3_ROWS;
            syscfg.exticr3.modify(|r, w| w.bits((r.bits() & !mask) | value));

            let exti = exti();
            exti.ftsr.modify(|r, w| w.bits(r.bits() | ROW_PINS));
            exti.rtsr.modify(|r, w| w.bits(r.bits() & !ROW_PINS));
            exti.pr.write(|w| w.bits(ROW_PINS));
            exti.imr.modify(|r, w| w.bits(r.bits() | ROW_PINS));
        }

        let tim = poll_timer();
        tim.cr1.write(|w| w.urs().set_bit());
        // SAFETY: both values fit the 16-bit registers
        tim.psc.write(|w| unsafe { w.bits(POLL_PRESCALER) });
        tim.arr.write(|w| unsafe { w.bits(POLL_RELOAD) });
        tim.egr.write(|w| w.ug().set_bit());
        tim.sr.modify(|_, w| w.uif().clear_bit());
        tim.dier.write(|w| w.uie().set_bit());

        Self { _private: () }
    }

    /// Clear the poll timer's update flag. Returns whether it was set.
    pub fn take_poll_event() -> bool {
        let tim = poll_timer();
        let pending = tim.sr.read().uif().bit_is_set() && tim.dier.read().uie().bit_is_set();
        if pending {
            tim.sr.modify(|_, w| w.uif().clear_bit());
        }
        pending
    }

    /// Row lines with an edge pending.
    pub fn pending_rows() -> u32 {
        exti().pr.read().bits() & ROW_PINS
    }
}

fn clear_row_edges() {
    // SAFETY: PR is write-one-to-clear, only the row lines are written
    exti().pr.write(|w| unsafe { w.bits(ROW_PINS) });
}

fn mask_rows(enabled: bool) {
    // SAFETY: only the row lines change
    exti().imr.modify(|r, w| unsafe {
        w.bits(if enabled {
            r.bits() | ROW_PINS
        } else {
            r.bits() & !ROW_PINS
        })
    });
}

impl MatrixHal for Keypad {
    fn set_all_columns(&mut self, high: bool) {
        let bits = if high { COLUMN_PINS } else { COLUMN_PINS << 16 };
        // SAFETY: BSRR only touches the column pins named in `bits`
        gpioc().bsrr.write(|w| unsafe { w.bits(bits) });
    }

    fn set_column(&mut self, column: u8, high: bool) {
        GpioPin::new(Port::C, column - 1).write(high);
    }

    fn settle_delay(&mut self) {
        cortex_m::asm::delay(SETTLE_CYCLES);
    }

    fn read_rows_low(&mut self) -> u8 {
        let rows = !gpioc().idr.read().bits() & ROW_PINS;
        (rows >> FIRST_ROW_PIN) as u8
    }

    fn start_poll_timer(&mut self) {
        let tim = poll_timer();
        // SAFETY: zero is a valid count
        tim.cnt.write(|w| unsafe { w.bits(0) });
        tim.cr1.modify(|_, w| w.cen().set_bit());
    }

    fn stop_poll_timer(&mut self) {
        poll_timer().cr1.modify(|_, w| w.cen().clear_bit());
    }

    fn disarm_row_interrupts(&mut self) {
        mask_rows(false);
        clear_row_edges();
    }

    fn rearm_row_interrupts(&mut self) {
        // edges seen while scanning are stale
        clear_row_edges();
        mask_rows(true);
    }
}
