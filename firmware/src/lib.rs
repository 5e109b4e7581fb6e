#![no_std]

//! STM32F411 board support for the fretboard firmware
//!
//! Drivers on the `stm32f4` register blocks implementing the
//! `fretboard-core` hardware traits, plus the statics shared between the
//! game's interrupt handlers and its foreground loop.

pub mod board;
pub mod gpio;
pub mod keypad;
pub mod speaker;
pub mod tick;
pub mod uart;

pub use board::*;
pub use gpio::{GpioPin, Port, Pull};
pub use keypad::Keypad;
pub use speaker::Speaker;
pub use uart::{SharedSerial, Usart2Dma, SERIAL};

/// Interrupt-side state of the game firmware
pub mod game_irq {
    use core::cell::RefCell;

    use critical_section::Mutex;
    use fretboard_core::controller::{HeldKeys, TickPulses};
    use fretboard_core::key_queue::{KeyEventQueue, KEY_QUEUE_CAPACITY};
    use fretboard_core::scanner::KeyboardScanner;

    use crate::keypad::Keypad;
    use crate::tick::take_tick_event;

    pub static KEY_QUEUE: KeyEventQueue<KEY_QUEUE_CAPACITY> = KeyEventQueue::new();
    pub static HELD_KEYS: HeldKeys = HeldKeys::new();
    pub static TICK_PULSES: TickPulses = TickPulses::new();

    type Scanner = KeyboardScanner<'static, Keypad, KEY_QUEUE_CAPACITY>;

    static SCANNER: Mutex<RefCell<Option<Scanner>>> = Mutex::new(RefCell::new(None));

    /// Set up the keypad and hand it to the interrupt handlers.
    pub fn install_scanner() {
        let scanner = KeyboardScanner::new(Keypad::init(), &KEY_QUEUE, &HELD_KEYS);
        critical_section::with(|cs| {
            *SCANNER.borrow_ref_mut(cs) = Some(scanner);
        });
    }

    /// EXTI9_5 body
    pub fn on_row_edge() {
        if Keypad::pending_rows() == 0 {
            return;
        }
        critical_section::with(|cs| {
            if let Some(scanner) = SCANNER.borrow_ref_mut(cs).as_mut() {
                scanner.on_row_edge();
            }
        });
    }

    /// TIM3 body
    pub fn on_poll_timer() {
        if !Keypad::take_poll_event() {
            return;
        }
        critical_section::with(|cs| {
            if let Some(scanner) = SCANNER.borrow_ref_mut(cs).as_mut() {
                scanner.on_poll_tick();
            }
        });
    }

    /// TIM5 body
    pub fn on_tick_timer() {
        if take_tick_event() {
            TICK_PULSES.on_timer_interrupt();
        }
    }
}
