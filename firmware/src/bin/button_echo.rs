//! Board demo: report button presses over serial and drive the LEDs from
//! `L<color><op>` commands received on the same port.

#![no_std]
#![no_main]

#[cfg(feature = "defmt")]
use defmt_rtt as _;
#[cfg(feature = "defmt")]
use panic_probe as _;
#[cfg(not(feature = "defmt"))]
use panic_halt as _;

use cortex_m::peripheral::NVIC;
use cortex_m_rt::entry;
use stm32f4::stm32f411::{interrupt, Interrupt};

use fretboard_core::buttons::ButtonTracker;
use fretboard_core::hal::DebugSink;
use fretboard_core::leds::LedCommandParser;
use fretboard_firmware::uart::{self, SharedSerial, Usart2Dma};
use fretboard_firmware::{init_buttons, init_leds, HSI_HZ};

/// Button sampling period
const SAMPLE_CYCLES: u32 = HSI_HZ / 1000;

#[entry]
fn main() -> ! {
    uart::init_serial();
    // SAFETY: the handler only touches the serial queue inside a critical
    // section.
    unsafe { NVIC::unmask(Interrupt::DMA1_STREAM6) };
    let mut sink = SharedSerial;

    let (mut buttons, mut leds) = match (init_buttons(), init_leds()) {
        (Ok(buttons), Ok(leds)) => (buttons, leds),
        _ => {
            sink.send_static(b"GPIO init failed\n");
            loop {
                cortex_m::asm::wfi();
            }
        }
    };
    sink.send_static(b"Buttons and LEDs ready\n");

    let mut tracker = ButtonTracker::new();
    let mut parser = LedCommandParser::new();
    loop {
        let mut state = 0u8;
        for (index, button) in buttons.iter_mut().enumerate() {
            // pins are infallible; keep the last debounced state otherwise
            button.sample().ok();
            if button.is_pressed() {
                state |= 1 << index;
            }
        }
        for event in tracker.update(state) {
            #[cfg(feature = "defmt")]
            defmt::debug!("{}", event);
            sink.send_static(event.message());
        }

        while let Some(byte) = Usart2Dma::read_byte() {
            if let Some(command) = parser.push(byte) {
                if leds.apply(command).is_err() {
                    sink.send_static(b"LED write failed\n");
                }
            }
        }

        cortex_m::asm::delay(SAMPLE_CYCLES);
    }
}

#[interrupt]
fn DMA1_STREAM6() {
    uart::on_dma_interrupt();
}
