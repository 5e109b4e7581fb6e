#![no_std]
#![no_main]

#[cfg(feature = "defmt")]
use defmt_rtt as _;
#[cfg(feature = "defmt")]
use panic_probe as _;
#[cfg(not(feature = "defmt"))]
use panic_halt as _;

use core::fmt::Write;

use cortex_m::peripheral::NVIC;
use cortex_m_rt::entry;
use stm32f4::stm32f411::{interrupt, Interrupt};

use fretboard_core::dispatch::Foreground;
use fretboard_core::game::RhythmGame;
use fretboard_core::hal::{DebugSink, DrawService, GamePeripherals};
use fretboard_core::render::{BoardLayout, BoardRenderer, BACKGROUND};
use fretboard_core::{default_config, default_song, VERSION};
use fretboard_firmware::game_irq::{self, HELD_KEYS, KEY_QUEUE, TICK_PULSES};
use fretboard_firmware::uart::{self, SharedSerial};
use fretboard_firmware::{init_lcd, Speaker};

/// Fretboard firmware entry point
#[entry]
fn main() -> ! {
    #[cfg(feature = "defmt")]
    defmt::info!("fretboard starting");

    uart::init_serial();
    // SAFETY: handlers only touch state behind critical sections or atomics.
    unsafe { NVIC::unmask(Interrupt::DMA1_STREAM6) };
    let mut sink = SharedSerial;
    let mut banner: heapless::String<40> = heapless::String::new();
    let _ = writeln!(banner, "Fretboard {} booting", VERSION);
    sink.send_copy(banner.as_bytes());

    let lcd = match init_lcd(BACKGROUND) {
        Ok(lcd) => lcd,
        Err(_) => {
            sink.send_static(b"LCD init failed\n");
            halt()
        }
    };
    let mut renderer = BoardRenderer::new(lcd, BoardLayout::default());
    renderer.draw_board();
    renderer.draw_score(0);

    let mut hal = GamePeripherals::new(renderer, Speaker::init(), sink);
    let mut game = RhythmGame::new(default_config(), default_song());

    game_irq::install_scanner();
    fretboard_firmware::tick::init_tick_timer();
    // SAFETY: as above
    unsafe {
        NVIC::unmask(Interrupt::EXTI9_5);
        NVIC::unmask(Interrupt::TIM3);
        NVIC::unmask(Interrupt::TIM5);
    }

    #[cfg(feature = "defmt")]
    defmt::info!("fretboard ready, {} notes", default_song().len());
    hal.sink.send_static(b"Press 5 to start falling\n");

    let mut foreground = Foreground::new(&KEY_QUEUE, &HELD_KEYS, &TICK_PULSES);
    loop {
        let report = foreground.step(&mut game, &mut hal);
        if report.keys == 0 && report.ticks == 0 {
            // the 10 ms tick timer always runs, so this wakes up promptly
            cortex_m::asm::wfi();
        }
    }
}

fn halt() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}

#[interrupt]
fn EXTI9_5() {
    game_irq::on_row_edge();
}

#[interrupt]
fn TIM3() {
    game_irq::on_poll_timer();
}

#[interrupt]
fn TIM5() {
    game_irq::on_tick_timer();
}

#[interrupt]
fn DMA1_STREAM6() {
    uart::on_dma_interrupt();
}
